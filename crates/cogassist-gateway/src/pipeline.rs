//! Wires C2 (normalize) through C8 (orchestrate) into one call per inbound
//! event. HTTP ingest handlers own the wire format; this module only knows
//! about the normalized records and the pipeline stages downstream of them.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use cogassist_actions::{ConvergedAnalysis, RecommendedAction};
use cogassist_channels::Channel;
use cogassist_core::event::{Event, EventType, UrgencyLevel};
use cogassist_memory::WorkingMemory;
use cogassist_perception::FilterDecision;
use cogassist_storage::QueueItem;

use crate::state::{AppState, PendingEvent};

#[derive(Debug, Serialize)]
pub struct IngestOutcome {
    pub event_id: String,
    pub status: &'static str,
    pub recommended_action: Option<String>,
    pub confidence: f64,
    pub queue_item_id: Option<String>,
}

/// C3: mail is the only source with a cheap pre-filter; calendar and chat
/// always proceed to full reasoning.
fn should_skip_mail(state: &AppState, event: &Event) -> Option<String> {
    if event.source() != cogassist_core::event::EventSource::Mail {
        return None;
    }
    let result = state.mail_filter.filter(event.from_person(), event.title());
    match result.decision {
        FilterDecision::Skip => Some(result.reason),
        FilterDecision::ProcessLight | FilterDecision::ProcessFull => None,
    }
}

/// C6 input prep: maps a converged working-memory state onto the recommended
/// action taxonomy. Conservative by design: anything not confidently covered
/// by a rule falls back to `Review` rather than guessing at a mutation.
fn derive_analysis(event: &Event, memory: &WorkingMemory) -> ConvergedAnalysis {
    let confidence = memory.overall_confidence();
    let event_type = event.event_type();

    let recommended_action = match event.source() {
        cogassist_core::event::EventSource::Mail => match event_type {
            EventType::Reply | EventType::Confirmation | EventType::StatusUpdate => RecommendedAction::Archive,
            EventType::Request | EventType::ActionRequired | EventType::DecisionNeeded if confidence >= 0.6 => RecommendedAction::Task,
            EventType::Reference | EventType::Learning | EventType::Insight => RecommendedAction::Reference,
            _ => RecommendedAction::Review,
        },
        cogassist_core::event::EventSource::Calendar => {
            if event_type == EventType::DecisionNeeded {
                RecommendedAction::RespondToInvitation
            } else {
                RecommendedAction::Review
            }
        }
        cogassist_core::event::EventSource::Chat => {
            if confidence >= 0.7 && event.is_urgent() {
                RecommendedAction::ReplyToChat
            } else {
                RecommendedAction::Review
            }
        }
        _ => RecommendedAction::Review,
    };

    let calendar_response = (recommended_action == RecommendedAction::RespondToInvitation).then(|| {
        if event.urgency() >= UrgencyLevel::High {
            "accept".to_string()
        } else {
            "tentative".to_string()
        }
    });

    let chat_reply_content = (recommended_action == RecommendedAction::ReplyToChat)
        .then(|| "Got it, looking into this now.".to_string());
    let chat_room_id = (recommended_action == RecommendedAction::ReplyToChat)
        .then(|| event.source_id().to_string());

    let task_name = (recommended_action == RecommendedAction::Task).then(|| event.title().to_string());
    let task_note = (recommended_action == RecommendedAction::Task).then(|| {
        memory
            .best_hypothesis()
            .map(|h| h.description.clone())
            .unwrap_or_else(|| event.content().to_string())
    });

    ConvergedAnalysis {
        recommended_action,
        permanent_delete: false,
        task_name,
        task_note,
        calendar_response,
        chat_room_id,
        chat_reply_content,
    }
}

/// C4-C8: run the reasoner over a normalized event, derive a plan, execute it
/// if auto-approved, or park it in the review queue otherwise. Returns a
/// summary suitable for the ingest endpoint's response body.
pub async fn process_event(state: &Arc<AppState>, event: Event) -> anyhow::Result<IngestOutcome> {
    let event_id = event.event_id().to_string();

    if let Some(reason) = should_skip_mail(state, &event) {
        info!(%event_id, %reason, "pre-filter skipped event");
        return Ok(IngestOutcome {
            event_id,
            status: "skipped",
            recommended_action: None,
            confidence: 0.0,
            queue_item_id: None,
        });
    }

    state.channels.broadcast_to_channel(
        Channel::Status,
        json!({"event_id": event_id, "stage": "perceiving"}),
        None,
        None,
    );

    let mut memory = WorkingMemory::new(event.clone());
    let provider_calls = state.reasoner.run(&mut memory).await?;

    let analysis = derive_analysis(&event, &memory);
    let candidates = state.action_factory.build(&analysis, &event, &state.account);
    let mut plan = state.planner.plan(&memory, candidates)?;

    state.channels.broadcast_to_channel(
        Channel::Status,
        json!({
            "event_id": event_id,
            "stage": "planned",
            "confidence": memory.overall_confidence(),
            "requires_approval": plan.requires_approval(),
        }),
        None,
        None,
    );

    if !plan.requires_approval() {
        let result = state.orchestrator.execute(&mut plan);
        if !result.success {
            warn!(%event_id, error = ?result.error, "plan execution reported failures");
        }
        let executed = result.executed;
        let outcome = IngestOutcome {
            event_id: event_id.clone(),
            status: "executed",
            recommended_action: Some(format!("{:?}", analysis.recommended_action)),
            confidence: memory.overall_confidence(),
            queue_item_id: None,
        };
        state.pending.insert(
            event_id,
            PendingEvent {
                memory,
                executed,
                provider_calls,
            },
        );
        return Ok(outcome);
    }

    let snapshot = cogassist_actions::planner::plan_summary(&plan);
    let item = QueueItem::new(uuid::Uuid::new_v4().to_string(), event_id.clone(), snapshot);
    let item_id = item.item_id.clone();
    state.queue.save(item)?;
    state.channels.broadcast_to_channel(
        Channel::Queue,
        json!({"event": "item_added", "item_id": item_id}),
        None,
        None,
    );

    let outcome = IngestOutcome {
        event_id: event_id.clone(),
        status: "queued",
        recommended_action: Some(format!("{:?}", analysis.recommended_action)),
        confidence: memory.overall_confidence(),
        queue_item_id: Some(item_id),
    };
    state.pending.insert(
        event_id,
        PendingEvent {
            memory,
            executed: Vec::new(),
            provider_calls,
        },
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use cogassist_core::config::{AccountsConfig, ChannelsConfig, Config, GatewayConfig, LearningConfig, PlanningConfig, ReasoningConfig, StorageConfig};
    use cogassist_perception::normalizers::calendar::{CalendarRecord, ResponseStatus};
    use cogassist_perception::normalizers::mail::MailRecord;
    use cogassist_storage::QueueItemStatus;

    fn test_config(data_dir: &std::path::Path, auto_approve_threshold: f64) -> Config {
        Config {
            gateway: GatewayConfig::default(),
            accounts: AccountsConfig::migrate_legacy_single("Personal", "mail"),
            reasoning: ReasoningConfig::default(),
            planning: PlanningConfig {
                auto_approve_threshold,
                risk_tolerance: "medium".to_string(),
            },
            learning: LearningConfig::default(),
            channels: ChannelsConfig::default(),
            storage: StorageConfig {
                data_dir: data_dir.to_string_lossy().to_string(),
            },
        }
    }

    fn mail_event(from: &str, subject: &str, in_reply_to: Option<&str>) -> Event {
        let now = chrono::Utc::now();
        let record = MailRecord {
            message_id: format!("m-{subject}"),
            source_id: "src-1".to_string(),
            from: from.to_string(),
            to: vec!["me@example.com".to_string()],
            cc: vec![],
            subject: subject.to_string(),
            body: "body".to_string(),
            date: Some(now),
            thread_id: None,
            in_reply_to: in_reply_to.map(str::to_string),
            references: vec![],
            attachment_types: vec![],
        };
        cogassist_perception::normalizers::mail::normalize(record, now).unwrap()
    }

    fn calendar_event(title: &str, start: chrono::DateTime<chrono::Utc>, end: chrono::DateTime<chrono::Utc>, attendees: Vec<String>) -> Event {
        let now = chrono::Utc::now();
        let record = CalendarRecord {
            event_id: "cal-1".to_string(),
            source_id: "cal-src-1".to_string(),
            title: title.to_string(),
            description: "Quarterly roadmap discussion".to_string(),
            start,
            end,
            organizer: "alice@example.com".to_string(),
            attendees,
            response_status: ResponseStatus::NotResponded,
            location: None,
            online_meeting_url: None,
        };
        cogassist_perception::normalizers::calendar::normalize(record, now).unwrap()
    }

    #[tokio::test]
    async fn obvious_newsletter_is_skipped_before_reasoning() {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(AppState::new(test_config(dir.path(), 0.95), "test-token".to_string()).unwrap());

        let event = mail_event("newsletter@mailchimp.com", "Weekly digest — unsubscribe", None);
        let outcome = process_event(&state, event).await.unwrap();

        assert_eq!(outcome.status, "skipped");
        assert_eq!(outcome.queue_item_id, None);
        assert!(state.pending.is_empty());
    }

    #[tokio::test]
    async fn meeting_invitation_needing_response_is_queued_for_review() {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(AppState::new(test_config(dir.path(), 0.95), "test-token".to_string()).unwrap());

        let now = chrono::Utc::now();
        let event = calendar_event("Roadmap sync", now + Duration::hours(2), now + Duration::hours(3), vec!["bob@example.com".to_string()]);
        let outcome = process_event(&state, event).await.unwrap();

        assert_eq!(outcome.status, "queued");
        let item_id = outcome.queue_item_id.expect("a review-mode plan is queued");
        let item = state.queue.get(&item_id).unwrap().expect("queue item persisted");
        assert_eq!(item.status, QueueItemStatus::Pending);
        assert_eq!(outcome.recommended_action.as_deref(), Some("RespondToInvitation"));
    }

    #[tokio::test]
    async fn reply_with_enough_confidence_auto_archives() {
        let dir = tempfile::tempdir().unwrap();
        // The in-process heuristic provider never exceeds ~0.75-0.9
        // confidence; lowering the threshold is what exercises the
        // auto-execute branch without wiring a real LLM backend into this
        // test.
        let state = Arc::new(AppState::new(test_config(dir.path(), 0.5), "test-token".to_string()).unwrap());

        let event = mail_event("alice@example.com", "Re: Project update", Some("m0"));
        let outcome = process_event(&state, event).await.unwrap();

        assert_eq!(outcome.status, "executed");
        assert_eq!(outcome.queue_item_id, None);
        assert_eq!(outcome.recommended_action.as_deref(), Some("Archive"));
    }

    #[tokio::test]
    async fn feedback_closes_the_loop_after_an_executed_plan() {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(AppState::new(test_config(dir.path(), 0.5), "test-token".to_string()).unwrap());

        let event = mail_event("alice@example.com", "Re: Project update", Some("m0"));
        let outcome = process_event(&state, event).await.unwrap();
        assert_eq!(outcome.status, "executed");
        assert!(state.pending.contains_key(&outcome.event_id));

        let feedback = cogassist_learning::UserFeedback {
            approved: false,
            rating: Some(2),
            correction: Some("should have created a task instead".to_string()),
            modification: None,
            comment: None,
            action_executed: true,
            time_to_action_secs: Some(12.0),
        };

        let (_, pending) = state.pending.remove(&outcome.event_id).unwrap();
        let result = state.learning.learn(&feedback, &pending.memory, &pending.executed, None).unwrap();

        assert!(result.triggered);
        assert!(!state.pending.contains_key(&outcome.event_id));
    }
}
