//! C6: a pure mapping from a converged analysis to the actions it implies.
//! No I/O happens here; actions are constructed with their collaborators
//! already injected and only act when `execute()` is called downstream.

use std::sync::Arc;

use cogassist_core::config::AccountConfig;
use cogassist_core::event::Event;

use crate::action::Action;
use crate::collaborators::{CalendarClient, ChatClient, MailClient, TaskManager};
use crate::variants::calendar::RespondToEvent;
use crate::variants::chat::ReplyToMessage;
use crate::variants::mail::{ArchiveEmail, DeleteEmail, MoveEmail};
use crate::variants::task::CreateTask;

/// The reasoner's converged recommendation, independent of the mechanics of
/// turning it into actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendedAction {
    Archive,
    Delete,
    Reference,
    Task,
    Review,
    Snooze,
    RespondToInvitation,
    ReplyToChat,
}

#[derive(Debug, Clone)]
pub struct ConvergedAnalysis {
    pub recommended_action: RecommendedAction,
    pub permanent_delete: bool,
    pub task_name: Option<String>,
    pub task_note: Option<String>,
    /// One of "accept" / "decline" / "tentative"; required for
    /// `RespondToInvitation`.
    pub calendar_response: Option<String>,
    /// Required for `ReplyToChat`.
    pub chat_room_id: Option<String>,
    pub chat_reply_content: Option<String>,
}

const DEFAULT_ARCHIVE_FOLDER: &str = "Archive";
const DEFAULT_REFERENCE_FOLDER: &str = "Reference";

fn folder_for(account: &AccountConfig, key: &str, default: &str) -> String {
    account
        .folder_overrides
        .get(key)
        .cloned()
        .unwrap_or_else(|| default.to_string())
}

/// Collaborators the factory wires into produced actions. A factory built
/// for one account reuses the same collaborator set across every event that
/// account's normalizer produces.
pub struct ActionFactory {
    mail_client: Arc<dyn MailClient>,
    calendar_client: Arc<dyn CalendarClient>,
    chat_client: Arc<dyn ChatClient>,
    task_manager: Arc<dyn TaskManager>,
}

impl ActionFactory {
    pub fn new(
        mail_client: Arc<dyn MailClient>,
        calendar_client: Arc<dyn CalendarClient>,
        chat_client: Arc<dyn ChatClient>,
        task_manager: Arc<dyn TaskManager>,
    ) -> Self {
        Self {
            mail_client,
            calendar_client,
            chat_client,
            task_manager,
        }
    }

    pub fn build(
        &self,
        analysis: &ConvergedAnalysis,
        event: &Event,
        account: &AccountConfig,
    ) -> Vec<Box<dyn Action>> {
        match analysis.recommended_action {
            RecommendedAction::Archive => {
                let folder = folder_for(account, "archive", DEFAULT_ARCHIVE_FOLDER);
                vec![Box::new(ArchiveEmail::new(
                    self.mail_client.clone(),
                    event.event_id(),
                    folder,
                ))]
            }
            RecommendedAction::Delete => vec![Box::new(DeleteEmail::new(
                self.mail_client.clone(),
                event.event_id(),
                analysis.permanent_delete,
            ))],
            RecommendedAction::Reference => {
                let folder = folder_for(account, "reference", DEFAULT_REFERENCE_FOLDER);
                vec![Box::new(MoveEmail::new(
                    self.mail_client.clone(),
                    event.event_id(),
                    "Inbox",
                    folder,
                ))]
            }
            RecommendedAction::Task => {
                let name = analysis
                    .task_name
                    .clone()
                    .unwrap_or_else(|| event.title().to_string());
                let note = analysis.task_note.clone().unwrap_or_default();
                let archive_folder = folder_for(account, "archive", DEFAULT_ARCHIVE_FOLDER);
                vec![
                    Box::new(CreateTask::new(
                        self.task_manager.clone(),
                        name,
                        note,
                        None,
                        Vec::new(),
                        None,
                        false,
                    )),
                    Box::new(ArchiveEmail::new(
                        self.mail_client.clone(),
                        event.event_id(),
                        archive_folder,
                    )),
                ]
            }
            RecommendedAction::RespondToInvitation => {
                let response = analysis
                    .calendar_response
                    .clone()
                    .unwrap_or_else(|| "tentative".to_string());
                vec![Box::new(RespondToEvent::new(
                    self.calendar_client.clone(),
                    event.event_id(),
                    response,
                ))]
            }
            RecommendedAction::ReplyToChat => {
                let room_id = analysis.chat_room_id.clone().unwrap_or_default();
                let content = analysis.chat_reply_content.clone().unwrap_or_default();
                vec![Box::new(ReplyToMessage::new(
                    self.chat_client.clone(),
                    room_id,
                    event.event_id(),
                    content,
                ))]
            }
            RecommendedAction::Review | RecommendedAction::Snooze => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::TaskRecord;
    use chrono::Utc;
    use cogassist_core::event::{EventSource, EventType, NewEvent, UrgencyLevel};

    #[derive(Debug)]
    struct FakeMailClient;
    impl MailClient for FakeMailClient {
        fn move_to_folder(&self, _message_id: &str, _folder: &str) -> Result<(), String> {
            Ok(())
        }
        fn delete(&self, _message_id: &str, _permanent: bool) -> Result<(), String> {
            Ok(())
        }
        fn folder_exists(&self, _folder: &str) -> Result<bool, String> {
            Ok(true)
        }
        fn create_folder(&self, _folder: &str) -> Result<(), String> {
            Ok(())
        }
        fn send_reply(&self, _in_reply_to: &str, _to: &[String], _subject: &str, _body: &str) -> Result<String, String> {
            Ok("sent-1".into())
        }
    }

    #[derive(Debug)]
    struct FakeTaskManager;
    impl TaskManager for FakeTaskManager {
        fn add_task(
            &self,
            name: &str,
            _note: &str,
            _project: Option<&str>,
            _tags: &[String],
            _due_date: Option<chrono::DateTime<Utc>>,
            _defer_date: Option<chrono::DateTime<Utc>>,
            _estimated_minutes: Option<u32>,
            _flagged: bool,
        ) -> Result<TaskRecord, String> {
            Ok(TaskRecord { id: "task-1".into(), name: name.into() })
        }
        fn edit_task(&self, _id_or_name: &str, _note: Option<&str>, _flagged: Option<bool>) -> Result<TaskRecord, String> {
            Ok(TaskRecord { id: "task-1".into(), name: "x".into() })
        }
        fn remove_task(&self, _id_or_name: &str) -> Result<(), String> {
            Ok(())
        }
        fn get_task_by_name(&self, _name: &str) -> Result<Option<TaskRecord>, String> {
            Ok(None)
        }
        fn get_task_by_id(&self, _id: &str) -> Result<Option<TaskRecord>, String> {
            Ok(None)
        }
        fn complete_task(&self, _id_or_name: &str) -> Result<(), String> {
            Ok(())
        }
        fn reopen_task(&self, _id_or_name: &str) -> Result<(), String> {
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
            title: "Invoice #4821".into(),
            event_type: Some(EventType::Information),
            urgency: Some(UrgencyLevel::Low),
            from_person: "billing@example.com".into(),
            perception_confidence: 0.8,
            ..Default::default()
        })
        .unwrap()
    }

    fn sample_account() -> AccountConfig {
        AccountConfig {
            id: "default".into(),
            display_name: "Personal".into(),
            source: "mail".into(),
            enabled: true,
            username: None,
            folder_overrides: Default::default(),
        }
    }

    #[derive(Debug)]
    struct FakeCalendarClient;
    impl CalendarClient for FakeCalendarClient {
        fn respond(&self, _event_id: &str, _response: &str) -> Result<(), String> {
            Ok(())
        }
        fn create_event(&self, _title: &str, _start_iso: &str, _end_iso: &str) -> Result<String, String> {
            Ok("evt-new".into())
        }
        fn block_time(&self, _start_iso: &str, _end_iso: &str, _title: &str) -> Result<String, String> {
            Ok("evt-block".into())
        }
    }

    #[derive(Debug)]
    struct FakeChatClient;
    impl ChatClient for FakeChatClient {
        fn send_message(&self, _room_id: &str, _content: &str) -> Result<String, String> {
            Ok("sent-1".into())
        }
        fn delete_message(&self, _room_id: &str, _message_id: &str) -> Result<(), String> {
            Ok(())
        }
        fn flag(&self, _room_id: &str, _message_id: &str) -> Result<(), String> {
            Ok(())
        }
    }

    fn blank_analysis(recommended: RecommendedAction) -> ConvergedAnalysis {
        ConvergedAnalysis {
            recommended_action: recommended,
            permanent_delete: false,
            task_name: None,
            task_note: None,
            calendar_response: None,
            chat_room_id: None,
            chat_reply_content: None,
        }
    }

    fn factory() -> ActionFactory {
        ActionFactory::new(
            Arc::new(FakeMailClient),
            Arc::new(FakeCalendarClient),
            Arc::new(FakeChatClient),
            Arc::new(FakeTaskManager),
        )
    }

    #[test]
    fn archive_produces_single_archive_action() {
        let actions = factory().build(&blank_analysis(RecommendedAction::Archive), &sample_event(), &sample_account());
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action_type(), "archive_email");
    }

    #[test]
    fn task_produces_create_task_and_archive() {
        let actions = factory().build(
            &ConvergedAnalysis {
                task_name: Some("Pay invoice".into()),
                ..blank_analysis(RecommendedAction::Task)
            },
            &sample_event(),
            &sample_account(),
        );
        let types: Vec<&str> = actions.iter().map(|a| a.action_type()).collect();
        assert_eq!(types, vec!["create_task", "archive_email"]);
    }

    #[test]
    fn review_and_snooze_produce_no_actions() {
        for recommended in [RecommendedAction::Review, RecommendedAction::Snooze] {
            let actions = factory().build(&blank_analysis(recommended), &sample_event(), &sample_account());
            assert!(actions.is_empty());
        }
    }

    #[test]
    fn respond_to_invitation_produces_calendar_response() {
        let actions = factory().build(
            &ConvergedAnalysis {
                calendar_response: Some("accept".into()),
                ..blank_analysis(RecommendedAction::RespondToInvitation)
            },
            &sample_event(),
            &sample_account(),
        );
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action_type(), "respond_to_event");
    }

    #[test]
    fn reply_to_chat_produces_chat_reply() {
        let actions = factory().build(
            &ConvergedAnalysis {
                chat_room_id: Some("general".into()),
                chat_reply_content: Some("on it".into()),
                ..blank_analysis(RecommendedAction::ReplyToChat)
            },
            &sample_event(),
            &sample_account(),
        );
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action_type(), "reply_to_message");
    }
}
