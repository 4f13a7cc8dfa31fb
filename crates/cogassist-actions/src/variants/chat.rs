//! Chat actions. `ReplyToMessage` keeps the id of the message it sent
//! separate from the id of the message it replies to: the two are never the
//! same value and undo must act on the former.

use std::sync::Arc;

use serde_json::json;

use crate::action::{Action, ActionResult, ValidationBuilder, ValidationResult, sanitize_id_fragment};
use crate::collaborators::{ChatClient, TaskManager};

#[derive(Debug)]
pub struct ReplyToMessage {
    id: String,
    client: Arc<dyn ChatClient>,
    room_id: String,
    reply_to_message_id: String,
    content: String,
    executed: bool,
}

impl ReplyToMessage {
    pub fn new(client: Arc<dyn ChatClient>, room_id: impl Into<String>, reply_to_message_id: impl Into<String>, content: impl Into<String>) -> Self {
        let reply_to_message_id = reply_to_message_id.into();
        let id = format!("reply-to-message-{}", sanitize_id_fragment(&reply_to_message_id));
        Self {
            id,
            client,
            room_id: room_id.into(),
            reply_to_message_id,
            content: content.into(),
            executed: false,
        }
    }
}

impl Action for ReplyToMessage {
    fn action_id(&self) -> &str {
        &self.id
    }
    fn action_type(&self) -> &str {
        "reply_to_message"
    }
    fn validate(&self) -> ValidationResult {
        ValidationBuilder::new()
            .error_if(self.content.trim().is_empty(), "content must not be empty")
            .build()
    }
    fn execute(&mut self) -> Result<ActionResult, String> {
        let start = std::time::Instant::now();
        let sent_message_id = self.client.send_message(&self.room_id, &self.content)?;
        self.executed = true;
        Ok(ActionResult::success(start.elapsed().as_secs_f64())
            .with_metadata("sent_message_id", json!(sent_message_id))
            .with_metadata("reply_to_message_id", json!(self.reply_to_message_id.clone())))
    }
    fn supports_undo(&self) -> bool {
        true
    }
    fn undo(&mut self, result: &ActionResult) -> Result<bool, String> {
        let Some(sent_message_id) = result.metadata.get("sent_message_id").and_then(|v| v.as_str()) else {
            return Ok(false);
        };
        self.client.delete_message(&self.room_id, sent_message_id)?;
        Ok(true)
    }
}

#[derive(Debug)]
pub struct FlagMessage {
    id: String,
    client: Arc<dyn ChatClient>,
    room_id: String,
    message_id: String,
    executed: bool,
}

impl FlagMessage {
    pub fn new(client: Arc<dyn ChatClient>, room_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        let message_id = message_id.into();
        let id = format!("flag-message-{}", sanitize_id_fragment(&message_id));
        Self {
            id,
            client,
            room_id: room_id.into(),
            message_id,
            executed: false,
        }
    }
}

impl Action for FlagMessage {
    fn action_id(&self) -> &str {
        &self.id
    }
    fn action_type(&self) -> &str {
        "flag_message"
    }
    fn validate(&self) -> ValidationResult {
        ValidationBuilder::new()
            .error_if(self.message_id.trim().is_empty(), "message_id is required")
            .build()
    }
    fn execute(&mut self) -> Result<ActionResult, String> {
        let start = std::time::Instant::now();
        self.client.flag(&self.room_id, &self.message_id)?;
        self.executed = true;
        Ok(ActionResult::success(start.elapsed().as_secs_f64()))
    }
    fn supports_undo(&self) -> bool {
        false
    }
    fn undo(&mut self, _result: &ActionResult) -> Result<bool, String> {
        Ok(false)
    }
    fn estimated_duration_secs(&self) -> f64 {
        0.3
    }
}

#[derive(Debug)]
pub struct CreateTaskFromMessage {
    id: String,
    task_manager: Arc<dyn TaskManager>,
    name: String,
    note: String,
    executed: bool,
}

impl CreateTaskFromMessage {
    pub fn new(task_manager: Arc<dyn TaskManager>, name: impl Into<String>, note: impl Into<String>) -> Self {
        let name = name.into();
        let id = format!("create-task-from-message-{}", sanitize_id_fragment(&name));
        Self {
            id,
            task_manager,
            name,
            note: note.into(),
            executed: false,
        }
    }
}

impl Action for CreateTaskFromMessage {
    fn action_id(&self) -> &str {
        &self.id
    }
    fn action_type(&self) -> &str {
        "create_task_from_message"
    }
    fn validate(&self) -> ValidationResult {
        ValidationBuilder::new()
            .error_if(self.name.trim().is_empty(), "name is required")
            .build()
    }
    fn execute(&mut self) -> Result<ActionResult, String> {
        let start = std::time::Instant::now();
        let task = self
            .task_manager
            .add_task(&self.name, &self.note, None, &[], None, None, None, false)?;
        self.executed = true;
        Ok(ActionResult::success(start.elapsed().as_secs_f64())
            .with_metadata("task_id", json!(task.id)))
    }
    fn supports_undo(&self) -> bool {
        true
    }
    fn undo(&mut self, result: &ActionResult) -> Result<bool, String> {
        let Some(task_id) = result.metadata.get("task_id").and_then(|v| v.as_str()) else {
            return Ok(false);
        };
        self.task_manager.remove_task(task_id)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FakeChatClient;
    impl ChatClient for FakeChatClient {
        fn send_message(&self, _room_id: &str, _content: &str) -> Result<String, String> {
            Ok("sent-99".into())
        }
        fn delete_message(&self, _room_id: &str, _message_id: &str) -> Result<(), String> {
            Ok(())
        }
        fn flag(&self, _room_id: &str, _message_id: &str) -> Result<(), String> {
            Ok(())
        }
    }

    #[test]
    fn reply_keeps_sent_id_separate_from_reply_to_id() {
        let mut action = ReplyToMessage::new(Arc::new(FakeChatClient), "general", "orig-1", "sounds good");
        let result = action.execute().unwrap();
        assert_eq!(
            result.metadata.get("sent_message_id").unwrap().as_str().unwrap(),
            "sent-99"
        );
        assert_eq!(
            result.metadata.get("reply_to_message_id").unwrap().as_str().unwrap(),
            "orig-1"
        );
        assert!(action.undo(&result).unwrap());
    }

    #[test]
    fn flag_message_never_supports_undo() {
        let mut action = FlagMessage::new(Arc::new(FakeChatClient), "general", "m1");
        let result = action.execute().unwrap();
        assert!(!action.can_undo(&result));
    }
}
