//! Mail actions. Undo-relevant state (the folder a message moved from, the
//! body of a deleted message if recoverable) is captured on the
//! `ActionResult`, not cached on the action itself; `executed` here is only a
//! re-entrancy guard, never consulted by `undo`.

use std::sync::Arc;

use serde_json::json;

use crate::action::{Action, ActionResult, ValidationBuilder, ValidationResult, sanitize_id_fragment};
use crate::collaborators::MailClient;

#[derive(Debug)]
pub struct ArchiveEmail {
    id: String,
    client: Arc<dyn MailClient>,
    message_id: String,
    archive_folder: String,
    executed: bool,
}

impl ArchiveEmail {
    pub fn new(client: Arc<dyn MailClient>, message_id: impl Into<String>, archive_folder: impl Into<String>) -> Self {
        let message_id = message_id.into();
        let archive_folder = archive_folder.into();
        let id = format!("archive-email-{}", sanitize_id_fragment(&message_id));
        Self {
            id,
            client,
            message_id,
            archive_folder,
            executed: false,
        }
    }
}

impl Action for ArchiveEmail {
    fn action_id(&self) -> &str {
        &self.id
    }

    fn action_type(&self) -> &str {
        "archive_email"
    }

    fn validate(&self) -> ValidationResult {
        ValidationBuilder::new()
            .error_if(self.message_id.trim().is_empty(), "message_id is required")
            .error_if(self.archive_folder.trim().is_empty(), "archive_folder is required")
            .build()
    }

    fn execute(&mut self) -> Result<ActionResult, String> {
        let start = std::time::Instant::now();
        self.client.move_to_folder(&self.message_id, &self.archive_folder)?;
        self.executed = true;
        Ok(ActionResult::success(start.elapsed().as_secs_f64())
            .with_metadata("moved_to", json!(self.archive_folder))
            .with_metadata("source_folder", json!("inbox")))
    }

    fn supports_undo(&self) -> bool {
        true
    }

    fn undo(&mut self, result: &ActionResult) -> Result<bool, String> {
        let source_folder = result
            .metadata
            .get("source_folder")
            .and_then(|v| v.as_str())
            .unwrap_or("inbox");
        self.client.move_to_folder(&self.message_id, source_folder)?;
        Ok(true)
    }
}

/// Permanent delete declares `supports_undo() -> false` statically: there is
/// no recovery path once the source has purged the message.
#[derive(Debug)]
pub struct DeleteEmail {
    id: String,
    client: Arc<dyn MailClient>,
    message_id: String,
    permanent: bool,
    executed: bool,
}

impl DeleteEmail {
    pub fn new(client: Arc<dyn MailClient>, message_id: impl Into<String>, permanent: bool) -> Self {
        let message_id = message_id.into();
        let id = format!("delete-email-{}", sanitize_id_fragment(&message_id));
        Self {
            id,
            client,
            message_id,
            permanent,
            executed: false,
        }
    }
}

impl Action for DeleteEmail {
    fn action_id(&self) -> &str {
        &self.id
    }

    fn action_type(&self) -> &str {
        "delete_email"
    }

    fn validate(&self) -> ValidationResult {
        ValidationBuilder::new()
            .error_if(self.message_id.trim().is_empty(), "message_id is required")
            .build()
    }

    fn execute(&mut self) -> Result<ActionResult, String> {
        let start = std::time::Instant::now();
        self.client.delete(&self.message_id, self.permanent)?;
        self.executed = true;
        Ok(ActionResult::success(start.elapsed().as_secs_f64())
            .with_metadata("permanent", json!(self.permanent)))
    }

    fn supports_undo(&self) -> bool {
        !self.permanent
    }

    fn undo(&mut self, _result: &ActionResult) -> Result<bool, String> {
        if self.permanent {
            return Ok(false);
        }
        self.client.move_to_folder(&self.message_id, "Inbox")?;
        Ok(true)
    }
}

#[derive(Debug)]
pub struct MoveEmail {
    id: String,
    client: Arc<dyn MailClient>,
    message_id: String,
    source_folder: String,
    destination_folder: String,
    executed: bool,
}

impl MoveEmail {
    pub fn new(
        client: Arc<dyn MailClient>,
        message_id: impl Into<String>,
        source_folder: impl Into<String>,
        destination_folder: impl Into<String>,
    ) -> Self {
        let message_id = message_id.into();
        let destination_folder = destination_folder.into();
        let id = format!(
            "move-email-{}-{}",
            sanitize_id_fragment(&message_id),
            sanitize_id_fragment(&destination_folder)
        );
        Self {
            id,
            client,
            message_id,
            source_folder: source_folder.into(),
            destination_folder,
            executed: false,
        }
    }
}

impl Action for MoveEmail {
    fn action_id(&self) -> &str {
        &self.id
    }

    fn action_type(&self) -> &str {
        "move_email"
    }

    fn validate(&self) -> ValidationResult {
        let folder_exists = self.client.folder_exists(&self.destination_folder).unwrap_or(false);
        ValidationBuilder::new()
            .error_if(self.message_id.trim().is_empty(), "message_id is required")
            .error_unless(folder_exists, "destination_folder does not exist")
            .build()
    }

    fn execute(&mut self) -> Result<ActionResult, String> {
        let start = std::time::Instant::now();
        self.client
            .move_to_folder(&self.message_id, &self.destination_folder)?;
        self.executed = true;
        Ok(ActionResult::success(start.elapsed().as_secs_f64())
            .with_metadata("source_folder", json!(self.source_folder.clone())))
    }

    fn supports_undo(&self) -> bool {
        true
    }

    fn undo(&mut self, result: &ActionResult) -> Result<bool, String> {
        let source_folder = result
            .metadata
            .get("source_folder")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.source_folder)
            .to_string();
        self.client.move_to_folder(&self.message_id, &source_folder)?;
        Ok(true)
    }
}

/// Drafts a reply rather than sending it; the draft store (not this action)
/// owns the reviewable-queue entry.
#[derive(Debug)]
pub struct PrepareEmailReply {
    id: String,
    message_id: String,
    to: Vec<String>,
    subject: String,
    body: String,
    executed: bool,
}

impl PrepareEmailReply {
    pub fn new(message_id: impl Into<String>, to: Vec<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        let message_id = message_id.into();
        let id = format!("prepare-reply-{}", sanitize_id_fragment(&message_id));
        Self {
            id,
            message_id,
            to,
            subject: subject.into(),
            body: body.into(),
            executed: false,
        }
    }
}

impl Action for PrepareEmailReply {
    fn action_id(&self) -> &str {
        &self.id
    }

    fn action_type(&self) -> &str {
        "prepare_email_reply"
    }

    fn validate(&self) -> ValidationResult {
        ValidationBuilder::new()
            .error_if(self.to.is_empty(), "at least one recipient is required")
            .error_if(self.body.trim().is_empty(), "body must not be empty")
            .build()
    }

    fn execute(&mut self) -> Result<ActionResult, String> {
        let start = std::time::Instant::now();
        self.executed = true;
        Ok(ActionResult::success(start.elapsed().as_secs_f64())
            .with_output("in_reply_to", json!(self.message_id.clone()))
            .with_output("to", json!(self.to.clone()))
            .with_output("subject", json!(self.subject.clone()))
            .with_output("body", json!(self.body.clone())))
    }

    fn supports_undo(&self) -> bool {
        false
    }

    fn undo(&mut self, _result: &ActionResult) -> Result<bool, String> {
        Ok(false)
    }

    fn estimated_duration_secs(&self) -> f64 {
        0.2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FakeMailClient;
    impl MailClient for FakeMailClient {
        fn move_to_folder(&self, _message_id: &str, _folder: &str) -> Result<(), String> {
            Ok(())
        }
        fn delete(&self, _message_id: &str, _permanent: bool) -> Result<(), String> {
            Ok(())
        }
        fn folder_exists(&self, folder: &str) -> Result<bool, String> {
            Ok(folder == "Archive")
        }
        fn create_folder(&self, _folder: &str) -> Result<(), String> {
            Ok(())
        }
        fn send_reply(&self, _in_reply_to: &str, _to: &[String], _subject: &str, _body: &str) -> Result<String, String> {
            Ok("sent-1".into())
        }
    }

    #[test]
    fn archive_then_undo_restores_source_folder() {
        let client = Arc::new(FakeMailClient);
        let mut action = ArchiveEmail::new(client, "m1", "Archive");
        let result = action.execute().unwrap();
        assert!(result.success);
        assert!(action.can_undo(&result));
        assert!(action.undo(&result).unwrap());
    }

    #[test]
    fn permanent_delete_does_not_support_undo() {
        let client = Arc::new(FakeMailClient);
        let mut action = DeleteEmail::new(client, "m1", true);
        let result = action.execute().unwrap();
        assert!(!action.supports_undo());
        assert!(!action.can_undo(&result));
        assert!(!action.undo(&result).unwrap());
    }

    #[test]
    fn move_validation_rejects_unknown_folder() {
        let client = Arc::new(FakeMailClient);
        let action = MoveEmail::new(client, "m1", "Inbox", "NoSuchFolder");
        assert!(!action.validate().is_valid());
    }

    #[test]
    fn prepare_reply_never_supports_undo() {
        let mut action = PrepareEmailReply::new("m1", vec!["bob@example.com".into()], "Re: hi", "sounds good");
        let result = action.execute().unwrap();
        assert!(!action.can_undo(&result));
    }
}
