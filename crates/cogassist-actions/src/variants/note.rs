//! Note actions, acting through the injected `NoteManager` collaborator.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;

use crate::action::{Action, ActionResult, ValidationBuilder, ValidationResult, sanitize_id_fragment};
use crate::collaborators::NoteManager;

#[derive(Debug)]
pub struct CreateNote {
    id: String,
    manager: Arc<dyn NoteManager>,
    title: String,
    content: String,
    tags: Vec<String>,
    entities: Vec<String>,
    executed: bool,
}

impl CreateNote {
    pub fn new(manager: Arc<dyn NoteManager>, title: impl Into<String>, content: impl Into<String>, tags: Vec<String>, entities: Vec<String>) -> Self {
        let title = title.into();
        let id = format!("create-note-{}", sanitize_id_fragment(&title));
        Self {
            id,
            manager,
            title,
            content: content.into(),
            tags,
            entities,
            executed: false,
        }
    }
}

impl Action for CreateNote {
    fn action_id(&self) -> &str {
        &self.id
    }
    fn action_type(&self) -> &str {
        "create_note"
    }
    fn validate(&self) -> ValidationResult {
        ValidationBuilder::new()
            .error_if(self.title.trim().is_empty(), "title is required")
            .build()
    }
    fn execute(&mut self) -> Result<ActionResult, String> {
        let start = std::time::Instant::now();
        let note_id = self
            .manager
            .create_note(&self.title, &self.content, &self.tags, &self.entities)?;
        self.executed = true;
        Ok(ActionResult::success(start.elapsed().as_secs_f64())
            .with_metadata("note_id", json!(note_id)))
    }
    fn supports_undo(&self) -> bool {
        true
    }
    fn undo(&mut self, result: &ActionResult) -> Result<bool, String> {
        let Some(note_id) = result.metadata.get("note_id").and_then(|v| v.as_str()) else {
            return Ok(false);
        };
        self.manager.delete_note(note_id)?;
        Ok(true)
    }
}

#[derive(Debug)]
pub struct UpdateNote {
    id: String,
    manager: Arc<dyn NoteManager>,
    note_id: String,
    changes: HashMap<String, serde_json::Value>,
    executed: bool,
}

impl UpdateNote {
    pub fn new(manager: Arc<dyn NoteManager>, note_id: impl Into<String>, changes: HashMap<String, serde_json::Value>) -> Self {
        let note_id = note_id.into();
        let id = format!("update-note-{}", sanitize_id_fragment(&note_id));
        Self {
            id,
            manager,
            note_id,
            changes,
            executed: false,
        }
    }
}

impl Action for UpdateNote {
    fn action_id(&self) -> &str {
        &self.id
    }
    fn action_type(&self) -> &str {
        "update_note"
    }
    fn validate(&self) -> ValidationResult {
        ValidationBuilder::new()
            .error_if(self.note_id.trim().is_empty(), "note_id is required")
            .error_if(self.changes.is_empty(), "changes must not be empty")
            .build()
    }
    fn execute(&mut self) -> Result<ActionResult, String> {
        let start = std::time::Instant::now();
        let prior_content = self.manager.get_note(&self.note_id)?;
        self.manager.update_note(&self.note_id, &self.changes)?;
        self.executed = true;
        let mut result = ActionResult::success(start.elapsed().as_secs_f64());
        if let Some(prior_content) = prior_content {
            result = result.with_metadata("prior_content", json!(prior_content));
        }
        Ok(result)
    }
    fn supports_undo(&self) -> bool {
        true
    }
    fn undo(&mut self, result: &ActionResult) -> Result<bool, String> {
        let Some(prior_content) = result.metadata.get("prior_content").and_then(|v| v.as_str()) else {
            return Ok(false);
        };
        let mut restore = HashMap::new();
        restore.insert("content".to_string(), json!(prior_content));
        self.manager.update_note(&self.note_id, &restore)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FakeNoteManager;
    impl NoteManager for FakeNoteManager {
        fn create_note(&self, _title: &str, _content: &str, _tags: &[String], _entities: &[String]) -> Result<String, String> {
            Ok("note-1".into())
        }
        fn update_note(&self, _id: &str, _changes: &HashMap<String, serde_json::Value>) -> Result<(), String> {
            Ok(())
        }
        fn get_note(&self, _id: &str) -> Result<Option<String>, String> {
            Ok(Some("old content".into()))
        }
        fn delete_note(&self, _id: &str) -> Result<(), String> {
            Ok(())
        }
    }

    #[test]
    fn create_note_undo_deletes_it() {
        let mut action = CreateNote::new(Arc::new(FakeNoteManager), "Trip plan", "", vec![], vec![]);
        let result = action.execute().unwrap();
        assert!(action.undo(&result).unwrap());
    }

    #[test]
    fn update_note_validation_rejects_empty_changes() {
        let action = UpdateNote::new(Arc::new(FakeNoteManager), "note-1", HashMap::new());
        assert!(!action.validate().is_valid());
    }

    #[test]
    fn update_note_undo_restores_prior_content() {
        let mut changes = HashMap::new();
        changes.insert("content".to_string(), json!("new content"));
        let mut action = UpdateNote::new(Arc::new(FakeNoteManager), "note-1", changes);
        let result = action.execute().unwrap();
        assert_eq!(
            result.metadata.get("prior_content").unwrap().as_str().unwrap(),
            "old content"
        );
        assert!(action.undo(&result).unwrap());
    }
}
