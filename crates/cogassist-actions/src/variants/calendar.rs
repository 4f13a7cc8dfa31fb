//! Calendar actions.

use std::sync::Arc;

use serde_json::json;

use crate::action::{Action, ActionResult, ValidationBuilder, ValidationResult, sanitize_id_fragment};
use crate::collaborators::{CalendarClient, TaskManager};

#[derive(Debug)]
pub struct CreateEvent {
    id: String,
    client: Arc<dyn CalendarClient>,
    title: String,
    start_iso: String,
    end_iso: String,
    executed: bool,
}

impl CreateEvent {
    pub fn new(client: Arc<dyn CalendarClient>, title: impl Into<String>, start_iso: impl Into<String>, end_iso: impl Into<String>) -> Self {
        let title = title.into();
        let id = format!("create-event-{}", sanitize_id_fragment(&title));
        Self {
            id,
            client,
            title,
            start_iso: start_iso.into(),
            end_iso: end_iso.into(),
            executed: false,
        }
    }
}

impl Action for CreateEvent {
    fn action_id(&self) -> &str {
        &self.id
    }
    fn action_type(&self) -> &str {
        "create_event"
    }
    fn validate(&self) -> ValidationResult {
        ValidationBuilder::new()
            .error_if(self.title.trim().is_empty(), "title is required")
            .error_unless(self.start_iso < self.end_iso, "start must precede end")
            .build()
    }
    fn execute(&mut self) -> Result<ActionResult, String> {
        let start = std::time::Instant::now();
        let created_id = self
            .client
            .create_event(&self.title, &self.start_iso, &self.end_iso)?;
        self.executed = true;
        Ok(ActionResult::success(start.elapsed().as_secs_f64())
            .with_metadata("created_event_id", json!(created_id)))
    }
    fn supports_undo(&self) -> bool {
        false
    }
    fn undo(&mut self, _result: &ActionResult) -> Result<bool, String> {
        Ok(false)
    }
}

#[derive(Debug)]
pub struct RespondToEvent {
    id: String,
    client: Arc<dyn CalendarClient>,
    event_id: String,
    response: String,
    executed: bool,
}

impl RespondToEvent {
    pub fn new(client: Arc<dyn CalendarClient>, event_id: impl Into<String>, response: impl Into<String>) -> Self {
        let event_id = event_id.into();
        let id = format!("respond-event-{}", sanitize_id_fragment(&event_id));
        Self {
            id,
            client,
            event_id,
            response: response.into(),
            executed: false,
        }
    }
}

impl Action for RespondToEvent {
    fn action_id(&self) -> &str {
        &self.id
    }
    fn action_type(&self) -> &str {
        "respond_to_event"
    }
    fn validate(&self) -> ValidationResult {
        ValidationBuilder::new()
            .error_if(self.event_id.trim().is_empty(), "event_id is required")
            .error_unless(
                matches!(self.response.as_str(), "accept" | "decline" | "tentative"),
                "response must be one of accept, decline, tentative",
            )
            .build()
    }
    fn execute(&mut self) -> Result<ActionResult, String> {
        let start = std::time::Instant::now();
        self.client.respond(&self.event_id, &self.response)?;
        self.executed = true;
        Ok(ActionResult::success(start.elapsed().as_secs_f64())
            .with_metadata("response", json!(self.response.clone())))
    }
    fn supports_undo(&self) -> bool {
        true
    }
    fn undo(&mut self, _result: &ActionResult) -> Result<bool, String> {
        self.client.respond(&self.event_id, "tentative")?;
        Ok(true)
    }
}

#[derive(Debug)]
pub struct BlockTime {
    id: String,
    client: Arc<dyn CalendarClient>,
    title: String,
    start_iso: String,
    end_iso: String,
    executed: bool,
}

impl BlockTime {
    pub fn new(client: Arc<dyn CalendarClient>, title: impl Into<String>, start_iso: impl Into<String>, end_iso: impl Into<String>) -> Self {
        let title = title.into();
        let id = format!("block-time-{}", sanitize_id_fragment(&title));
        Self {
            id,
            client,
            title,
            start_iso: start_iso.into(),
            end_iso: end_iso.into(),
            executed: false,
        }
    }
}

impl Action for BlockTime {
    fn action_id(&self) -> &str {
        &self.id
    }
    fn action_type(&self) -> &str {
        "block_time"
    }
    fn validate(&self) -> ValidationResult {
        ValidationBuilder::new()
            .error_unless(self.start_iso < self.end_iso, "start must precede end")
            .build()
    }
    fn execute(&mut self) -> Result<ActionResult, String> {
        let start = std::time::Instant::now();
        let created_id = self.client.block_time(&self.start_iso, &self.end_iso, &self.title)?;
        self.executed = true;
        Ok(ActionResult::success(start.elapsed().as_secs_f64())
            .with_metadata("created_event_id", json!(created_id)))
    }
    fn supports_undo(&self) -> bool {
        false
    }
    fn undo(&mut self, _result: &ActionResult) -> Result<bool, String> {
        Ok(false)
    }
}

#[derive(Debug)]
pub struct CreateTaskFromEvent {
    id: String,
    task_manager: Arc<dyn TaskManager>,
    name: String,
    note: String,
    executed: bool,
}

impl CreateTaskFromEvent {
    pub fn new(task_manager: Arc<dyn TaskManager>, name: impl Into<String>, note: impl Into<String>) -> Self {
        let name = name.into();
        let id = format!("create-task-from-event-{}", sanitize_id_fragment(&name));
        Self {
            id,
            task_manager,
            name,
            note: note.into(),
            executed: false,
        }
    }
}

impl Action for CreateTaskFromEvent {
    fn action_id(&self) -> &str {
        &self.id
    }
    fn action_type(&self) -> &str {
        "create_task_from_event"
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
    use crate::collaborators::TaskRecord;

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
    struct FakeTaskManager;
    impl TaskManager for FakeTaskManager {
        fn add_task(
            &self,
            name: &str,
            _note: &str,
            _project: Option<&str>,
            _tags: &[String],
            _due_date: Option<chrono::DateTime<chrono::Utc>>,
            _defer_date: Option<chrono::DateTime<chrono::Utc>>,
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

    #[test]
    fn respond_validation_rejects_unknown_response() {
        let action = RespondToEvent::new(Arc::new(FakeCalendarClient), "evt-1", "maybe");
        assert!(!action.validate().is_valid());
    }

    #[test]
    fn create_task_from_event_undo_removes_task() {
        let mut action = CreateTaskFromEvent::new(Arc::new(FakeTaskManager), "Prep slides", "from calendar event");
        let result = action.execute().unwrap();
        assert!(action.undo(&result).unwrap());
    }

    #[test]
    fn create_event_does_not_support_undo() {
        let mut action = CreateEvent::new(Arc::new(FakeCalendarClient), "Sync", "2026-08-01T10:00:00Z", "2026-08-01T11:00:00Z");
        let result = action.execute().unwrap();
        assert!(!action.can_undo(&result));
    }
}
