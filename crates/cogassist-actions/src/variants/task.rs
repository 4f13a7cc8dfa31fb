//! Task actions, acting through the injected `TaskManager` collaborator.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::action::{Action, ActionResult, ValidationBuilder, ValidationResult, sanitize_id_fragment};
use crate::collaborators::TaskManager;

#[derive(Debug)]
pub struct CreateTask {
    id: String,
    manager: Arc<dyn TaskManager>,
    name: String,
    note: String,
    project: Option<String>,
    tags: Vec<String>,
    due_date: Option<DateTime<Utc>>,
    flagged: bool,
    executed: bool,
}

impl CreateTask {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        manager: Arc<dyn TaskManager>,
        name: impl Into<String>,
        note: impl Into<String>,
        project: Option<String>,
        tags: Vec<String>,
        due_date: Option<DateTime<Utc>>,
        flagged: bool,
    ) -> Self {
        let name = name.into();
        let id = format!("create-task-{}", sanitize_id_fragment(&name));
        Self {
            id,
            manager,
            name,
            note: note.into(),
            project,
            tags,
            due_date,
            flagged,
            executed: false,
        }
    }
}

impl Action for CreateTask {
    fn action_id(&self) -> &str {
        &self.id
    }
    fn action_type(&self) -> &str {
        "create_task"
    }
    fn validate(&self) -> ValidationResult {
        ValidationBuilder::new()
            .error_if(self.name.trim().is_empty(), "name is required")
            .validate_date(self.due_date, "due_date", true)
            .build()
    }
    fn execute(&mut self) -> Result<ActionResult, String> {
        let start = std::time::Instant::now();
        let task = self.manager.add_task(
            &self.name,
            &self.note,
            self.project.as_deref(),
            &self.tags,
            self.due_date,
            None,
            None,
            self.flagged,
        )?;
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
        self.manager.remove_task(task_id)?;
        Ok(true)
    }
}

#[derive(Debug)]
pub struct CompleteTask {
    id: String,
    manager: Arc<dyn TaskManager>,
    task_id_or_name: String,
    executed: bool,
}

impl CompleteTask {
    pub fn new(manager: Arc<dyn TaskManager>, task_id_or_name: impl Into<String>) -> Self {
        let task_id_or_name = task_id_or_name.into();
        let id = format!("complete-task-{}", sanitize_id_fragment(&task_id_or_name));
        Self {
            id,
            manager,
            task_id_or_name,
            executed: false,
        }
    }
}

impl Action for CompleteTask {
    fn action_id(&self) -> &str {
        &self.id
    }
    fn action_type(&self) -> &str {
        "complete_task"
    }
    fn validate(&self) -> ValidationResult {
        ValidationBuilder::new()
            .error_if(self.task_id_or_name.trim().is_empty(), "task_id_or_name is required")
            .build()
    }
    fn execute(&mut self) -> Result<ActionResult, String> {
        let start = std::time::Instant::now();
        self.manager.complete_task(&self.task_id_or_name)?;
        self.executed = true;
        Ok(ActionResult::success(start.elapsed().as_secs_f64()))
    }
    fn supports_undo(&self) -> bool {
        true
    }
    fn undo(&mut self, _result: &ActionResult) -> Result<bool, String> {
        self.manager.reopen_task(&self.task_id_or_name)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::TaskRecord;

    #[derive(Debug)]
    struct FakeTaskManager;
    impl TaskManager for FakeTaskManager {
        fn add_task(
            &self,
            name: &str,
            _note: &str,
            _project: Option<&str>,
            _tags: &[String],
            _due_date: Option<DateTime<Utc>>,
            _defer_date: Option<DateTime<Utc>>,
            _estimated_minutes: Option<u32>,
            _flagged: bool,
        ) -> Result<TaskRecord, String> {
            Ok(TaskRecord { id: "task-7".into(), name: name.into() })
        }
        fn edit_task(&self, _id_or_name: &str, _note: Option<&str>, _flagged: Option<bool>) -> Result<TaskRecord, String> {
            Ok(TaskRecord { id: "task-7".into(), name: "x".into() })
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
    fn create_task_rejects_past_due_date() {
        let action = CreateTask::new(
            Arc::new(FakeTaskManager),
            "Pay rent",
            "",
            None,
            vec![],
            Some(Utc::now() - chrono::Duration::days(1)),
            false,
        );
        assert!(!action.validate().is_valid());
    }

    #[test]
    fn complete_task_undo_reopens() {
        let mut action = CompleteTask::new(Arc::new(FakeTaskManager), "task-7");
        let result = action.execute().unwrap();
        assert!(action.undo(&result).unwrap());
    }
}
