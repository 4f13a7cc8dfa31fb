//! Stand-ins for the external collaborators the specification places out of
//! scope (IMAP/Graph mail, a calendar API, a chat backend, a task manager, a
//! note vault, a secrets store). They log the operation and report success so
//! the pipeline can be exercised end to end without a real backend wired in.

use std::collections::HashMap;
use std::sync::Mutex;

use cogassist_actions::collaborators::{CalendarClient, ChatClient, MailClient, NoteManager, SecretStore, TaskManager, TaskRecord};
use serde_json::Value;
use tracing::info;

#[derive(Debug, Default)]
pub struct LoggingMailClient;

impl MailClient for LoggingMailClient {
    fn move_to_folder(&self, message_id: &str, folder: &str) -> Result<(), String> {
        info!(message_id, folder, "mail.move_to_folder");
        Ok(())
    }
    fn delete(&self, message_id: &str, permanent: bool) -> Result<(), String> {
        info!(message_id, permanent, "mail.delete");
        Ok(())
    }
    fn folder_exists(&self, _folder: &str) -> Result<bool, String> {
        Ok(true)
    }
    fn create_folder(&self, folder: &str) -> Result<(), String> {
        info!(folder, "mail.create_folder");
        Ok(())
    }
    fn send_reply(&self, in_reply_to: &str, to: &[String], subject: &str, _body: &str) -> Result<String, String> {
        info!(in_reply_to, ?to, subject, "mail.send_reply");
        Ok(format!("sent-{in_reply_to}"))
    }
}

#[derive(Debug, Default)]
pub struct LoggingCalendarClient;

impl CalendarClient for LoggingCalendarClient {
    fn respond(&self, event_id: &str, response: &str) -> Result<(), String> {
        info!(event_id, response, "calendar.respond");
        Ok(())
    }
    fn create_event(&self, title: &str, start_iso: &str, end_iso: &str) -> Result<String, String> {
        info!(title, start_iso, end_iso, "calendar.create_event");
        Ok(format!("evt-{title}"))
    }
    fn block_time(&self, start_iso: &str, end_iso: &str, title: &str) -> Result<String, String> {
        info!(start_iso, end_iso, title, "calendar.block_time");
        Ok(format!("block-{title}"))
    }
}

#[derive(Debug, Default)]
pub struct LoggingChatClient;

impl ChatClient for LoggingChatClient {
    fn send_message(&self, room_id: &str, content: &str) -> Result<String, String> {
        info!(room_id, content, "chat.send_message");
        Ok(format!("msg-{room_id}"))
    }
    fn delete_message(&self, room_id: &str, message_id: &str) -> Result<(), String> {
        info!(room_id, message_id, "chat.delete_message");
        Ok(())
    }
    fn flag(&self, room_id: &str, message_id: &str) -> Result<(), String> {
        info!(room_id, message_id, "chat.flag");
        Ok(())
    }
}

/// An in-memory task list, keyed by a counter-derived id. Sufficient to
/// exercise create/edit/remove/lookup round trips without a real backend.
#[derive(Debug, Default)]
pub struct InMemoryTaskManager {
    tasks: Mutex<HashMap<String, TaskRecord>>,
    next_id: Mutex<u64>,
}

impl TaskManager for InMemoryTaskManager {
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
        let mut next_id = self.next_id.lock().map_err(|e| e.to_string())?;
        *next_id += 1;
        let record = TaskRecord {
            id: format!("task-{next_id}"),
            name: name.to_string(),
        };
        self.tasks
            .lock()
            .map_err(|e| e.to_string())?
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }
    fn edit_task(&self, id_or_name: &str, note: Option<&str>, flagged: Option<bool>) -> Result<TaskRecord, String> {
        info!(id_or_name, ?note, ?flagged, "task.edit_task");
        self.get_task_by_id(id_or_name)?
            .or_else(|| self.get_task_by_name(id_or_name).ok().flatten())
            .ok_or_else(|| format!("task '{id_or_name}' not found"))
    }
    fn remove_task(&self, id_or_name: &str) -> Result<(), String> {
        self.tasks.lock().map_err(|e| e.to_string())?.remove(id_or_name);
        Ok(())
    }
    fn get_task_by_name(&self, name: &str) -> Result<Option<TaskRecord>, String> {
        Ok(self
            .tasks
            .lock()
            .map_err(|e| e.to_string())?
            .values()
            .find(|t| t.name == name)
            .cloned())
    }
    fn get_task_by_id(&self, id: &str) -> Result<Option<TaskRecord>, String> {
        Ok(self.tasks.lock().map_err(|e| e.to_string())?.get(id).cloned())
    }
    fn complete_task(&self, id_or_name: &str) -> Result<(), String> {
        info!(id_or_name, "task.complete_task");
        Ok(())
    }
    fn reopen_task(&self, id_or_name: &str) -> Result<(), String> {
        info!(id_or_name, "task.reopen_task");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct LoggingNoteManager;

impl NoteManager for LoggingNoteManager {
    fn create_note(&self, title: &str, _content: &str, tags: &[String], entities: &[String]) -> Result<String, String> {
        info!(title, ?tags, ?entities, "note.create_note");
        Ok(format!("note-{title}"))
    }
    fn update_note(&self, id: &str, changes: &HashMap<String, Value>) -> Result<(), String> {
        info!(id, ?changes, "note.update_note");
        Ok(())
    }
    fn get_note(&self, _id: &str) -> Result<Option<String>, String> {
        Ok(None)
    }
    fn delete_note(&self, id: &str) -> Result<(), String> {
        info!(id, "note.delete_note");
        Ok(())
    }
}

/// Retrieval order the trait documents (keychain -> env -> default -> nil)
/// collapses here to environment-only, since this binary has no platform
/// keychain integration.
#[derive(Debug, Default)]
pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
    fn get_secret(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
    fn set_secret(&self, _key: &str, _value: &str) -> Result<(), String> {
        Err("EnvSecretStore is read-only".to_string())
    }
    fn delete_secret(&self, _key: &str) -> Result<(), String> {
        Err("EnvSecretStore is read-only".to_string())
    }
}
