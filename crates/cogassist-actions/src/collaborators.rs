//! Interfaces to the external collaborators named in the specification's
//! out-of-scope list: source-specific I/O clients, the secrets store, and
//! the note/task managers. The core only depends on these traits; concrete
//! implementations (IMAP, Graph API, a keychain, an Obsidian vault, …) live
//! outside this crate.

pub trait MailClient: std::fmt::Debug + Send + Sync {
    fn move_to_folder(&self, message_id: &str, folder: &str) -> Result<(), String>;
    fn delete(&self, message_id: &str, permanent: bool) -> Result<(), String>;
    fn folder_exists(&self, folder: &str) -> Result<bool, String>;
    fn create_folder(&self, folder: &str) -> Result<(), String>;
    fn send_reply(&self, in_reply_to: &str, to: &[String], subject: &str, body: &str) -> Result<String, String>;
}

pub trait CalendarClient: std::fmt::Debug + Send + Sync {
    fn respond(&self, event_id: &str, response: &str) -> Result<(), String>;
    fn create_event(&self, title: &str, start_iso: &str, end_iso: &str) -> Result<String, String>;
    fn block_time(&self, start_iso: &str, end_iso: &str, title: &str) -> Result<String, String>;
}

pub trait ChatClient: std::fmt::Debug + Send + Sync {
    fn send_message(&self, room_id: &str, content: &str) -> Result<String, String>;
    fn delete_message(&self, room_id: &str, message_id: &str) -> Result<(), String>;
    fn flag(&self, room_id: &str, message_id: &str) -> Result<(), String>;
}

#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub id: String,
    pub name: String,
}

pub trait TaskManager: std::fmt::Debug + Send + Sync {
    #[allow(clippy::too_many_arguments)]
    fn add_task(
        &self,
        name: &str,
        note: &str,
        project: Option<&str>,
        tags: &[String],
        due_date: Option<chrono::DateTime<chrono::Utc>>,
        defer_date: Option<chrono::DateTime<chrono::Utc>>,
        estimated_minutes: Option<u32>,
        flagged: bool,
    ) -> Result<TaskRecord, String>;
    fn edit_task(&self, id_or_name: &str, note: Option<&str>, flagged: Option<bool>) -> Result<TaskRecord, String>;
    fn remove_task(&self, id_or_name: &str) -> Result<(), String>;
    fn get_task_by_name(&self, name: &str) -> Result<Option<TaskRecord>, String>;
    fn get_task_by_id(&self, id: &str) -> Result<Option<TaskRecord>, String>;
    fn complete_task(&self, id_or_name: &str) -> Result<(), String>;
    fn reopen_task(&self, id_or_name: &str) -> Result<(), String>;
}

pub trait NoteManager: std::fmt::Debug + Send + Sync {
    fn create_note(
        &self,
        title: &str,
        content: &str,
        tags: &[String],
        entities: &[String],
    ) -> Result<String, String>;
    fn update_note(&self, id: &str, changes: &std::collections::HashMap<String, serde_json::Value>) -> Result<(), String>;
    fn get_note(&self, id: &str) -> Result<Option<String>, String>;
    fn delete_note(&self, id: &str) -> Result<(), String>;
}

/// Retrieval order: platform keychain -> environment -> configured default
/// -> nil. Never persisted by the core.
pub trait SecretStore: std::fmt::Debug + Send + Sync {
    fn get_secret(&self, key: &str) -> Option<String>;
    fn set_secret(&self, key: &str, value: &str) -> Result<(), String>;
    fn delete_secret(&self, key: &str) -> Result<(), String>;
}
