//! C11: reply drafts awaiting user review. One JSON file per draft id,
//! written atomically under the configured `drafts` directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::atomic::{read_json, remove_if_exists, write_json_atomic};
use crate::error::{StorageError, StorageResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyFormat {
    PlainText,
    Html,
    Markdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    Draft,
    Sent,
    Discarded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditHistoryEntry {
    pub edited_at: DateTime<Utc>,
    pub field: String,
    pub previous_value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftReply {
    pub draft_id: String,
    pub email_id: String,
    pub account_email: String,
    #[serde(default)]
    pub message_id: Option<String>,
    pub subject: String,
    pub body: String,
    pub body_format: BodyFormat,
    pub to_addresses: Vec<String>,
    #[serde(default)]
    pub cc_addresses: Vec<String>,
    #[serde(default)]
    pub bcc_addresses: Vec<String>,
    pub ai_generated: bool,
    #[serde(default)]
    pub ai_confidence: Option<f64>,
    #[serde(default)]
    pub ai_reasoning: Option<String>,
    #[serde(default)]
    pub original_subject: Option<String>,
    #[serde(default)]
    pub original_from: Option<String>,
    #[serde(default)]
    pub original_date: Option<DateTime<Utc>>,
    pub status: DraftStatus,
    #[serde(default)]
    pub user_edited: bool,
    #[serde(default)]
    pub edit_history: Vec<EditHistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub discarded_at: Option<DateTime<Utc>>,
}

impl DraftReply {
    pub fn new(
        draft_id: impl Into<String>,
        email_id: impl Into<String>,
        account_email: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        body_format: BodyFormat,
        to_addresses: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            draft_id: draft_id.into(),
            email_id: email_id.into(),
            account_email: account_email.into(),
            message_id: None,
            subject: subject.into(),
            body: body.into(),
            body_format,
            to_addresses,
            cc_addresses: Vec::new(),
            bcc_addresses: Vec::new(),
            ai_generated: true,
            ai_confidence: None,
            ai_reasoning: None,
            original_subject: None,
            original_from: None,
            original_date: None,
            status: DraftStatus::Draft,
            user_edited: false,
            edit_history: Vec::new(),
            created_at: now,
            updated_at: now,
            sent_at: None,
            discarded_at: None,
        }
    }

    fn apply_transition(&mut self, target: DraftStatus) -> StorageResult<()> {
        let allowed = matches!(
            (self.status, target),
            (DraftStatus::Draft, DraftStatus::Sent)
                | (DraftStatus::Draft, DraftStatus::Discarded)
                | (DraftStatus::Draft, DraftStatus::Failed)
        );
        if !allowed {
            return Err(StorageError::StateMachine(format!(
                "cannot transition draft from {:?} to {target:?}",
                self.status
            )));
        }
        let now = Utc::now();
        self.status = target;
        self.updated_at = now;
        match target {
            DraftStatus::Sent => self.sent_at = Some(now),
            DraftStatus::Discarded => self.discarded_at = Some(now),
            _ => {}
        }
        Ok(())
    }

    pub fn mark_sent(&mut self) -> StorageResult<()> {
        self.apply_transition(DraftStatus::Sent)
    }

    pub fn mark_discarded(&mut self) -> StorageResult<()> {
        self.apply_transition(DraftStatus::Discarded)
    }

    pub fn mark_failed(&mut self) -> StorageResult<()> {
        self.apply_transition(DraftStatus::Failed)
    }

    /// Overwrite a user-editable field (subject/body), recording the prior
    /// value in `edit_history` and flagging `user_edited`.
    pub fn edit_body(&mut self, new_body: impl Into<String>) {
        let previous = std::mem::replace(&mut self.body, new_body.into());
        self.edit_history.push(EditHistoryEntry {
            edited_at: Utc::now(),
            field: "body".to_string(),
            previous_value: previous,
        });
        self.user_edited = true;
        self.updated_at = Utc::now();
    }
}

/// One JSON file per draft id under `root_dir`, fronted by an in-memory map
/// for fast lookups. Every mutation persists the draft before returning.
pub struct DraftStore {
    root_dir: PathBuf,
    drafts: Arc<DashMap<String, DraftReply>>,
}

impl DraftStore {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            drafts: Arc::new(DashMap::new()),
        }
    }

    fn path_for(&self, draft_id: &str) -> PathBuf {
        self.root_dir.join(format!("{draft_id}.json"))
    }

    pub fn save(&self, draft: DraftReply) -> StorageResult<()> {
        write_json_atomic(&self.path_for(&draft.draft_id), &draft)?;
        self.drafts.insert(draft.draft_id.clone(), draft);
        Ok(())
    }

    pub fn get(&self, draft_id: &str) -> StorageResult<Option<DraftReply>> {
        if let Some(draft) = self.drafts.get(draft_id) {
            return Ok(Some(draft.clone()));
        }
        let loaded: Option<DraftReply> = read_json(&self.path_for(draft_id))?;
        if let Some(draft) = &loaded {
            self.drafts.insert(draft_id.to_string(), draft.clone());
        }
        Ok(loaded)
    }

    pub fn delete(&self, draft_id: &str) -> StorageResult<()> {
        remove_if_exists(&self.path_for(draft_id))?;
        self.drafts.remove(draft_id);
        Ok(())
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_draft() -> DraftReply {
        DraftReply::new(
            "draft-1",
            "email-1",
            "me@example.com",
            "Re: hello",
            "Sounds good.",
            BodyFormat::PlainText,
            vec!["them@example.com".to_string()],
        )
    }

    #[test]
    fn save_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = DraftStore::new(dir.path());
        store.save(sample_draft()).unwrap();
        let fetched = store.get("draft-1").unwrap().unwrap();
        assert_eq!(fetched.subject, "Re: hello");
    }

    #[test]
    fn get_loads_from_disk_when_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let store = DraftStore::new(dir.path());
        store.save(sample_draft()).unwrap();

        let reopened = DraftStore::new(dir.path());
        let fetched = reopened.get("draft-1").unwrap();
        assert!(fetched.is_some());
    }

    #[test]
    fn sent_transition_sets_timestamp() {
        let mut draft = sample_draft();
        draft.mark_sent().unwrap();
        assert_eq!(draft.status, DraftStatus::Sent);
        assert!(draft.sent_at.is_some());
    }

    #[test]
    fn cannot_transition_out_of_terminal_state() {
        let mut draft = sample_draft();
        draft.mark_discarded().unwrap();
        assert!(draft.mark_sent().is_err());
    }

    #[test]
    fn edit_body_records_history_and_flags_user_edited() {
        let mut draft = sample_draft();
        draft.edit_body("Updated body.");
        assert!(draft.user_edited);
        assert_eq!(draft.edit_history.len(), 1);
        assert_eq!(draft.edit_history[0].previous_value, "Sounds good.");
    }
}
