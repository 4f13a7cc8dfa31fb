//! C11: the review queue. One JSON file per item under the configured
//! `queue` directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::atomic::{read_json, remove_if_exists, write_json_atomic};
use crate::error::{StorageError, StorageResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueItemStatus {
    Pending,
    Approved,
    Rejected,
}

/// §7's user-visible-failures rule: kind is a short, stable code
/// (`CoreError::code()`), message is a short human string, never a secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub item_id: String,
    pub event_id: String,
    pub analysis_snapshot: Value,
    pub status: QueueItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub failure: Option<FailureRecord>,
}

impl QueueItem {
    pub fn new(item_id: impl Into<String>, event_id: impl Into<String>, analysis_snapshot: Value) -> Self {
        let now = Utc::now();
        Self {
            item_id: item_id.into(),
            event_id: event_id.into(),
            analysis_snapshot,
            status: QueueItemStatus::Pending,
            created_at: now,
            updated_at: now,
            resolved_at: None,
            failure: None,
        }
    }

    pub fn with_failure(mut self, kind: impl Into<String>, message: impl Into<String>) -> Self {
        self.failure = Some(FailureRecord {
            kind: kind.into(),
            message: message.into(),
        });
        self
    }

    fn apply_transition(&mut self, target: QueueItemStatus) -> StorageResult<()> {
        if self.status != QueueItemStatus::Pending {
            return Err(StorageError::StateMachine(format!(
                "cannot transition queue item from {:?} to {target:?}",
                self.status
            )));
        }
        let now = Utc::now();
        self.status = target;
        self.updated_at = now;
        self.resolved_at = Some(now);
        Ok(())
    }

    pub fn approve(&mut self) -> StorageResult<()> {
        self.apply_transition(QueueItemStatus::Approved)
    }

    pub fn reject(&mut self) -> StorageResult<()> {
        self.apply_transition(QueueItemStatus::Rejected)
    }

    /// UI-relevant fields only; never the full analysis blob (§4.8).
    pub fn sanitized_summary(&self) -> Value {
        serde_json::json!({
            "item_id": self.item_id,
            "event_id": self.event_id,
            "status": self.status,
            "created_at": self.created_at,
            "updated_at": self.updated_at,
            "has_failure": self.failure.is_some(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

pub struct QueueStore {
    root_dir: PathBuf,
    items: Arc<DashMap<String, QueueItem>>,
}

impl QueueStore {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            items: Arc::new(DashMap::new()),
        }
    }

    fn path_for(&self, item_id: &str) -> PathBuf {
        self.root_dir.join(format!("{item_id}.json"))
    }

    pub fn save(&self, item: QueueItem) -> StorageResult<()> {
        write_json_atomic(&self.path_for(&item.item_id), &item)?;
        self.items.insert(item.item_id.clone(), item);
        Ok(())
    }

    pub fn get(&self, item_id: &str) -> StorageResult<Option<QueueItem>> {
        if let Some(item) = self.items.get(item_id) {
            return Ok(Some(item.clone()));
        }
        let loaded: Option<QueueItem> = read_json(&self.path_for(item_id))?;
        if let Some(item) = &loaded {
            self.items.insert(item_id.to_string(), item.clone());
        }
        Ok(loaded)
    }

    pub fn delete(&self, item_id: &str) -> StorageResult<()> {
        remove_if_exists(&self.path_for(item_id))?;
        self.items.remove(item_id);
        Ok(())
    }

    pub fn pending(&self) -> Vec<QueueItem> {
        self.items
            .iter()
            .filter(|entry| entry.status == QueueItemStatus::Pending)
            .map(|entry| entry.clone())
            .collect()
    }

    pub fn stats(&self) -> QueueStats {
        let mut stats = QueueStats::default();
        for entry in self.items.iter() {
            match entry.status {
                QueueItemStatus::Pending => stats.pending += 1,
                QueueItemStatus::Approved => stats.approved += 1,
                QueueItemStatus::Rejected => stats.rejected += 1,
            }
        }
        stats
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }
}
