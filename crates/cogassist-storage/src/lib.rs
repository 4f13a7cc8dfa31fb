pub mod atomic;
pub mod draft;
pub mod error;
pub mod queue;

pub use draft::{BodyFormat, DraftReply, DraftStatus, DraftStore, EditHistoryEntry};
pub use error::{StorageError, StorageResult};
pub use queue::{FailureRecord, QueueItem, QueueItemStatus, QueueStats, QueueStore};
