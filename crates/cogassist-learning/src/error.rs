use thiserror::Error;

use cogassist_core::error::CoreError;
use cogassist_storage::StorageError;

/// Recoverable kinds (`Validation`, `PatternStore`) yield a partial
/// `LearningResult` with `updates_failed` incremented rather than aborting
/// the cycle; `Unexpected` is re-raised to the caller (§7).
#[derive(Debug, Error)]
pub enum LearningEngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("pattern store error: {0}")]
    PatternStore(String),

    #[error("unexpected learning failure: {0}")]
    Unexpected(String),
}

pub type LearningResult<T> = Result<T, LearningEngineError>;
