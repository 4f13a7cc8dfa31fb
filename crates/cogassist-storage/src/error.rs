use thiserror::Error;

use cogassist_core::error::CoreError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state transition: {0}")]
    StateMachine(String),
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io(msg) => CoreError::TransientExternal(msg),
            StorageError::Serialization(msg) => CoreError::Validation(msg),
            StorageError::NotFound(msg) => CoreError::Validation(msg),
            StorageError::StateMachine(msg) => CoreError::StateMachine(msg),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
