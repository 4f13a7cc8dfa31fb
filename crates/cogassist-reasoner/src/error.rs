use thiserror::Error;

use cogassist_core::error::CoreError;

/// Reasoner-local error taxonomy, layered over the shared `CoreError` kinds.
/// `ProviderExhausted` and `ContextSearchFailed` both map onto the core's
/// `TransientExternal` classification at the boundary (see `From` impl).
#[derive(Debug, Error)]
pub enum ReasonerError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("ai router exhausted all provider slots: {0}")]
    ProviderExhausted(String),

    #[error("context search failed: {0}")]
    ContextSearchFailed(String),
}

impl From<ReasonerError> for CoreError {
    fn from(err: ReasonerError) -> Self {
        match err {
            ReasonerError::Core(e) => e,
            ReasonerError::ProviderExhausted(msg) => CoreError::TransientExternal(msg),
            ReasonerError::ContextSearchFailed(msg) => CoreError::TransientExternal(msg),
        }
    }
}

pub type ReasonerResult<T> = Result<T, ReasonerError>;
