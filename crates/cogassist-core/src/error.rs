use thiserror::Error;

/// Domain error taxonomy shared by every crate in the workspace.
///
/// Kinds map onto the seven classes the pipeline distinguishes: validation
/// failures never retry, capacity failures are soft warnings, transient
/// failures are the caller's to retry, state-machine misuse is a logic bug
/// surfaced precisely, and `Unexpected` is the escape hatch for anything that
/// doesn't fit the above.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("capacity exceeded: {0}")]
    Capacity(String),

    #[error("transient external failure: {0}")]
    TransientExternal(String),

    #[error("state machine misuse: {0}")]
    StateMachine(String),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl CoreError {
    /// Short, stable code for structured logging and for the failure kind
    /// recorded on a queue item. Never includes interpolated detail.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation",
            CoreError::Capacity(_) => "capacity",
            CoreError::TransientExternal(_) => "transient_external",
            CoreError::StateMachine(_) => "state_machine",
            CoreError::Unexpected(_) => "unexpected",
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }

    pub fn state_machine(msg: impl Into<String>) -> Self {
        CoreError::StateMachine(msg.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
