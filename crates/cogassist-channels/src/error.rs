use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("unknown client '{0}'")]
    UnknownClient(String),

    #[error("invalid channel '{0}'")]
    InvalidChannel(String),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("send failed for client '{0}'")]
    SendFailed(String),
}

pub type ChannelResult<T> = Result<T, ChannelError>;
