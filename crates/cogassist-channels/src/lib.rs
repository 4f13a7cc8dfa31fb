pub mod auth;
pub mod channel;
pub mod error;
pub mod frame;
pub mod manager;
pub mod rate_limit;

pub use auth::{verify_token, AUTH_FAILED_CLOSE_CODE};
pub use channel::{Channel, SubscriptionKey};
pub use error::{ChannelError, ChannelResult};
pub use frame::{ChannelBroadcast, InboundFrame, OutboundFrame, QueueEvent};
pub use manager::{BroadcastOutcome, ChannelManager, SharedChannelManager};
pub use rate_limit::RateLimiter;
