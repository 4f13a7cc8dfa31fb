pub mod config;
pub mod dag;
pub mod error;
pub mod event;
pub mod util;

pub use error::{CoreError, CoreResult};
pub use event::{Entity, Event, EventSource, EventType, NewEvent, UrgencyLevel};
