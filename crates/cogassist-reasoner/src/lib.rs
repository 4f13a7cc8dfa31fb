pub mod ai_router;
pub mod context;
pub mod error;
pub mod reasoner;

pub use ai_router::{AiCompletion, AiPrompt, AiProvider, AiRouter, FailoverRouter, ProviderSlot, TokenUsage};
pub use context::{ContextQuery, ContextSearcher};
pub use error::{ReasonerError, ReasonerResult};
pub use reasoner::{MultiPassReasoner, ProviderCallRecord};
