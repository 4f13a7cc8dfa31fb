pub mod calibrator;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod knowledge;
pub mod pattern_store;
pub mod provider_tracker;

pub use calibrator::ConfidenceCalibrator;
pub use engine::{LearningEngine, LearningOutcome};
pub use error::{LearningEngineError, LearningResult};
pub use feedback::{FeedbackAnalysis, FeedbackProcessor, UserFeedback};
pub use knowledge::{ApplyOutcome, KnowledgeUpdate, KnowledgeUpdateKind, KnowledgeUpdater};
pub use pattern_store::{Pattern, PatternStore};
pub use provider_tracker::{CallRecord, OptimizeFor, ProviderScore, ProviderTracker};
