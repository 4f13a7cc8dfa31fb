pub mod action;
pub mod collaborators;
pub mod factory;
pub mod orchestrator;
pub mod planner;
pub mod variants;

pub use action::{Action, ActionResult, ExecutionMode, ValidationBuilder, ValidationResult};
pub use factory::{ActionFactory, ConvergedAnalysis, RecommendedAction};
pub use orchestrator::{ExecutedAction, ExecutionResult, Orchestrator};
pub use planner::{ActionPlan, ActionRisk, PlanMetadata, Planner, PlannerConfig, RiskLevel};
