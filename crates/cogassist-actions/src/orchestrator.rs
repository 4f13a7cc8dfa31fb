//! C8: execute an [`ActionPlan`] as a DAG, validating before anything runs
//! and rolling back in reverse execution order on the first failure.

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::action::ActionResult;
use crate::planner::ActionPlan;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutedAction {
    pub action_id: String,
    pub action_type: String,
    pub result: ActionResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub executed: Vec<ExecutedAction>,
    pub duration_secs: f64,
    pub error: Option<String>,
    pub rolled_back: bool,
}

pub struct Orchestrator {
    /// Stop and roll back at the first failing action. The spec names this
    /// the default; exposed as a field so a caller can opt into
    /// best-effort execution of an all-independent plan.
    pub fail_fast: bool,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self { fail_fast: true }
    }
}

impl Orchestrator {
    pub fn new(fail_fast: bool) -> Self {
        Self { fail_fast }
    }

    /// Pre-validate every action; run none of them if any reports invalid.
    fn validate_all(&self, plan: &ActionPlan) -> Result<(), String> {
        let mut errors = Vec::new();
        for action in &plan.actions {
            let validation = action.validate();
            if !validation.is_valid() {
                errors.push(format!(
                    "{}: {}",
                    action.action_id(),
                    validation.errors.join("; ")
                ));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join(" | "))
        }
    }

    #[instrument(skip(self, plan), fields(action_count = plan.actions.len()))]
    pub fn execute(&self, plan: &mut ActionPlan) -> ExecutionResult {
        let start = std::time::Instant::now();

        if let Err(validation_error) = self.validate_all(plan) {
            warn!(error = %validation_error, "plan failed pre-validation, nothing executed");
            return ExecutionResult {
                success: false,
                executed: Vec::new(),
                duration_secs: start.elapsed().as_secs_f64(),
                error: Some(validation_error),
                rolled_back: false,
            };
        }

        let mut executed: Vec<ExecutedAction> = Vec::with_capacity(plan.actions.len());
        let mut failed = false;
        let mut aggregate_error = None;

        for action in plan.actions.iter_mut() {
            let action_id = action.action_id().to_string();
            let action_type = action.action_type().to_string();

            let outcome = catch_unwind(AssertUnwindSafe(|| action.execute()));
            let result = match outcome {
                Ok(Ok(result)) => result,
                Ok(Err(message)) => ActionResult::failure(0.0, message),
                Err(panic) => {
                    let message = panic_message(&panic);
                    ActionResult::failure(0.0, format!("action panicked: {message}"))
                }
            };

            let succeeded = result.success;
            info!(action_id = %action_id, action_type = %action_type, success = succeeded, "action executed");
            if !succeeded {
                aggregate_error = result.error.clone();
            }
            executed.push(ExecutedAction {
                action_id,
                action_type,
                result,
            });

            if !succeeded {
                failed = true;
                if self.fail_fast {
                    break;
                }
            }
        }

        let rolled_back = if failed {
            self.roll_back(plan, &executed);
            true
        } else {
            false
        };

        ExecutionResult {
            success: !failed,
            executed,
            duration_secs: start.elapsed().as_secs_f64(),
            error: aggregate_error,
            rolled_back,
        }
    }

    /// Walk executed pairs in reverse; undo every successful, undoable
    /// action. Undo errors or a `false` return are logged but never abort
    /// the sweep; actions without undo support are skipped with a warning.
    fn roll_back(&self, plan: &mut ActionPlan, executed: &[ExecutedAction]) {
        for (index, record) in executed.iter().enumerate().rev() {
            if !record.result.success {
                continue;
            }
            let action = &mut plan.actions[index];
            if !action.can_undo(&record.result) {
                warn!(action_id = %record.action_id, "action has no undo support, skipping rollback");
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| action.undo(&record.result))) {
                Ok(Ok(true)) => info!(action_id = %record.action_id, "rolled back"),
                Ok(Ok(false)) => warn!(action_id = %record.action_id, "undo reported failure"),
                Ok(Err(message)) => warn!(action_id = %record.action_id, error = %message, "undo raised an error"),
                Err(panic) => warn!(action_id = %record.action_id, error = %panic_message(&panic), "undo panicked"),
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
