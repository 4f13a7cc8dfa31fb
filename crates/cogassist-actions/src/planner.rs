//! C7: turn a converged working memory plus a candidate action list into an
//! ordered, risk-assessed [`ActionPlan`]. Dependency resolution reuses the
//! same topological sort the orchestrator later re-verifies before running.

use std::collections::HashMap;

use cogassist_core::dag::topo_sort;
use cogassist_core::error::{CoreError, CoreResult};
use cogassist_memory::WorkingMemory;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::action::{Action, ExecutionMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn parse(s: &str) -> CoreResult<Self> {
        match s.to_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            other => Err(CoreError::validation(format!(
                "unknown risk tolerance '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRisk {
    pub action_id: String,
    pub level: RiskLevel,
    pub reversible: bool,
}

/// Per-action-type classification for the irreversible case. Actions that
/// support undo are always `Low` regardless of type; this table only
/// disambiguates the irreversible ones into bounded/bulk/critical, per the
/// three named examples in the planner's risk-assessment contract.
fn classify_irreversible(action_type: &str) -> RiskLevel {
    match action_type {
        // Bounded: a single internal record, irreversible but low blast
        // radius (a permanently deleted message, a flag toggle).
        "delete_email" | "flag_message" => RiskLevel::Medium,
        // External side effect that a human could still manually undo
        // outside the system (a calendar invite, a blocked slot, a draft
        // that hasn't been sent).
        "create_event" | "block_time" | "prepare_email_reply" => RiskLevel::High,
        // Anything else irreversible is assumed to write externally with no
        // recall path until proven otherwise.
        _ => RiskLevel::Critical,
    }
}

pub fn assess_risk(action: &dyn Action) -> ActionRisk {
    let reversible = action.supports_undo();
    let level = if reversible {
        RiskLevel::Low
    } else {
        classify_irreversible(action.action_type())
    };
    ActionRisk {
        action_id: action.action_id().to_string(),
        level,
        reversible,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanMetadata {
    pub planning_duration_secs: f64,
    pub winning_hypothesis_id: Option<String>,
    pub action_count: usize,
    pub risk_summary: HashMap<String, usize>,
}

/// An ordered, risk-assessed plan. `actions` owns the boxed trait objects so
/// the orchestrator can mutate them in place during execution.
pub struct ActionPlan {
    pub actions: Vec<Box<dyn Action>>,
    pub execution_mode: ExecutionMode,
    pub risks: Vec<ActionRisk>,
    pub rationale: String,
    pub estimated_duration_secs: f64,
    pub confidence: f64,
    pub metadata: PlanMetadata,
}

impl ActionPlan {
    /// A plan requires explicit user approval unless its mode is `Auto`.
    pub fn requires_approval(&self) -> bool {
        self.execution_mode != ExecutionMode::Auto
    }

    pub fn max_risk(&self) -> Option<RiskLevel> {
        self.risks.iter().map(|r| r.level).max()
    }
}

pub struct PlannerConfig {
    pub auto_approve_threshold: f64,
    pub risk_tolerance: RiskLevel,
}

pub struct Planner {
    config: PlannerConfig,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// Build a plan from the working memory's converged hypothesis and a
    /// candidate action list (already constructed by the action factory).
    /// `Manual` mode is forced when there is no best hypothesis at all, or
    /// when no actions were produced.
    pub fn plan(
        &self,
        memory: &WorkingMemory,
        candidates: Vec<Box<dyn Action>>,
    ) -> CoreResult<ActionPlan> {
        let start = std::time::Instant::now();
        let best_hypothesis = memory.best_hypothesis();

        if best_hypothesis.is_none() || candidates.is_empty() {
            let rationale = if best_hypothesis.is_none() {
                "no converged hypothesis; deferring to manual review".to_string()
            } else {
                "no actions to take".to_string()
            };
            return Ok(ActionPlan {
                actions: candidates,
                execution_mode: ExecutionMode::Manual,
                risks: Vec::new(),
                rationale,
                estimated_duration_secs: 0.0,
                confidence: memory.overall_confidence(),
                metadata: PlanMetadata {
                    planning_duration_secs: start.elapsed().as_secs_f64(),
                    winning_hypothesis_id: best_hypothesis.map(|h| h.id.clone()),
                    action_count: 0,
                    risk_summary: HashMap::new(),
                },
            });
        }
        let best_hypothesis = best_hypothesis.unwrap();

        let ids: Vec<String> = candidates.iter().map(|a| a.action_id().to_string()).collect();
        let mut deps: HashMap<String, Vec<String>> = HashMap::new();
        for action in &candidates {
            deps.insert(action.action_id().to_string(), action.dependencies());
        }
        let order = topo_sort(&ids, &deps)?;

        let mut by_id: HashMap<String, Box<dyn Action>> = candidates
            .into_iter()
            .map(|a| (a.action_id().to_string(), a))
            .collect();
        let ordered_actions: Vec<Box<dyn Action>> = order
            .iter()
            .map(|id| by_id.remove(id).expect("topo_sort only returns known ids"))
            .collect();

        let risks: Vec<ActionRisk> = ordered_actions.iter().map(|a| assess_risk(a.as_ref())).collect();
        let estimated_duration_secs: f64 = ordered_actions.iter().map(|a| a.estimated_duration_secs()).sum();
        let confidence = memory.overall_confidence();

        let max_risk = risks.iter().map(|r| r.level).max().unwrap_or(RiskLevel::Low);
        let execution_mode = if confidence >= self.config.auto_approve_threshold
            && max_risk <= self.config.risk_tolerance
        {
            ExecutionMode::Auto
        } else {
            ExecutionMode::Review
        };

        let mut risk_summary: HashMap<String, usize> = HashMap::new();
        for risk in &risks {
            *risk_summary.entry(format!("{:?}", risk.level).to_lowercase()).or_insert(0) += 1;
        }

        let rationale = format!(
            "{} (confidence {:.2}); {} action(s), max risk {:?}",
            best_hypothesis.description,
            confidence,
            ordered_actions.len(),
            max_risk
        );

        Ok(ActionPlan {
            actions: ordered_actions,
            execution_mode,
            risks,
            rationale,
            estimated_duration_secs,
            confidence,
            metadata: PlanMetadata {
                planning_duration_secs: start.elapsed().as_secs_f64(),
                winning_hypothesis_id: Some(best_hypothesis.id.clone()),
                action_count: risk_summary.values().sum(),
                risk_summary,
            },
        })
    }
}

/// JSON-friendly summary, used by the gateway to surface a plan for review
/// without exposing the boxed `Action` trait objects.
pub fn plan_summary(plan: &ActionPlan) -> Value {
    json!({
        "execution_mode": plan.execution_mode,
        "requires_approval": plan.requires_approval(),
        "rationale": plan.rationale,
        "confidence": plan.confidence,
        "estimated_duration_secs": plan.estimated_duration_secs,
        "actions": plan.actions.iter().map(|a| json!({
            "action_id": a.action_id(),
            "action_type": a.action_type(),
        })).collect::<Vec<_>>(),
        "risks": plan.risks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionResult, ValidationResult};
    use chrono::Utc;
    use cogassist_core::event::{EventSource, EventType, NewEvent, UrgencyLevel};
    use cogassist_memory::Hypothesis;

    #[derive(Debug)]
    struct StubAction {
        id: String,
        deps: Vec<String>,
        undoable: bool,
        action_type: &'static str,
    }

    impl Action for StubAction {
        fn action_id(&self) -> &str {
            &self.id
        }
        fn action_type(&self) -> &str {
            self.action_type
        }
        fn validate(&self) -> ValidationResult {
            ValidationResult::ok()
        }
        fn execute(&mut self) -> Result<ActionResult, String> {
            Ok(ActionResult::success(0.0))
        }
        fn supports_undo(&self) -> bool {
            self.undoable
        }
        fn undo(&mut self, _result: &ActionResult) -> Result<bool, String> {
            Ok(self.undoable)
        }
        fn dependencies(&self) -> Vec<String> {
            self.deps.clone()
        }
    }

    fn memory_with_confidence(confidence: f64) -> WorkingMemory {
        let now = Utc::now();
        let event = cogassist_core::event::Event::try_new(NewEvent {
            event_id: "e1".into(),
            source: Some(EventSource::Mail),
            occurred_at: Some(now),
            received_at: Some(now),
            perceived_at: Some(now),
            title: "t".into(),
            event_type: Some(EventType::Information),
            urgency: Some(UrgencyLevel::Low),
            from_person: "a@example.com".into(),
            perception_confidence: 0.9,
            ..Default::default()
        })
        .unwrap();
        let mut wm = WorkingMemory::new(event);
        wm.add_hypothesis(Hypothesis::new("h1", "archive this newsletter", confidence), false)
            .unwrap();
        wm.update_confidence(confidence);
        wm
    }

    fn planner(auto_approve_threshold: f64, risk_tolerance: RiskLevel) -> Planner {
        Planner::new(PlannerConfig {
            auto_approve_threshold,
            risk_tolerance,
        })
    }

    #[test]
    fn manual_mode_when_no_hypothesis() {
        let now = Utc::now();
        let event = cogassist_core::event::Event::try_new(NewEvent {
            event_id: "e1".into(),
            source: Some(EventSource::Mail),
            occurred_at: Some(now),
            received_at: Some(now),
            perceived_at: Some(now),
            title: "t".into(),
            event_type: Some(EventType::Information),
            urgency: Some(UrgencyLevel::Low),
            from_person: "a@example.com".into(),
            perception_confidence: 0.9,
            ..Default::default()
        })
        .unwrap();
        let wm = WorkingMemory::new(event);
        let plan = planner(0.9, RiskLevel::Medium)
            .plan(&wm, vec![Box::new(StubAction { id: "a1".into(), deps: vec![], undoable: true, action_type: "archive_email" })])
            .unwrap();
        assert_eq!(plan.execution_mode, ExecutionMode::Manual);
    }

    #[test]
    fn manual_mode_when_no_actions() {
        let wm = memory_with_confidence(0.9);
        let plan = planner(0.9, RiskLevel::Medium).plan(&wm, vec![]).unwrap();
        assert_eq!(plan.execution_mode, ExecutionMode::Manual);
    }

    #[test]
    fn auto_mode_requires_confidence_and_risk_tolerance() {
        let wm = memory_with_confidence(0.96);
        let plan = planner(0.95, RiskLevel::Medium)
            .plan(
                &wm,
                vec![Box::new(StubAction {
                    id: "archive-1".into(),
                    deps: vec![],
                    undoable: true,
                    action_type: "archive_email",
                })],
            )
            .unwrap();
        assert_eq!(plan.execution_mode, ExecutionMode::Auto);
        assert!(!plan.requires_approval());
    }

    #[test]
    fn review_mode_when_risk_exceeds_tolerance() {
        let wm = memory_with_confidence(0.99);
        let plan = planner(0.5, RiskLevel::Low)
            .plan(
                &wm,
                vec![Box::new(StubAction {
                    id: "respond-1".into(),
                    deps: vec![],
                    undoable: false,
                    action_type: "create_event",
                })],
            )
            .unwrap();
        assert_eq!(plan.execution_mode, ExecutionMode::Review);
        assert_eq!(plan.max_risk(), Some(RiskLevel::High));
    }

    #[test]
    fn dependency_order_is_respected() {
        let wm = memory_with_confidence(0.9);
        let plan = planner(0.95, RiskLevel::Medium)
            .plan(
                &wm,
                vec![
                    Box::new(StubAction { id: "archive-1".into(), deps: vec!["task-1".into()], undoable: true, action_type: "archive_email" }),
                    Box::new(StubAction { id: "task-1".into(), deps: vec![], undoable: true, action_type: "create_task" }),
                ],
            )
            .unwrap();
        let order: Vec<&str> = plan.actions.iter().map(|a| a.action_id()).collect();
        assert_eq!(order, vec!["task-1", "archive-1"]);
    }

    #[test]
    fn missing_dependency_is_a_planning_error() {
        let wm = memory_with_confidence(0.9);
        let result = planner(0.95, RiskLevel::Medium).plan(
            &wm,
            vec![Box::new(StubAction {
                id: "a1".into(),
                deps: vec!["ghost".into()],
                undoable: true,
                action_type: "archive_email",
            })],
        );
        assert!(result.is_err());
    }
}
