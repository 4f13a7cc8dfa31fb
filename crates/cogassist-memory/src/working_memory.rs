//! The per-event blackboard the reasoner drives to convergence. A
//! `WorkingMemory` is owned by exactly one processing worker for the
//! lifetime of one event; it is never shared or serialized across threads.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use cogassist_core::error::{CoreError, CoreResult};
use cogassist_core::event::Event;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryState {
    Initialized,
    Perceiving,
    Reasoning,
    Planning,
    Executing,
    Complete,
    Archived,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hypothesis {
    pub id: String,
    pub description: String,
    pub confidence: f64,
    #[serde(default)]
    pub supporting_evidence: Vec<String>,
    #[serde(default)]
    pub contradicting_evidence: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Hypothesis {
    pub fn new(id: impl Into<String>, description: impl Into<String>, confidence: f64) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            description: description.into(),
            confidence,
            supporting_evidence: Vec::new(),
            contradicting_evidence: Vec::new(),
            created_at: now,
            updated_at: now,
            metadata: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextItem {
    pub source: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub content: String,
    pub relevance_score: f64,
    pub retrieved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningPass {
    pub pass_number: u32,
    pub pass_type: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_secs: Option<f64>,
    pub input_confidence: f64,
    pub output_confidence: Option<f64>,
    pub confidence_delta: Option<f64>,
    pub input_hypothesis_count: usize,
    pub output_hypothesis_count: Option<usize>,
    #[serde(default)]
    pub context_queries: Vec<String>,
    #[serde(default)]
    pub ai_prompts: Vec<String>,
    #[serde(default)]
    pub ai_responses: Vec<String>,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub questions_raised: Vec<String>,
    #[serde(default)]
    pub entities_extracted: Vec<String>,
    #[serde(default)]
    pub timed_out: bool,
}

impl ReasoningPass {
    fn start(pass_number: u32, pass_type: impl Into<String>, input_confidence: f64, input_hypothesis_count: usize) -> Self {
        Self {
            pass_number,
            pass_type: pass_type.into(),
            started_at: Utc::now(),
            completed_at: None,
            duration_secs: None,
            input_confidence,
            output_confidence: None,
            confidence_delta: None,
            input_hypothesis_count,
            output_hypothesis_count: None,
            context_queries: Vec::new(),
            ai_prompts: Vec::new(),
            ai_responses: Vec::new(),
            insights: Vec::new(),
            questions_raised: Vec::new(),
            entities_extracted: Vec::new(),
            timed_out: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Continuity {
    pub thread_id: String,
    pub prior_events: Vec<Event>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingMemory {
    event: Event,
    state: MemoryState,
    hypotheses: HashMap<String, Hypothesis>,
    best_hypothesis_id: Option<String>,
    reasoning_passes: Vec<ReasoningPass>,
    current_pass: Option<ReasoningPass>,
    context_items: Vec<ContextItem>,
    open_questions: Vec<String>,
    uncertainties: Vec<String>,
    continuity: Option<Continuity>,
    overall_confidence: f64,
}

impl WorkingMemory {
    pub fn new(event: Event) -> Self {
        Self {
            event,
            state: MemoryState::Initialized,
            hypotheses: HashMap::new(),
            best_hypothesis_id: None,
            reasoning_passes: Vec::new(),
            current_pass: None,
            context_items: Vec::new(),
            open_questions: Vec::new(),
            uncertainties: Vec::new(),
            continuity: None,
            overall_confidence: 0.0,
        }
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn state(&self) -> MemoryState {
        self.state
    }

    pub fn overall_confidence(&self) -> f64 {
        self.overall_confidence
    }

    pub fn update_confidence(&mut self, confidence: f64) {
        self.overall_confidence = confidence.clamp(0.0, 1.0);
    }

    pub fn best_hypothesis(&self) -> Option<&Hypothesis> {
        self.best_hypothesis_id
            .as_ref()
            .and_then(|id| self.hypotheses.get(id))
    }

    pub fn hypotheses(&self) -> impl Iterator<Item = &Hypothesis> {
        self.hypotheses.values()
    }

    pub fn hypothesis_count(&self) -> usize {
        self.hypotheses.len()
    }

    pub fn reasoning_passes(&self) -> &[ReasoningPass] {
        &self.reasoning_passes
    }

    pub fn context_items(&self) -> &[ContextItem] {
        &self.context_items
    }

    pub fn open_questions(&self) -> &[String] {
        &self.open_questions
    }

    pub fn uncertainties(&self) -> &[String] {
        &self.uncertainties
    }

    /// Defensive shallow copy: events are immutable, so cloning the vec is
    /// cheap and prevents the caller's buffer from mutating our view.
    pub fn set_continuity(&mut self, thread_id: impl Into<String>, prior_events: &[Event]) {
        self.continuity = Some(Continuity {
            thread_id: thread_id.into(),
            prior_events: prior_events.to_vec(),
        });
    }

    pub fn continuity(&self) -> Option<&Continuity> {
        self.continuity.as_ref()
    }

    /// Preconditions: state is not `Complete`/`Archived`, and no pass is
    /// currently in progress.
    pub fn start_reasoning_pass(
        &mut self,
        pass_number: u32,
        pass_type: impl Into<String>,
    ) -> CoreResult<()> {
        if matches!(self.state, MemoryState::Complete | MemoryState::Archived) {
            return Err(CoreError::state_machine(
                "cannot start a reasoning pass once the working memory is complete or archived",
            ));
        }
        if self.current_pass.is_some() {
            return Err(CoreError::state_machine(
                "a reasoning pass is already in progress",
            ));
        }
        self.current_pass = Some(ReasoningPass::start(
            pass_number,
            pass_type,
            self.overall_confidence,
            self.hypotheses.len(),
        ));
        self.state = MemoryState::Reasoning;
        Ok(())
    }

    /// Preconditions: a pass is in progress and state is `Reasoning`. The
    /// state remains `Reasoning` afterward — the next transition (another
    /// pass, or moving to `Planning`) is explicit.
    pub fn complete_reasoning_pass(&mut self) -> CoreResult<()> {
        if self.state != MemoryState::Reasoning {
            return Err(CoreError::state_machine(
                "cannot complete a reasoning pass outside the reasoning state",
            ));
        }
        let mut pass = self
            .current_pass
            .take()
            .ok_or_else(|| CoreError::state_machine("no reasoning pass is in progress"))?;

        let completed_at = Utc::now();
        pass.completed_at = Some(completed_at);
        pass.duration_secs = Some((completed_at - pass.started_at).num_milliseconds() as f64 / 1000.0);
        pass.output_confidence = Some(self.overall_confidence);
        pass.confidence_delta = Some(self.overall_confidence - pass.input_confidence);
        pass.output_hypothesis_count = Some(self.hypotheses.len());

        self.reasoning_passes.push(pass);
        Ok(())
    }

    /// Marks the current pass (if any) complete with a timeout flag, used by
    /// the reasoner's cancellation path: the pre-call state is preserved and
    /// confidence/hypotheses are left untouched.
    pub fn timeout_current_pass(&mut self) {
        if let Some(mut pass) = self.current_pass.take() {
            pass.timed_out = true;
            let completed_at = Utc::now();
            pass.completed_at = Some(completed_at);
            pass.duration_secs =
                Some((completed_at - pass.started_at).num_milliseconds() as f64 / 1000.0);
            pass.output_confidence = Some(pass.input_confidence);
            pass.confidence_delta = Some(0.0);
            pass.output_hypothesis_count = Some(pass.input_hypothesis_count);
            self.reasoning_passes.push(pass);
        }
    }

    pub fn current_pass_mut(&mut self) -> Option<&mut ReasoningPass> {
        self.current_pass.as_mut()
    }

    /// Duplicate id is an error unless `replace` is set. The best-hypothesis
    /// pointer is recomputed by max confidence after every insertion.
    pub fn add_hypothesis(&mut self, hypothesis: Hypothesis, replace: bool) -> CoreResult<()> {
        if !replace && self.hypotheses.contains_key(&hypothesis.id) {
            return Err(CoreError::validation(format!(
                "hypothesis '{}' already exists",
                hypothesis.id
            )));
        }
        let id = hypothesis.id.clone();
        self.hypotheses.insert(id, hypothesis);
        self.recompute_best();
        Ok(())
    }

    fn recompute_best(&mut self) {
        self.best_hypothesis_id = self
            .hypotheses
            .values()
            .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap())
            .map(|h| h.id.clone());
    }

    pub fn add_context_item(&mut self, item: ContextItem) {
        self.context_items.push(item);
    }

    pub fn add_open_question(&mut self, question: impl Into<String>) {
        let question = question.into();
        if !self.open_questions.contains(&question) {
            self.open_questions.push(question);
        }
    }

    pub fn add_uncertainty(&mut self, uncertainty: impl Into<String>) {
        let uncertainty = uncertainty.into();
        if !self.uncertainties.contains(&uncertainty) {
            self.uncertainties.push(uncertainty);
        }
    }

    pub fn transition_to(&mut self, state: MemoryState) {
        self.state = state;
    }

    /// Stop if `passes >= max_passes` (safety bound); continue if confidence
    /// is below `threshold`; else continue while open questions or
    /// uncertainties remain; otherwise stop.
    pub fn needs_more_reasoning(&self, threshold: f64, max_passes: u32) -> bool {
        if self.reasoning_passes.len() as u32 >= max_passes {
            return false;
        }
        if self.overall_confidence < threshold {
            return true;
        }
        !self.open_questions.is_empty() || !self.uncertainties.is_empty()
    }

    pub fn get_reasoning_summary(&self) -> ReasoningSummary {
        ReasoningSummary {
            passes_completed: self.reasoning_passes.len(),
            overall_confidence: self.overall_confidence,
            best_hypothesis_id: self.best_hypothesis_id.clone(),
            open_question_count: self.open_questions.len(),
            uncertainty_count: self.uncertainties.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningSummary {
    pub passes_completed: usize,
    pub overall_confidence: f64,
    pub best_hypothesis_id: Option<String>,
    pub open_question_count: usize,
    pub uncertainty_count: usize,
}
