//! C5: drives a `WorkingMemory` through 1..max_passes reasoning passes,
//! calling the AI router and the context searcher, until convergence.

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;

use cogassist_core::config::ReasoningConfig;
use cogassist_memory::{Hypothesis, MemoryState, WorkingMemory};

use crate::ai_router::{AiPrompt, AiRouter};
use crate::context::{ContextQuery, ContextSearcher};
use crate::error::ReasonerResult;

const PASS_SEQUENCE: [&str; 5] = [
    "initial_analysis",
    "context_enrichment",
    "deep_reasoning",
    "validation",
    "arbitration",
];

/// Passes beyond the named sequence repeat `arbitration` until `max_passes`
/// is hit (the safety bound in `needs_more_reasoning`).
fn pass_type_for(pass_number: u32) -> &'static str {
    let index = (pass_number as usize).saturating_sub(1);
    PASS_SEQUENCE.get(index).copied().unwrap_or("arbitration")
}

/// One AI router call observed by the reasoner, handed to the learning
/// engine's `ProviderTracker` after the event finishes processing.
#[derive(Debug, Clone)]
pub struct ProviderCallRecord {
    pub provider: String,
    pub model_tier: String,
    pub latency_ms: u64,
    pub cost_usd: f64,
    pub predicted_confidence: f64,
    pub success: bool,
}

fn snapshot(memory: &WorkingMemory) -> serde_json::Value {
    serde_json::to_value(memory).unwrap_or(serde_json::Value::Null)
}

fn record_from(completion: &crate::ai_router::AiCompletion) -> ProviderCallRecord {
    ProviderCallRecord {
        provider: completion.provider.clone(),
        model_tier: completion.model_tier.clone(),
        latency_ms: completion.latency_ms,
        cost_usd: completion.cost_usd,
        predicted_confidence: completion.predicted_confidence,
        success: true,
    }
}

pub struct MultiPassReasoner {
    ai_router: Arc<dyn AiRouter>,
    context_searcher: Arc<dyn ContextSearcher>,
    config: ReasoningConfig,
}

impl MultiPassReasoner {
    pub fn new(
        ai_router: Arc<dyn AiRouter>,
        context_searcher: Arc<dyn ContextSearcher>,
        config: ReasoningConfig,
    ) -> Self {
        Self {
            ai_router,
            context_searcher,
            config,
        }
    }

    /// Drive `memory` to convergence. On fail-safe (a pass body returns an
    /// error), the current pass is still completed and the memory
    /// transitions to `Complete` with the best hypothesis so far preserved
    /// before the error is returned — every pass already run remains in the
    /// history regardless of the overall outcome.
    pub async fn run(&self, memory: &mut WorkingMemory) -> ReasonerResult<Vec<ProviderCallRecord>> {
        let mut provider_calls = Vec::new();
        let mut pass_number: u32 = 0;

        loop {
            pass_number += 1;
            let pass_type = pass_type_for(pass_number);
            memory.start_reasoning_pass(pass_number, pass_type)?;

            let timeout = Duration::from_secs(self.config.pass_timeout_secs);
            match tokio::time::timeout(timeout, self.run_pass_body(pass_type, memory)).await {
                Ok(Ok(calls)) => {
                    provider_calls.extend(calls);
                    memory.complete_reasoning_pass()?;
                }
                Ok(Err(err)) => {
                    memory.complete_reasoning_pass()?;
                    memory.transition_to(MemoryState::Complete);
                    return Err(err);
                }
                Err(_elapsed) => {
                    memory.timeout_current_pass();
                }
            }

            if !memory.needs_more_reasoning(self.config.convergence_threshold, self.config.max_passes)
            {
                break;
            }
        }

        memory.transition_to(MemoryState::Complete);
        Ok(provider_calls)
    }

    async fn run_pass_body(
        &self,
        pass_type: &str,
        memory: &mut WorkingMemory,
    ) -> ReasonerResult<Vec<ProviderCallRecord>> {
        match pass_type {
            "initial_analysis" => self.initial_analysis(memory).await,
            "context_enrichment" => self.context_enrichment(memory).await,
            "deep_reasoning" => self.deep_reasoning(memory).await,
            "validation" => self.validation(memory).await,
            _ => self.arbitration(memory).await,
        }
    }

    async fn initial_analysis(
        &self,
        memory: &mut WorkingMemory,
    ) -> ReasonerResult<Vec<ProviderCallRecord>> {
        let prompt = AiPrompt {
            pass_type: "initial_analysis".to_string(),
            working_memory_snapshot: snapshot(memory),
            context_items: Vec::new(),
        };
        let completion = self.ai_router.complete(&prompt).await?;
        let record = record_from(&completion);

        let hypothesis_id = format!("h-{}", memory.event().event_id());
        memory.add_hypothesis(
            Hypothesis::new(
                hypothesis_id,
                completion.text.clone(),
                completion.predicted_confidence,
            ),
            true,
        )?;
        memory.update_confidence(completion.predicted_confidence);

        if let Some(pass) = memory.current_pass_mut() {
            pass.ai_prompts.push(prompt.pass_type.clone());
            pass.ai_responses.push(completion.text.clone());
        }
        Ok(vec![record])
    }

    async fn context_enrichment(
        &self,
        memory: &mut WorkingMemory,
    ) -> ReasonerResult<Vec<ProviderCallRecord>> {
        let event = memory.event();
        let entities: Vec<String> = event.entities().iter().map(|e| e.value.clone()).collect();
        let query = ContextQuery {
            entities: entities.clone(),
            window_start: event.occurred_at() - ChronoDuration::days(30),
            window_end: event.occurred_at() + ChronoDuration::days(30),
        };

        let items = self.context_searcher.search(&query).await?;
        let item_count = items.len();
        for item in items {
            memory.add_context_item(item);
        }

        if let Some(pass) = memory.current_pass_mut() {
            pass.context_queries
                .push(format!("{} entities, {item_count} items retrieved", entities.len()));
            pass.entities_extracted.extend(entities);
        }
        Ok(Vec::new())
    }

    async fn deep_reasoning(
        &self,
        memory: &mut WorkingMemory,
    ) -> ReasonerResult<Vec<ProviderCallRecord>> {
        let prompt = AiPrompt {
            pass_type: "deep_reasoning".to_string(),
            working_memory_snapshot: snapshot(memory),
            context_items: memory.context_items().to_vec(),
        };
        let completion = self.ai_router.complete(&prompt).await?;
        let record = record_from(&completion);

        if let Some(existing_id) = memory.best_hypothesis().map(|h| h.id.clone()) {
            memory.add_hypothesis(
                Hypothesis::new(
                    existing_id,
                    completion.text.clone(),
                    completion.predicted_confidence,
                ),
                true,
            )?;
        }
        memory.update_confidence(completion.predicted_confidence);

        if let Some(pass) = memory.current_pass_mut() {
            pass.ai_responses.push(completion.text.clone());
            pass.insights
                .push("deep reasoning refined the leading hypothesis".to_string());
        }
        Ok(vec![record])
    }

    async fn validation(&self, memory: &mut WorkingMemory) -> ReasonerResult<Vec<ProviderCallRecord>> {
        let prompt = AiPrompt {
            pass_type: "validation".to_string(),
            working_memory_snapshot: snapshot(memory),
            context_items: memory.context_items().to_vec(),
        };
        let completion = self.ai_router.complete(&prompt).await?;
        let record = record_from(&completion);

        // Validation can only narrow confidence, never inflate what earlier
        // passes already established.
        let adjusted = memory.overall_confidence().min(completion.predicted_confidence);
        memory.update_confidence(adjusted);

        if let Some(pass) = memory.current_pass_mut() {
            pass.ai_responses.push(completion.text.clone());
        }
        Ok(vec![record])
    }

    async fn arbitration(
        &self,
        memory: &mut WorkingMemory,
    ) -> ReasonerResult<Vec<ProviderCallRecord>> {
        // Arbitration commits to the leading hypothesis without a further AI
        // call; unresolved open questions and uncertainties, if any, persist
        // and are bounded only by `max_passes`.
        if let Some(pass) = memory.current_pass_mut() {
            pass.insights
                .push("arbitration: committing to the leading hypothesis".to_string());
        }
        Ok(Vec::new())
    }
}
