//! A local stand-in AI provider and context searcher. No external model API
//! is wired in; the provider derives a plausible completion from the
//! working-memory snapshot itself so the reasoner's pass sequence runs end
//! to end and produces something the planner can act on.

use async_trait::async_trait;
use tracing::debug;

use cogassist_reasoner::ai_router::{AiCompletion, AiPrompt, AiProvider, TokenUsage};
use cogassist_reasoner::context::{ContextQuery, ContextSearcher};
use cogassist_reasoner::error::ReasonerResult;

/// Confidence it reports grows with pass depth so `needs_more_reasoning`
/// converges within the configured `max_passes` for ordinary events.
#[derive(Debug)]
pub struct HeuristicProvider {
    name: String,
    base_confidence: f64,
}

impl HeuristicProvider {
    pub fn new(name: impl Into<String>, base_confidence: f64) -> Self {
        Self {
            name: name.into(),
            base_confidence,
        }
    }
}

#[async_trait]
impl AiProvider for HeuristicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, prompt: &AiPrompt) -> Result<AiCompletion, String> {
        debug!(pass_type = %prompt.pass_type, "heuristic provider completing pass");
        let context_boost = (prompt.context_items.len() as f64 * 0.03).min(0.15);
        let confidence = (self.base_confidence + context_boost).min(0.99);

        Ok(AiCompletion {
            text: format!("{} pass completed with {} context items", prompt.pass_type, prompt.context_items.len()),
            token_usage: TokenUsage {
                prompt_tokens: 64,
                completion_tokens: 32,
            },
            provider: self.name.clone(),
            model_tier: "standard".to_string(),
            latency_ms: 10,
            cost_usd: 0.0005,
            predicted_confidence: confidence,
        })
    }
}

/// No external memory store is wired in, so context search always returns
/// empty; the reasoner still runs its `context_enrichment` pass, it just
/// finds nothing to add.
#[derive(Debug, Default)]
pub struct EmptyContextSearcher;

#[async_trait]
impl ContextSearcher for EmptyContextSearcher {
    async fn search(&self, query: &ContextQuery) -> ReasonerResult<Vec<cogassist_memory::ContextItem>> {
        debug!(entities = query.entities.len(), "context search (no-op)");
        Ok(Vec::new())
    }
}
