//! C5's AI router contract: a structured prompt in, `(text, token_usage)`
//! plus an observed provider/tier/latency/cost out, all fed to the learning
//! engine downstream. The reasoner must not assume a single provider, so
//! `FailoverRouter` tries priority-ordered slots the way the reference
//! agent's `ProviderRouter` tries LLM backends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use cogassist_memory::ContextItem;

use crate::error::{ReasonerError, ReasonerResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// A structured prompt for one reasoning pass.
#[derive(Debug, Clone)]
pub struct AiPrompt {
    pub pass_type: String,
    pub working_memory_snapshot: serde_json::Value,
    pub context_items: Vec<ContextItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiCompletion {
    pub text: String,
    pub token_usage: TokenUsage,
    pub provider: String,
    pub model_tier: String,
    pub latency_ms: u64,
    pub cost_usd: f64,
    pub predicted_confidence: f64,
}

/// One LLM backend. Implementors perform the actual network call; the
/// router composes them with failover.
#[async_trait]
pub trait AiProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, prompt: &AiPrompt) -> Result<AiCompletion, String>;
}

/// Anything the reasoner can call for a completion. Implemented by
/// `FailoverRouter` for production use and by test doubles in unit tests.
#[async_trait]
pub trait AiRouter: Send + Sync {
    async fn complete(&self, prompt: &AiPrompt) -> ReasonerResult<AiCompletion>;
}

pub struct ProviderSlot {
    pub provider: Box<dyn AiProvider>,
    pub max_retries: u32,
}

impl ProviderSlot {
    pub fn new(provider: Box<dyn AiProvider>, max_retries: u32) -> Self {
        Self { provider, max_retries }
    }
}

/// Tries slots in priority order; retries each with exponential backoff up
/// to its own cap. A rate-limited response skips remaining retries on that
/// slot and advances immediately to the next. Exhausting every slot is a
/// transient external error.
pub struct FailoverRouter {
    slots: Vec<ProviderSlot>,
}

impl FailoverRouter {
    pub fn new(slots: Vec<ProviderSlot>) -> Self {
        assert!(
            !slots.is_empty(),
            "FailoverRouter requires at least one provider slot"
        );
        Self { slots }
    }
}

#[async_trait]
impl AiRouter for FailoverRouter {
    async fn complete(&self, prompt: &AiPrompt) -> ReasonerResult<AiCompletion> {
        let mut last_err: Option<String> = None;

        for slot in &self.slots {
            let name = slot.provider.name();

            for attempt in 0..=slot.max_retries {
                match slot.provider.complete(prompt).await {
                    Ok(completion) => {
                        if attempt > 0 {
                            info!(provider = %name, attempt, "ai provider succeeded after retry");
                        }
                        return Ok(completion);
                    }
                    Err(e) => {
                        warn!(provider = %name, attempt, error = %e, "ai provider call failed");
                        let rate_limited = e.to_lowercase().contains("rate limit");
                        last_err = Some(e);

                        if rate_limited {
                            break;
                        }
                        if attempt < slot.max_retries {
                            let backoff_ms = 200u64 * (attempt as u64 + 1);
                            tokio::time::sleep(tokio::time::Duration::from_millis(backoff_ms))
                                .await;
                        }
                    }
                }
            }
            info!(provider = %name, "provider exhausted, trying next slot");
        }

        Err(ReasonerError::ProviderExhausted(
            last_err.unwrap_or_else(|| "no provider slots configured".to_string()),
        ))
    }
}
