//! C9's ProviderTracker: per `(provider, tier)` running quality/cost/latency
//! stats used to pick the best AI provider for a future call.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cogassist_core::config::LearningConfig;
use cogassist_storage::atomic::{read_json, write_json_atomic};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizeFor {
    Speed,
    Cost,
    Quality,
    Balanced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    pub timestamp: DateTime<Utc>,
    pub latency_ms: u64,
    pub cost: f64,
    pub success: bool,
    pub predicted_confidence: f64,
    pub actual_quality: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderScore {
    pub provider: String,
    pub tier: String,
    pub total_calls: u64,
    pub successes: u64,
    pub avg_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub avg_cost: f64,
    pub avg_quality: f64,
    #[serde(default)]
    history: VecDeque<CallRecord>,
}

impl ProviderScore {
    fn new(provider: String, tier: String) -> Self {
        Self {
            provider,
            tier,
            total_calls: 0,
            successes: 0,
            avg_latency_ms: 0.0,
            p95_latency_ms: 0.0,
            avg_cost: 0.0,
            avg_quality: 0.0,
            history: VecDeque::new(),
        }
    }

    fn success_rate(&self) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            self.successes as f64 / self.total_calls as f64
        }
    }

    fn record(&mut self, record: CallRecord, capacity: usize) {
        self.total_calls += 1;
        if record.success {
            self.successes += 1;
        }
        self.history.push_back(record);
        while self.history.len() > capacity {
            self.history.pop_front();
        }
        self.recompute();
    }

    fn recompute(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let count = self.history.len() as f64;
        self.avg_latency_ms = self.history.iter().map(|r| r.latency_ms as f64).sum::<f64>() / count;
        self.avg_cost = self.history.iter().map(|r| r.cost).sum::<f64>() / count;
        self.avg_quality = self.history.iter().map(|r| r.actual_quality).sum::<f64>() / count;

        let mut latencies: Vec<u64> = self.history.iter().map(|r| r.latency_ms).collect();
        latencies.sort_unstable();
        let idx = ((latencies.len() as f64) * 0.95).ceil() as usize;
        let idx = idx.saturating_sub(1).min(latencies.len() - 1);
        self.p95_latency_ms = latencies[idx] as f64;
    }

    fn score_for(&self, optimize_for: OptimizeFor) -> f64 {
        let quality = self.avg_quality;
        let speed = if self.avg_latency_ms <= 0.0 {
            1.0
        } else {
            (1.0 / (1.0 + self.avg_latency_ms / 1000.0)).clamp(0.0, 1.0)
        };
        let cost = if self.avg_cost <= 0.0 {
            1.0
        } else {
            (1.0 / (1.0 + self.avg_cost)).clamp(0.0, 1.0)
        };

        let raw = match optimize_for {
            OptimizeFor::Speed => speed,
            OptimizeFor::Cost => cost,
            OptimizeFor::Quality => quality,
            OptimizeFor::Balanced => quality * 0.5 + speed * 0.25 + cost * 0.25,
        };
        raw * self.success_rate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct TrackerFile {
    scores: Vec<ProviderScore>,
}

fn key(provider: &str, tier: &str) -> String {
    format!("{provider}:{tier}")
}

pub struct ProviderTracker {
    config: LearningConfig,
    path: PathBuf,
    scores: Arc<DashMap<String, ProviderScore>>,
}

impl ProviderTracker {
    pub fn new(path: impl Into<PathBuf>, config: LearningConfig) -> cogassist_storage::StorageResult<Self> {
        let path = path.into();
        let scores = Arc::new(DashMap::new());
        if let Some(file) = read_json::<TrackerFile>(&path)? {
            for score in file.scores {
                scores.insert(key(&score.provider, &score.tier), score);
            }
        }
        Ok(Self { config, path, scores })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record one completed call. Persists every 100 total calls across all
    /// providers, rather than on every single write.
    pub fn record(&self, provider: &str, tier: &str, record: CallRecord) -> cogassist_storage::StorageResult<()> {
        let mut entry = self
            .scores
            .entry(key(provider, tier))
            .or_insert_with(|| ProviderScore::new(provider.to_string(), tier.to_string()));
        entry.record(record, self.config.provider_history_capacity);
        drop(entry);
        let total: u64 = self.scores.iter().map(|e| e.value().total_calls).sum();
        if total % 100 == 0 {
            self.persist()?;
        }
        Ok(())
    }

    fn persist(&self) -> cogassist_storage::StorageResult<()> {
        let scores: Vec<ProviderScore> = self.scores.iter().map(|e| e.value().clone()).collect();
        write_json_atomic(&self.path, &TrackerFile { scores })
    }

    pub fn flush(&self) -> cogassist_storage::StorageResult<()> {
        self.persist()
    }

    /// Pick the highest-scoring provider for `optimize_for` among providers
    /// with at least `min_calls` samples. `None` if no provider qualifies.
    pub fn get_best_provider(&self, optimize_for: OptimizeFor, min_calls: u64) -> Option<(String, String)> {
        self.scores
            .iter()
            .filter(|e| e.value().total_calls >= min_calls)
            .map(|e| (e.value().score_for(optimize_for), e.value().provider.clone(), e.value().tier.clone()))
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(_, provider, tier)| (provider, tier))
    }

    pub fn get(&self, provider: &str, tier: &str) -> Option<ProviderScore> {
        self.scores.get(&key(provider, tier)).map(|e| e.value().clone())
    }
}
