//! C9's PatternStore: a persistent, thread-safe table of learned patterns,
//! matched against incoming events and pruned on a schedule.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cogassist_core::config::LearningConfig;
use cogassist_core::event::{Event, UrgencyLevel};
use cogassist_storage::atomic::{read_json, write_json_atomic};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub pattern_id: String,
    pub description: String,
    pub event_type: Option<String>,
    pub min_urgency: Option<UrgencyLevel>,
    pub required_entity_types: Vec<String>,
    pub context_keys: HashMap<String, String>,
    pub occurrences: u32,
    pub successes: u32,
    pub success_rate: f64,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    pub last_matched_at: DateTime<Utc>,
}

impl Pattern {
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(expected) = &self.event_type {
            if expected != &format!("{:?}", event.event_type()) {
                return false;
            }
        }
        if let Some(min_urgency) = self.min_urgency {
            if event.urgency() < min_urgency {
                return false;
            }
        }
        for required in &self.required_entity_types {
            if !event.entities().iter().any(|e| &e.entity_type == required) {
                return false;
            }
        }
        for (key, value) in &self.context_keys {
            match event.metadata().get(key) {
                Some(actual) if actual.as_str() == Some(value.as_str()) => {}
                _ => return false,
            }
        }
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PatternFile {
    patterns: Vec<Pattern>,
}

pub struct PatternStore {
    config: LearningConfig,
    path: PathBuf,
    patterns: Arc<DashMap<String, Pattern>>,
}

impl PatternStore {
    pub fn new(path: impl Into<PathBuf>, config: LearningConfig) -> cogassist_storage::StorageResult<Self> {
        let path = path.into();
        let patterns = Arc::new(DashMap::new());
        if let Some(file) = read_json::<PatternFile>(&path)? {
            for pattern in file.patterns {
                patterns.insert(pattern.pattern_id.clone(), pattern);
            }
        }
        Ok(Self { config, path, patterns })
    }

    fn persist(&self) -> cogassist_storage::StorageResult<()> {
        let patterns: Vec<Pattern> = self.patterns.iter().map(|e| e.value().clone()).collect();
        write_json_atomic(&self.path, &PatternFile { patterns })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn add(&self, pattern: Pattern) -> Result<(), String> {
        if self.patterns.contains_key(&pattern.pattern_id) {
            return Err(format!("pattern '{}' already exists", pattern.pattern_id));
        }
        self.patterns.insert(pattern.pattern_id.clone(), pattern);
        self.persist().map_err(|e| e.to_string())
    }

    /// Recompute a pattern's stats after an observed execution, replacing it
    /// immutably rather than mutating fields in place.
    pub fn record_outcome(&self, pattern_id: &str, success: bool) -> Result<(), String> {
        let mut pattern = self
            .patterns
            .get(pattern_id)
            .map(|e| e.value().clone())
            .ok_or_else(|| format!("pattern '{pattern_id}' not found"))?;

        pattern.occurrences += 1;
        if success {
            pattern.successes += 1;
        }
        pattern.success_rate = pattern.successes as f64 / pattern.occurrences as f64;
        let factor = if success {
            self.config.pattern_confidence_success_boost
        } else {
            self.config.pattern_confidence_failure_penalty
        };
        pattern.confidence = (pattern.confidence * factor).clamp(0.0, 1.0);
        pattern.last_matched_at = Utc::now();

        self.patterns.insert(pattern_id.to_string(), pattern);
        self.persist().map_err(|e| e.to_string())
    }

    pub fn matching(&self, event: &Event) -> Vec<Pattern> {
        self.patterns
            .iter()
            .filter(|e| e.value().matches(event))
            .map(|e| e.value().clone())
            .collect()
    }

    /// Query with occurrence/success-rate gates, ranked by a relevance score
    /// combining confidence, recency, and sample reliability. The working
    /// set is snapshotted under the lock then scored outside it.
    pub fn query(&self, min_occurrences: u32, min_success_rate: f64) -> Vec<Pattern> {
        let snapshot: Vec<Pattern> = self.patterns.iter().map(|e| e.value().clone()).collect();
        let now = Utc::now();

        let mut filtered: Vec<(f64, Pattern)> = snapshot
            .into_iter()
            .filter(|p| p.occurrences >= min_occurrences && p.success_rate >= min_success_rate)
            .map(|p| {
                let age_days = (now - p.last_matched_at).num_seconds() as f64 / 86_400.0;
                let recency = (1.0 - age_days / self.config.default_max_age_days as f64).max(0.0);
                let reliability = (p.occurrences as f64 / (p.occurrences as f64 + 5.0)).min(1.0);
                let score = p.confidence * 0.5 + recency * 0.25 + reliability * 0.25;
                (score, p)
            })
            .collect();

        filtered.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        filtered.into_iter().map(|(_, p)| p).collect()
    }

    /// Drop patterns that are stale (`max_age_days`) or have accumulated
    /// enough samples to be confidently unreliable. Returns the removed ids.
    pub fn prune(&self) -> cogassist_storage::StorageResult<Vec<String>> {
        let now = Utc::now();
        let occurrence_floor =
            self.config.default_min_occurrences as f64 * self.config.prune_occurrence_multiplier;
        let success_ceiling = self.config.default_min_success_rate * self.config.prune_success_rate_factor;

        let mut removed = Vec::new();
        for entry in self.patterns.iter() {
            let pattern = entry.value();
            let age_days = (now - pattern.created_at).num_seconds() as f64 / 86_400.0;
            let stale = age_days > self.config.default_max_age_days as f64;
            let unreliable =
                pattern.occurrences as f64 >= occurrence_floor && pattern.success_rate < success_ceiling;
            if stale || unreliable {
                removed.push(pattern.pattern_id.clone());
            }
        }
        for id in &removed {
            self.patterns.remove(id);
        }
        if !removed.is_empty() {
            self.persist()?;
        }
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogassist_core::event::{EventSource, EventType, NewEvent};

    fn sample_event() -> Event {
        let now = Utc::now();
        Event::try_new(NewEvent {
            event_id: "evt-1".into(),
            source: Some(EventSource::Mail),
            occurred_at: Some(now),
            received_at: Some(now),
            perceived_at: Some(now),
            title: "x".into(),
            event_type: Some(EventType::Request),
            urgency: Some(UrgencyLevel::High),
            from_person: "a@example.com".into(),
            perception_confidence: 0.8,
            ..Default::default()
        })
        .unwrap()
    }

    fn sample_pattern(id: &str) -> Pattern {
        let now = Utc::now();
        Pattern {
            pattern_id: id.to_string(),
            description: "urgent request".into(),
            event_type: Some("Request".into()),
            min_urgency: Some(UrgencyLevel::Medium),
            required_entity_types: Vec::new(),
            context_keys: HashMap::new(),
            occurrences: 0,
            successes: 0,
            success_rate: 0.0,
            confidence: 0.5,
            created_at: now,
            last_matched_at: now,
        }
    }

    #[test]
    fn add_then_match_finds_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let store = PatternStore::new(dir.path().join("patterns.json"), LearningConfig::default()).unwrap();
        store.add(sample_pattern("p1")).unwrap();
        assert_eq!(store.matching(&sample_event()).len(), 1);
    }

    #[test]
    fn record_outcome_updates_success_rate_and_confidence() {
        let dir = tempfile::tempdir().unwrap();
        let store = PatternStore::new(dir.path().join("patterns.json"), LearningConfig::default()).unwrap();
        store.add(sample_pattern("p1")).unwrap();
        store.record_outcome("p1", true).unwrap();
        store.record_outcome("p1", false).unwrap();
        let pattern = store.matching(&sample_event())[0].clone();
        assert_eq!(pattern.occurrences, 2);
        assert!((pattern.success_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn reopening_store_loads_persisted_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patterns.json");
        let store = PatternStore::new(&path, LearningConfig::default()).unwrap();
        store.add(sample_pattern("p1")).unwrap();

        let reopened = PatternStore::new(&path, LearningConfig::default()).unwrap();
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn prune_removes_unreliable_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let store = PatternStore::new(dir.path().join("patterns.json"), LearningConfig::default()).unwrap();
        let mut pattern = sample_pattern("p1");
        pattern.occurrences = 20;
        pattern.success_rate = 0.1;
        store.add(pattern).unwrap();

        let removed = store.prune().unwrap();
        assert_eq!(removed, vec!["p1".to_string()]);
        assert!(store.is_empty());
    }
}
