//! C9 top-level orchestration: turn one piece of user feedback into a
//! knowledge update batch, a pattern-store update, a calibration
//! observation, and (when a provider call produced the analyzed result) a
//! provider-tracker record.

use std::path::Path;
use std::sync::Arc;

use cogassist_actions::collaborators::NoteManager;
use cogassist_actions::ExecutedAction;
use cogassist_core::config::LearningConfig;
use cogassist_memory::WorkingMemory;
use tracing::{info, warn};

use crate::calibrator::ConfidenceCalibrator;
use crate::error::{LearningEngineError, LearningResult};
use crate::feedback::{FeedbackAnalysis, FeedbackProcessor, UserFeedback};
use crate::knowledge::KnowledgeUpdater;
use crate::pattern_store::PatternStore;
use crate::provider_tracker::{CallRecord, ProviderTracker};

#[derive(Debug, Clone)]
pub struct LearningOutcome {
    pub triggered: bool,
    pub analysis: Option<FeedbackAnalysis>,
    pub updates_applied: usize,
    pub updates_skipped: usize,
    pub updates_failed: usize,
}

pub struct LearningEngine {
    feedback_processor: FeedbackProcessor,
    knowledge_updater: KnowledgeUpdater,
    pattern_store: PatternStore,
    provider_tracker: ProviderTracker,
    calibrator: ConfidenceCalibrator,
}

impl LearningEngine {
    pub fn new(
        config: LearningConfig,
        note_manager: Arc<dyn NoteManager>,
        data_dir: impl AsRef<Path>,
    ) -> LearningResult<Self> {
        let data_dir = data_dir.as_ref();
        let pattern_store = PatternStore::new(data_dir.join("patterns.json"), config.clone())?;
        let provider_tracker = ProviderTracker::new(data_dir.join("provider_scores.json"), config.clone())?;
        let calibrator = ConfidenceCalibrator::new(data_dir.join("calibration.json"), config.clone())?;

        Ok(Self {
            feedback_processor: FeedbackProcessor::new(config.clone()),
            knowledge_updater: KnowledgeUpdater::new(config, note_manager),
            pattern_store,
            provider_tracker,
            calibrator,
        })
    }

    pub fn pattern_store(&self) -> &PatternStore {
        &self.pattern_store
    }

    pub fn provider_tracker(&self) -> &ProviderTracker {
        &self.provider_tracker
    }

    pub fn calibrator(&self) -> &ConfidenceCalibrator {
        &self.calibrator
    }

    /// Run one learning cycle from a piece of user feedback. Recoverable
    /// failures (pattern-store, storage) degrade `updates_failed` and
    /// `updates_skipped` rather than aborting the cycle; anything else
    /// surfaces as `LearningEngineError::Unexpected`.
    pub fn learn(
        &self,
        feedback: &UserFeedback,
        memory: &WorkingMemory,
        executed: &[ExecutedAction],
        provider_call: Option<(&str, &str, CallRecord)>,
    ) -> LearningResult<LearningOutcome> {
        if !self.feedback_processor.should_trigger_learning(feedback) {
            return Ok(LearningOutcome {
                triggered: false,
                analysis: None,
                updates_applied: 0,
                updates_skipped: 0,
                updates_failed: 0,
            });
        }

        let analysis = self.feedback_processor.analyze(feedback, memory, executed);
        let pass_count = memory.reasoning_passes().len();
        let updates = self.knowledge_updater.derive(memory.event(), &analysis, pass_count);
        let apply_outcome = self.knowledge_updater.apply_batch(updates);
        for (id, cause) in &apply_outcome.failed {
            warn!(update_id = %id, error = %cause, "knowledge update failed");
        }

        let matched = self.pattern_store.matching(memory.event());
        let mut pattern_failures = 0usize;
        for pattern in &matched {
            if let Err(cause) = self
                .pattern_store
                .record_outcome(&pattern.pattern_id, analysis.correctness >= 0.5)
            {
                warn!(pattern_id = %pattern.pattern_id, error = %cause, "pattern outcome recording failed");
                pattern_failures += 1;
            }
        }

        if let Err(err) = self.calibrator.observe(memory.overall_confidence(), analysis.correctness) {
            return Err(LearningEngineError::from(err));
        }

        if let Some((provider, tier, mut record)) = provider_call {
            record.actual_quality = analysis.correctness;
            if let Err(err) = self.provider_tracker.record(provider, tier, record) {
                return Err(LearningEngineError::from(err));
            }
        }

        info!(
            event_id = %memory.event().event_id(),
            correctness = analysis.correctness,
            updates_applied = apply_outcome.applied,
            "learning cycle complete"
        );

        Ok(LearningOutcome {
            triggered: true,
            analysis: Some(analysis),
            updates_applied: apply_outcome.applied,
            updates_skipped: apply_outcome.skipped_low_confidence,
            updates_failed: apply_outcome.failed.len() + pattern_failures,
        })
    }

    /// Periodic maintenance: prune stale/unreliable patterns and flush the
    /// provider tracker's cache to disk.
    pub fn run_maintenance(&self) -> LearningResult<Vec<String>> {
        let pruned = self.pattern_store.prune()?;
        self.provider_tracker.flush()?;
        Ok(pruned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cogassist_core::event::{Event, EventSource, EventType, NewEvent, UrgencyLevel};
    use std::collections::HashMap;

    #[derive(Debug)]
    struct FakeNoteManager;
    impl NoteManager for FakeNoteManager {
        fn create_note(&self, _title: &str, _content: &str, _tags: &[String], _entities: &[String]) -> Result<String, String> {
            Ok("note-1".into())
        }
        fn update_note(&self, _id: &str, _changes: &HashMap<String, serde_json::Value>) -> Result<(), String> {
            Ok(())
        }
        fn get_note(&self, _id: &str) -> Result<Option<String>, String> {
            Ok(None)
        }
        fn delete_note(&self, _id: &str) -> Result<(), String> {
            Ok(())
        }
    }

    fn sample_memory() -> WorkingMemory {
        let now = Utc::now();
        let event = Event::try_new(NewEvent {
            event_id: "evt-1".into(),
            source: Some(EventSource::Mail),
            occurred_at: Some(now),
            received_at: Some(now),
            perceived_at: Some(now),
            title: "Invoice".into(),
            event_type: Some(EventType::Information),
            urgency: Some(UrgencyLevel::Low),
            from_person: "a@example.com".into(),
            perception_confidence: 0.9,
            ..Default::default()
        })
        .unwrap();
        let mut memory = WorkingMemory::new(event);
        memory.update_confidence(0.9);
        memory
    }

    fn engine(dir: &std::path::Path) -> LearningEngine {
        LearningEngine::new(LearningConfig::default(), Arc::new(FakeNoteManager), dir).unwrap()
    }

    #[test]
    fn perfect_confirmation_does_not_trigger_a_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());
        let feedback = UserFeedback {
            approved: true,
            rating: Some(5),
            correction: None,
            modification: None,
            comment: None,
            action_executed: true,
            time_to_action_secs: Some(5.0),
        };
        let outcome = engine.learn(&feedback, &sample_memory(), &[], None).unwrap();
        assert!(!outcome.triggered);
        assert_eq!(outcome.updates_applied, 0);
    }

    #[test]
    fn correction_triggers_a_full_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());
        let feedback = UserFeedback {
            approved: false,
            rating: Some(2),
            correction: Some("wrong folder".into()),
            modification: None,
            comment: None,
            action_executed: false,
            time_to_action_secs: None,
        };
        let outcome = engine.learn(&feedback, &sample_memory(), &[], None).unwrap();
        assert!(outcome.triggered);
        assert!(outcome.analysis.is_some());
    }

    #[test]
    fn maintenance_runs_without_error_on_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());
        assert!(engine.run_maintenance().unwrap().is_empty());
    }
}
