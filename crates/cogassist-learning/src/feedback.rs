//! C9's FeedbackProcessor: turns a `UserFeedback` plus the working memory
//! and executed actions that produced it into a `FeedbackAnalysis`.

use cogassist_actions::ExecutedAction;
use cogassist_core::config::LearningConfig;
use cogassist_core::util::clamp;
use cogassist_memory::WorkingMemory;

#[derive(Debug, Clone)]
pub struct UserFeedback {
    pub approved: bool,
    pub rating: Option<u8>,
    pub correction: Option<String>,
    pub modification: Option<String>,
    pub comment: Option<String>,
    pub action_executed: bool,
    pub time_to_action_secs: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct FeedbackAnalysis {
    pub correctness: f64,
    pub action_quality: f64,
    pub reasoning_quality: f64,
    /// In `[-1, 1]`: predicted confidence minus observed correctness.
    pub confidence_error: f64,
    pub suggested_improvements: Vec<String>,
}

pub struct FeedbackProcessor {
    config: LearningConfig,
}

impl FeedbackProcessor {
    pub fn new(config: LearningConfig) -> Self {
        Self { config }
    }

    fn explicit_component(&self, feedback: &UserFeedback) -> f64 {
        let mut score = match feedback.rating {
            Some(rating) => cogassist_core::util::rating_to_score(rating),
            None if feedback.approved => 1.0,
            None => 0.0,
        };
        if feedback.correction.is_some() {
            score -= self.config.correction_penalty;
        }
        if feedback.modification.is_some() {
            score -= self.config.modification_penalty;
        }
        clamp(score)
    }

    fn implicit_component(&self, feedback: &UserFeedback) -> f64 {
        if !feedback.action_executed {
            return 0.0;
        }
        match feedback.time_to_action_secs {
            None => 1.0,
            Some(secs) => (1.0 - secs / 3600.0).clamp(0.2, 1.0),
        }
    }

    pub fn analyze(&self, feedback: &UserFeedback, memory: &WorkingMemory, executed: &[ExecutedAction]) -> FeedbackAnalysis {
        let explicit = self.explicit_component(feedback);
        let implicit = self.implicit_component(feedback);
        let correctness = clamp(
            explicit * self.config.explicit_feedback_weight
                + implicit * self.config.implicit_feedback_weight,
        );

        let successful_actions = executed.iter().filter(|a| a.result.success).count();
        let action_quality = if executed.is_empty() {
            correctness
        } else {
            clamp(correctness * (successful_actions as f64 / executed.len() as f64))
        };

        let pass_count = memory.reasoning_passes().len().max(1) as f64;
        let reasoning_quality = clamp(correctness * (1.0 - 1.0 / (pass_count + 1.0)));

        let confidence_error = (memory.overall_confidence() - correctness).clamp(-1.0, 1.0);

        let mut suggested_improvements = Vec::new();
        if let Some(correction) = &feedback.correction {
            suggested_improvements.push("review hypothesis generation for this event type".to_string());
            suggested_improvements.push(format!("user correction: {correction}"));
        }
        if let Some(modification) = &feedback.modification {
            suggested_improvements.push("review action parameters for this event type".to_string());
            suggested_improvements.push(format!("user modification: {modification}"));
        }
        if let Some(comment) = &feedback.comment {
            suggested_improvements.push(format!("user comment: {comment}"));
        }
        if confidence_error.abs() > 0.3 {
            suggested_improvements.push("recalibrate confidence for this provider/tier".to_string());
        }

        FeedbackAnalysis {
            correctness,
            action_quality,
            reasoning_quality,
            confidence_error,
            suggested_improvements,
        }
    }

    /// Filters perfect confirmations (approved, top rating or none given, no
    /// correction/modification) to avoid thrashing the learning loop on
    /// unremarkable successes.
    pub fn should_trigger_learning(&self, feedback: &UserFeedback) -> bool {
        let perfect_rating = feedback.rating.map(|r| r == 5).unwrap_or(true);
        let is_perfect_confirmation = feedback.approved
            && perfect_rating
            && feedback.correction.is_none()
            && feedback.modification.is_none();
        !is_perfect_confirmation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cogassist_core::event::{Event, EventSource, EventType, NewEvent, UrgencyLevel};

    fn sample_memory() -> WorkingMemory {
        let now = Utc::now();
        let event = Event::try_new(NewEvent {
            event_id: "evt-1".into(),
            source: Some(EventSource::Mail),
            occurred_at: Some(now),
            received_at: Some(now),
            perceived_at: Some(now),
            title: "x".into(),
            event_type: Some(EventType::Information),
            urgency: Some(UrgencyLevel::Low),
            from_person: "a@example.com".into(),
            perception_confidence: 0.8,
            ..Default::default()
        })
        .unwrap();
        let mut memory = WorkingMemory::new(event);
        memory.update_confidence(0.9);
        memory
    }

    fn perfect_feedback() -> UserFeedback {
        UserFeedback {
            approved: true,
            rating: Some(5),
            correction: None,
            modification: None,
            comment: None,
            action_executed: true,
            time_to_action_secs: Some(10.0),
        }
    }

    #[test]
    fn perfect_confirmation_does_not_trigger_learning() {
        let processor = FeedbackProcessor::new(LearningConfig::default());
        assert!(!processor.should_trigger_learning(&perfect_feedback()));
    }

    #[test]
    fn correction_triggers_learning_and_lowers_correctness() {
        let processor = FeedbackProcessor::new(LearningConfig::default());
        let mut feedback = perfect_feedback();
        feedback.correction = Some("should have archived instead".to_string());
        assert!(processor.should_trigger_learning(&feedback));

        let analysis = processor.analyze(&feedback, &sample_memory(), &[]);
        let baseline = processor.analyze(&perfect_feedback(), &sample_memory(), &[]);
        assert!(analysis.correctness < baseline.correctness);
        assert!(analysis
            .suggested_improvements
            .iter()
            .any(|s| s.contains("should have archived instead")));
    }

    #[test]
    fn rejection_without_rating_yields_low_correctness() {
        let processor = FeedbackProcessor::new(LearningConfig::default());
        let feedback = UserFeedback {
            approved: false,
            rating: None,
            correction: None,
            modification: None,
            comment: None,
            action_executed: false,
            time_to_action_secs: None,
        };
        let analysis = processor.analyze(&feedback, &sample_memory(), &[]);
        assert!(analysis.correctness < 0.2);
    }

    #[test]
    fn confidence_error_is_bounded() {
        let processor = FeedbackProcessor::new(LearningConfig::default());
        let analysis = processor.analyze(&perfect_feedback(), &sample_memory(), &[]);
        assert!((-1.0..=1.0).contains(&analysis.confidence_error));
    }
}
