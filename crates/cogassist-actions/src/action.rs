//! The action capability set, expressed as a trait rather than an
//! inheritance hierarchy. Undo state lives in the returned `ActionResult`,
//! never in the action instance, so an action stays a plain value.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Auto,
    Review,
    Manual,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Fluent accumulator for validation errors/warnings, mirroring the
/// original's builder: conditional checks only fire their message when the
/// condition holds, and `build()` yields the final immutable result.
#[derive(Debug, Default)]
pub struct ValidationBuilder {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.errors.push(message.into());
        self
    }

    pub fn error_if(self, condition: bool, message: impl Into<String>) -> Self {
        if condition {
            self.error(message)
        } else {
            self
        }
    }

    pub fn error_unless(self, condition: bool, message: impl Into<String>) -> Self {
        self.error_if(!condition, message)
    }

    pub fn warning(mut self, message: impl Into<String>) -> Self {
        self.warnings.push(message.into());
        self
    }

    pub fn warning_if(self, condition: bool, message: impl Into<String>) -> Self {
        if condition {
            self.warning(message)
        } else {
            self
        }
    }

    pub fn validate_date(
        self,
        date: Option<DateTime<Utc>>,
        field_name: &str,
        must_be_future: bool,
    ) -> Self {
        match date {
            Some(d) if must_be_future && d <= Utc::now() => {
                self.error(format!("{field_name} must be in the future"))
            }
            _ => self,
        }
    }

    pub fn build(self) -> ValidationResult {
        ValidationResult {
            valid: self.errors.is_empty(),
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}

/// Outcome of one `execute()` call. Truthiness is `success`; undo-relevant
/// state (original folder, created id, prior content) is captured here, at
/// the moment of successful execution — never cached on the action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub duration_secs: f64,
    #[serde(default)]
    pub output: HashMap<String, Value>,
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    pub executed_at: DateTime<Utc>,
}

impl ActionResult {
    pub fn success(duration_secs: f64) -> Self {
        Self {
            success: true,
            duration_secs,
            output: HashMap::new(),
            error: None,
            metadata: HashMap::new(),
            executed_at: Utc::now(),
        }
    }

    pub fn failure(duration_secs: f64, error: impl Into<String>) -> Self {
        Self {
            success: false,
            duration_secs,
            output: HashMap::new(),
            error: Some(error.into()),
            metadata: HashMap::new(),
            executed_at: Utc::now(),
        }
    }

    pub fn with_output(mut self, key: &str, value: Value) -> Self {
        self.output.insert(key.to_string(), value);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

impl From<&ActionResult> for bool {
    fn from(result: &ActionResult) -> bool {
        result.success
    }
}

/// The capability set every concrete action implements. Identity is the
/// `action_id`: a stable string derived from the action type and its key
/// parameters, sanitized so it is safe to use as a map key or file name.
pub trait Action: std::fmt::Debug + Send + Sync {
    fn action_id(&self) -> &str;
    fn action_type(&self) -> &str;
    fn validate(&self) -> ValidationResult;
    fn execute(&mut self) -> Result<ActionResult, String>;
    fn supports_undo(&self) -> bool;
    fn can_undo(&self, result: &ActionResult) -> bool {
        self.supports_undo() && result.success
    }
    fn undo(&mut self, result: &ActionResult) -> Result<bool, String>;
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }
    fn estimated_duration_secs(&self) -> f64 {
        1.0
    }
}

/// Sanitize free-form parameters into a stable id fragment: lowercase,
/// non-alphanumeric runs collapsed to a single `-`.
pub fn sanitize_id_fragment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_dash = false;
    for ch in raw.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            last_was_dash = false;
        } else if !last_was_dash {
            out.push('-');
            last_was_dash = true;
        }
    }
    out.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_builder_accumulates_conditional_errors() {
        let result = ValidationBuilder::new()
            .error_unless(false, "always fails")
            .warning_if(true, "heads up")
            .build();
        assert!(!result.is_valid());
        assert_eq!(result.errors, vec!["always fails"]);
        assert_eq!(result.warnings, vec!["heads up"]);
    }

    #[test]
    fn action_result_truthiness_is_success() {
        let ok = ActionResult::success(0.1);
        let bad = ActionResult::failure(0.1, "boom");
        assert!(bool::from(&ok));
        assert!(!bool::from(&bad));
    }

    #[test]
    fn sanitize_id_fragment_collapses_and_trims() {
        assert_eq!(sanitize_id_fragment("Hello, World!!"), "hello-world");
        assert_eq!(sanitize_id_fragment("  a__b "), "a-b");
    }
}
