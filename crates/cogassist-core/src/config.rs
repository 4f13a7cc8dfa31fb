//! Layered configuration: compiled-in defaults, merged with an optional TOML
//! file, merged with environment variables under the `COGASSIST_` prefix.
//! Mirrors the reference gateway's `SkynetConfig::load` layering.

use std::collections::HashSet;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub id: String,
    pub display_name: String,
    pub source: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub folder_overrides: std::collections::HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AccountsConfig {
    pub accounts: Vec<AccountConfig>,
    pub default_account_id: Option<String>,
}

impl AccountsConfig {
    /// A legacy single-account configuration (no `accounts` list, just one
    /// implicit account) migrates into a one-element list with id `default`.
    pub fn migrate_legacy_single(display_name: &str, source: &str) -> Self {
        Self {
            accounts: vec![AccountConfig {
                id: "default".to_string(),
                display_name: display_name.to_string(),
                source: source.to_string(),
                enabled: true,
                username: None,
                folder_overrides: Default::default(),
            }],
            default_account_id: Some("default".to_string()),
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.accounts.is_empty() {
            return Err(CoreError::validation("at least one account is required"));
        }
        let enabled_count = self.accounts.iter().filter(|a| a.enabled).count();
        if enabled_count != 1 {
            return Err(CoreError::validation(format!(
                "exactly one account must be enabled, found {enabled_count}"
            )));
        }
        let mut ids = HashSet::new();
        let mut usernames = HashSet::new();
        for account in &self.accounts {
            if !ids.insert(account.id.as_str()) {
                return Err(CoreError::validation(format!(
                    "duplicate account id '{}'",
                    account.id
                )));
            }
            if let Some(username) = &account.username {
                if !usernames.insert(username.as_str()) {
                    return Err(CoreError::validation(format!(
                        "duplicate account username '{username}'"
                    )));
                }
            }
        }
        if let Some(default_id) = &self.default_account_id {
            if !ids.contains(default_id.as_str()) {
                return Err(CoreError::validation(format!(
                    "default_account_id '{default_id}' does not match any configured account"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    pub max_passes: u32,
    pub convergence_threshold: f64,
    pub pass_timeout_secs: u64,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            max_passes: 5,
            convergence_threshold: 0.85,
            pass_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningConfig {
    pub auto_approve_threshold: f64,
    pub risk_tolerance: String,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            auto_approve_threshold: 0.95,
            risk_tolerance: "medium".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    pub explicit_feedback_weight: f64,
    pub implicit_feedback_weight: f64,
    pub correction_penalty: f64,
    pub modification_penalty: f64,
    pub pattern_confidence_success_boost: f64,
    pub pattern_confidence_failure_penalty: f64,
    pub default_max_age_days: i64,
    pub default_min_occurrences: u32,
    pub default_min_success_rate: f64,
    pub prune_occurrence_multiplier: f64,
    pub prune_success_rate_factor: f64,
    pub default_num_bins: usize,
    pub default_min_samples_per_bin: usize,
    pub default_smoothing_factor: f64,
    pub provider_history_capacity: usize,
    pub calibration_history_capacity: usize,
    pub max_updates_per_cycle: usize,
    pub min_confidence_for_updates: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            explicit_feedback_weight: 0.6,
            implicit_feedback_weight: 0.4,
            correction_penalty: 0.4,
            modification_penalty: 0.3,
            pattern_confidence_success_boost: 1.05,
            pattern_confidence_failure_penalty: 0.85,
            default_max_age_days: 90,
            default_min_occurrences: 3,
            default_min_success_rate: 0.5,
            prune_occurrence_multiplier: 3.0,
            prune_success_rate_factor: 0.5,
            default_num_bins: 10,
            default_min_samples_per_bin: 5,
            default_smoothing_factor: 0.3,
            provider_history_capacity: 10_000,
            calibration_history_capacity: 1_000,
            max_updates_per_cycle: 50,
            min_confidence_for_updates: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelsConfig {
    pub rate_limit_messages: u32,
    pub rate_limit_window_secs: u64,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            rate_limit_messages: 30,
            rate_limit_window_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub accounts: AccountsConfig,
    pub reasoning: ReasoningConfig,
    pub planning: PlanningConfig,
    pub learning: LearningConfig,
    pub channels: ChannelsConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Load layered config: compiled defaults, then an optional TOML file
    /// (explicit path, else `COGASSIST_CONFIG` env var), then `COGASSIST_`
    /// prefixed environment variables. Runs post-load validation that serde
    /// alone cannot express (account uniqueness, exactly-one-enabled).
    pub fn load(explicit_path: Option<&str>) -> CoreResult<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        let path = explicit_path
            .map(str::to_string)
            .or_else(|| std::env::var("COGASSIST_CONFIG").ok());
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("COGASSIST_").split("__"));

        let config: Config = figment
            .extract()
            .map_err(|e| CoreError::validation(format!("config load failed: {e}")))?;

        config.accounts.validate()?;
        Ok(config)
    }
}
