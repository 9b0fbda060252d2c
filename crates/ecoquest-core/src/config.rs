//! Session configuration, loadable from JSON.
//!
//! ```
//! use ecoquest_core::config::GameConfig;
//!
//! let cfg = GameConfig::from_json_str(r#"{ "quiz": { "time_limit_secs": 45.0 } }"#).unwrap();
//! assert_eq!(cfg.quiz.time_limit_secs, 45.0);
//! assert_eq!(cfg.quiz.max_retries, 2);
//! assert_eq!(cfg.store.integrity_check_interval_secs, 30.0);
//! ```

use std::path::Path;

use ecoquest_logic::scoring::QuizConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tunables for the progress store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Seconds of session time between live integrity re-checks.
    pub integrity_check_interval_secs: f64,
    /// Seconds of accumulated playtime between saves.
    pub playtime_flush_interval_secs: f64,
    /// Storage key prefix; the sanitized player name is appended.
    pub storage_key_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            integrity_check_interval_secs: 30.0,
            playtime_flush_interval_secs: 10.0,
            storage_key_prefix: "ecoquest_progress_".to_string(),
        }
    }
}

/// Everything a session needs to be configured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub quiz: QuizConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl GameConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.quiz.time_limit_secs) {
            return Err(ConfigError::Invalid("quiz.time_limit_secs must be positive".into()));
        }
        if self
            .quiz
            .bonus_tiers
            .windows(2)
            .any(|w| w[0].min_remaining_fraction <= w[1].min_remaining_fraction)
        {
            return Err(ConfigError::Invalid(
                "quiz.bonus_tiers must be strictly decreasing".into(),
            ));
        }
        if self
            .quiz
            .attempt_credit
            .iter()
            .any(|c| !c.is_finite() || *c < 0.0 || *c > 1.0)
        {
            return Err(ConfigError::Invalid(
                "quiz.attempt_credit values must be within 0..=1".into(),
            ));
        }
        if !positive(self.store.integrity_check_interval_secs) {
            return Err(ConfigError::Invalid(
                "store.integrity_check_interval_secs must be positive".into(),
            ));
        }
        if !positive(self.store.playtime_flush_interval_secs) {
            return Err(ConfigError::Invalid(
                "store.playtime_flush_interval_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}
