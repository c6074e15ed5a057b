//! Engine configuration

use crate::error::{EngineError, EngineResult};
use chrono_tz::Tz;
use flagline_cron::{parse_timezone, resolve_timezone};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::debug;

/// Default context attribute used for percentage rollout.
pub const DEFAULT_ROLLOUT_KEY: &str = "user_id";

/// Default cap on cron occurrences enumerated per schedule.
pub const DEFAULT_MAX_CRON_OCCURRENCES: usize = 100_000;

/// Configuration shared by the evaluator and the timeline builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rollout attribute for features that do not name one
    pub default_rollout_key: String,
    /// IANA zone used when a request or schedule names none (or an invalid one)
    pub default_timezone: String,
    /// Upper bound on cron firings enumerated per schedule and window
    pub max_cron_occurrences: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_rollout_key: DEFAULT_ROLLOUT_KEY.to_string(),
            default_timezone: "UTC".to_string(),
            max_cron_occurrences: DEFAULT_MAX_CRON_OCCURRENCES,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create config from environment variables.
    ///
    /// - `FLAGLINE_ROLLOUT_KEY` - default rollout attribute
    /// - `FLAGLINE_TIMEZONE` - default IANA timezone
    /// - `FLAGLINE_MAX_CRON_OCCURRENCES` - cron enumeration cap
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let default_rollout_key = env::var("FLAGLINE_ROLLOUT_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.default_rollout_key);

        let default_timezone = env::var("FLAGLINE_TIMEZONE")
            .ok()
            .filter(|v| parse_timezone(v).is_ok())
            .unwrap_or(defaults.default_timezone);

        let max_cron_occurrences = env::var("FLAGLINE_MAX_CRON_OCCURRENCES")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_cron_occurrences);

        let config = Self {
            default_rollout_key,
            default_timezone,
            max_cron_occurrences,
        };
        debug!(config = ?config, "Loaded engine configuration from environment");
        config
    }

    pub fn with_default_rollout_key(mut self, key: impl Into<String>) -> Self {
        self.default_rollout_key = key.into();
        self
    }

    pub fn with_default_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.default_timezone = timezone.into();
        self
    }

    pub fn with_max_cron_occurrences(mut self, max: usize) -> Self {
        self.max_cron_occurrences = max;
        self
    }

    /// Check the configuration for values the engine cannot work with.
    pub fn validate(&self) -> EngineResult<()> {
        if self.default_rollout_key.trim().is_empty() {
            return Err(EngineError::config("default rollout key must not be empty"));
        }
        if self.max_cron_occurrences == 0 {
            return Err(EngineError::config("max cron occurrences must be positive"));
        }
        parse_timezone(&self.default_timezone)?;
        Ok(())
    }

    /// The default timezone, or UTC if it cannot be loaded.
    pub fn timezone(&self) -> Tz {
        resolve_timezone(Some(&self.default_timezone), Tz::UTC)
    }
}
