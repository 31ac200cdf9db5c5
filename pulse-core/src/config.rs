//! Configuration
//!
//! All knobs of the demo application layer, loadable from JSON. Every field
//! has a default, so `{}` is a valid configuration and partial documents only
//! override what they name. Durations are written in milliseconds.
//!
//! ```json
//! {
//!   "validation": { "debounce_ms": 500, "valid_length_above": 3, "enabled_length_above": 5 },
//!   "timer": { "interval_ms": 1000, "autostart": true },
//!   "data_service": { "values": ["Hello", "World"], "step_ms": 1000, "log_capacity": 64 }
//! }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PulseConfig {
    pub validation: ValidationConfig,
    pub timer: TimerConfig,
    pub data_service: DataServiceConfig,
}

impl PulseConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timer.interval_ms == 0 {
            return Err(ConfigError::Invalid("timer.interval_ms must be positive".into()));
        }
        if self.data_service.values.is_empty() {
            return Err(ConfigError::Invalid("data_service.values must not be empty".into()));
        }
        if self.data_service.log_capacity == Some(0) {
            return Err(ConfigError::Invalid(
                "data_service.log_capacity must be positive when set".into(),
            ));
        }
        Ok(())
    }
}

/// Text-field validation rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Quiet period before text is re-validated.
    pub debounce_ms: u64,
    /// Text is valid when its character count exceeds this.
    pub valid_length_above: usize,
    /// The action is enabled when the text is valid and its character count
    /// exceeds this.
    pub enabled_length_above: usize,
}

impl ValidationConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            valid_length_above: 3,
            enabled_length_above: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimerConfig {
    pub interval_ms: u64,
    /// Start ticking as soon as the view model exists.
    pub autostart: bool,
}

impl TimerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            autostart: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataServiceConfig {
    /// Values each demo publisher sends, in order.
    pub values: Vec<String>,
    /// Delay between consecutive sends; the first send has no delay.
    pub step_ms: u64,
    /// Bound on each received-value log. `None` keeps everything.
    pub log_capacity: Option<usize>,
}

impl DataServiceConfig {
    pub fn step(&self) -> Duration {
        Duration::from_millis(self.step_ms)
    }
}

impl Default for DataServiceConfig {
    fn default() -> Self {
        Self {
            values: ["Hello", "World", "SwiftUI", "Combine"]
                .into_iter()
                .map(String::from)
                .collect(),
            step_ms: 1000,
            log_capacity: None,
        }
    }
}
