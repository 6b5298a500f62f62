// src/config/mod.rs
//! Configuration management for stimulation supervision

pub mod constants;
pub mod loader;

pub use loader::{ConfigError, ConfigLoader};

use crate::utils::validation::{ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete crate configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StimConfig {
    /// Supervision timing settings
    #[serde(default)]
    pub supervisor: SupervisorSettings,
}

/// Timing parameters of the stimulation supervisor
///
/// The grace period bounds how long a superseded operation may take to
/// acknowledge cancellation before `update`/`end` give up; the poll interval
/// is how often a running operation asks the device for command status.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SupervisorSettings {
    /// Cancellation grace period in milliseconds
    #[serde(default = "defaults::cancellation_grace_ms")]
    pub cancellation_grace_ms: u64,

    /// Device status poll interval in milliseconds
    #[serde(default = "defaults::status_poll_interval_ms")]
    pub status_poll_interval_ms: u64,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            cancellation_grace_ms: defaults::cancellation_grace_ms(),
            status_poll_interval_ms: defaults::status_poll_interval_ms(),
        }
    }
}

impl SupervisorSettings {
    /// Validate the settings against the supported envelope.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.cancellation_grace_ms == 0
            || self.cancellation_grace_ms > constants::supervisor::MAX_CANCELLATION_GRACE_MS
        {
            return Err(ValidationError::OutOfRange {
                field: "cancellation_grace_ms".to_string(),
                value: self.cancellation_grace_ms.to_string(),
                min: "1".to_string(),
                max: constants::supervisor::MAX_CANCELLATION_GRACE_MS.to_string(),
            });
        }

        if self.status_poll_interval_ms == 0
            || self.status_poll_interval_ms > self.cancellation_grace_ms
        {
            return Err(ValidationError::OutOfRange {
                field: "status_poll_interval_ms".to_string(),
                value: self.status_poll_interval_ms.to_string(),
                min: "1".to_string(),
                max: self.cancellation_grace_ms.to_string(),
            });
        }

        Ok(())
    }

    /// Grace period as a [`Duration`].
    pub fn cancellation_grace(&self) -> Duration {
        Duration::from_millis(self.cancellation_grace_ms)
    }

    /// Poll interval as a [`Duration`].
    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_millis(self.status_poll_interval_ms)
    }
}

/// Default value providers using constants
mod defaults {
    use crate::config::constants::supervisor;

    pub fn cancellation_grace_ms() -> u64 {
        supervisor::DEFAULT_CANCELLATION_GRACE_MS
    }

    pub fn status_poll_interval_ms() -> u64 {
        supervisor::DEFAULT_STATUS_POLL_INTERVAL_MS
    }
}
