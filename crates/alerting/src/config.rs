use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::feedback::VibrationPattern;

/// Escalation settings. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub strobe_interval_ms: u64,
    pub warning_pattern: Vec<u64>,
    pub critical_pattern: Vec<u64>,
    /// Loop start of `critical_pattern`; `None` plays it once
    pub critical_repeat: Option<usize>,
    pub audio_source: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            strobe_interval_ms: constants::STROBE_INTERVAL_MS,
            warning_pattern: constants::WARNING_VIBRATION_MS.to_vec(),
            critical_pattern: constants::CRITICAL_VIBRATION_MS.to_vec(),
            critical_repeat: Some(constants::CRITICAL_VIBRATION_REPEAT),
            audio_source: constants::DEFAULT_AUDIO_SOURCE.to_string(),
        }
    }
}

impl AlertConfig {
    pub fn strobe_interval(&self) -> Duration {
        Duration::from_millis(self.strobe_interval_ms)
    }

    pub fn warning_vibration(&self) -> VibrationPattern {
        VibrationPattern::once(self.warning_pattern.clone())
    }

    pub fn critical_vibration(&self) -> VibrationPattern {
        VibrationPattern {
            timings_ms: self.critical_pattern.clone(),
            repeat: self.critical_repeat,
        }
    }
}
