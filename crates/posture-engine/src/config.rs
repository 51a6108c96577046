//! Engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Evaluation parameters, snapshotted per call. May change between
/// calls when the user edits settings or switches profiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PostureConfig {
    /// Severity curve aggressiveness; >1 ramps aggressively, <1 gently
    pub intensity_exponent: f32,

    /// Tolerance band as a fraction of the calibrated range
    pub dead_zone_fraction: f32,

    /// Minimum sustained bad posture before the warning shows
    pub warning_onset_delay: Duration,
}

impl Default for PostureConfig {
    fn default() -> Self {
        Self {
            intensity_exponent: 2.0,
            dead_zone_fraction: 0.15,
            warning_onset_delay: Duration::from_secs(5),
        }
    }
}

impl PostureConfig {
    /// Config that warns faster and tolerates less deviation
    pub fn strict() -> Self {
        Self {
            intensity_exponent: 3.0,
            dead_zone_fraction: 0.08,
            warning_onset_delay: Duration::from_secs(2),
        }
    }

    /// Config that warns later and ramps gently
    pub fn lenient() -> Self {
        Self {
            intensity_exponent: 0.8,
            dead_zone_fraction: 0.25,
            warning_onset_delay: Duration::from_secs(10),
        }
    }
}
