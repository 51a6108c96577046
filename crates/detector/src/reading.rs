//! Reading and sample value types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One raw sensor observation, produced once per processed frame.
///
/// `position` is the normalized vertical coordinate in the modality's
/// calibrated space; `None` means no confident detection this frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorReading {
    /// Normalized vertical position (larger = more upright)
    pub position: Option<f32>,
    /// Current head width, for the lean-closer signal (camera only)
    pub head_width: Option<f32>,
}

impl SensorReading {
    /// Reading with a confident position
    pub fn at(position: f32) -> Self {
        Self {
            position: Some(position),
            head_width: None,
        }
    }

    /// Frame with no confident detection
    pub fn missed() -> Self {
        Self::default()
    }
}

/// Classified posture result, emitted once per processed frame while
/// monitoring. Ephemeral: consumed by status/analytics collaborators,
/// never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PostureReading {
    /// Monotonic time since the session started
    pub timestamp: Duration,
    /// Debounced bad-posture flag
    pub is_bad_posture: bool,
    /// Normalized severity in [0, 1]
    pub severity: f32,
}

/// One scalar captured during a calibration step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSample {
    /// Vertical position (camera) or pitch in degrees (motion)
    pub value: f32,
    /// Head width at capture time, if the modality surfaces one
    pub reference_width: Option<f32>,
}

impl CalibrationSample {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            reference_width: None,
        }
    }

    pub fn with_width(value: f32, width: f32) -> Self {
        Self {
            value,
            reference_width: Some(width),
        }
    }
}
