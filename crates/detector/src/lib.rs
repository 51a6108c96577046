//! Posture sensing layer
//!
//! Uniform contract over two unrelated sensing modalities:
//! - Camera: one normalized vertical coordinate per frame, derived from
//!   body or face landmarks supplied by an injected source
//! - Head motion: pitch from a head-worn sensor that can be taken off
//!
//! Consumers depend only on the [`Detector`] trait (dispatched through
//! [`AnyDetector`]), never on a concrete modality.

pub mod calibration_data;
pub mod camera;
pub mod motion;
pub mod reading;

pub use calibration_data::{
    CalibrationData, CameraCalibration, MotionCalibration, MIN_CALIBRATION_SAMPLES, MIN_RANGE,
};
pub use camera::{AuthorizationStatus, CameraDetector, LandmarkFrame, LandmarkSource};
pub use motion::{MotionDetector, MotionSensor, Orientation};
pub use reading::{CalibrationSample, PostureReading, SensorReading};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;

/// Detector error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectorError {
    #[error("Sensing modality not available on this system")]
    Unavailable,

    #[error("Sensing access not authorized")]
    Unauthorized,

    #[error("Sensor present but not coupled to the body")]
    Disconnected,

    #[error("Sensor start failed: {0}")]
    StartFailed(String),
}

/// Events delivered from a detector's background sampling task.
///
/// All events are marshalled over one mpsc channel onto the owner task;
/// no shared state is touched from the sampling context.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectorEvent {
    /// A sensor reading. Emitted only while monitoring.
    Reading(SensorReading),
    /// Physical coupling changed (worn / removed). Camera never emits this.
    Connection(bool),
}

/// Sampling cadence, selected per settings profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FrameRateTier {
    Low,
    #[default]
    Standard,
    High,
}

impl FrameRateTier {
    /// Interval between samples for this tier
    pub fn interval_ms(&self) -> u64 {
        match self {
            FrameRateTier::Low => 500,
            FrameRateTier::Standard => 200,
            FrameRateTier::High => 100,
        }
    }
}

/// Active monitoring parameters, applied at `begin_monitoring` and
/// adjustable while a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonitorParams {
    /// Severity curve aggressiveness (>1 ramps aggressively, <1 gently)
    pub intensity_exponent: f32,
    /// Tolerance band as a fraction of the calibrated range
    pub dead_zone_fraction: f32,
}

impl Default for MonitorParams {
    fn default() -> Self {
        Self {
            intensity_exponent: 2.0,
            dead_zone_fraction: 0.15,
        }
    }
}

/// Capability contract every sensing modality satisfies.
///
/// `start`/`request_authorization` reply through oneshot channels so
/// hardware acquisition never blocks the owner task; readings and
/// connection changes arrive on the event channel supplied at
/// construction.
pub trait Detector {
    /// Modality usable on this system (hardware + OS support)
    fn is_available(&self) -> bool;

    /// Sampling task currently running
    fn is_active(&self) -> bool;

    /// Physically coupled to the body. Always true for modalities
    /// without a coupling notion (camera) while active.
    fn is_connected(&self) -> bool;

    /// Whether calibration must wait for physical coupling
    fn requires_connection(&self) -> bool;

    /// Ask the user for sensing access. Resolves exactly once.
    fn request_authorization(&mut self) -> oneshot::Receiver<bool>;

    /// Begin sampling. Resolves exactly once, with `Err` routed by the
    /// caller into a paused state rather than unwound.
    fn start(&mut self) -> oneshot::Receiver<Result<(), DetectorError>>;

    /// Stop sampling and detach the background task. Safe at any time;
    /// no reading events are delivered afterwards.
    fn stop(&mut self);

    /// One calibration sample from the current frame, if resolvable
    fn current_calibration_sample(&self) -> Option<CalibrationSample>;

    /// Reduce captured samples into calibration data. Rejects fewer
    /// than [`MIN_CALIBRATION_SAMPLES`] samples.
    fn create_calibration_data(&self, samples: &[CalibrationSample]) -> Option<CalibrationData>;

    /// Arm reading emission with the given calibration and parameters
    fn begin_monitoring(&mut self, calibration: CalibrationData, params: MonitorParams);

    /// Disarm reading emission without stopping the sampling task
    fn end_monitoring(&mut self);

    /// Calibration of the active session, `None` while disarmed
    fn active_calibration(&self) -> Option<&CalibrationData>;

    /// Adjust parameters mid-session (settings edit, profile switch)
    fn update_parameters(&mut self, params: MonitorParams);

    /// Parameters of the active session
    fn monitor_params(&self) -> MonitorParams;

    /// Change sampling cadence
    fn set_frame_rate(&mut self, tier: FrameRateTier);

    /// Stable identifier of the underlying source (calibration key part)
    fn source_id(&self) -> String;
}

/// Tagged dispatch over the two modalities.
#[allow(clippy::large_enum_variant)]
pub enum AnyDetector {
    Camera(CameraDetector),
    Motion(MotionDetector),
}

macro_rules! delegate {
    ($self:ident, $d:ident => $body:expr) => {
        match $self {
            AnyDetector::Camera($d) => $body,
            AnyDetector::Motion($d) => $body,
        }
    };
}

impl Detector for AnyDetector {
    fn is_available(&self) -> bool {
        delegate!(self, d => d.is_available())
    }

    fn is_active(&self) -> bool {
        delegate!(self, d => d.is_active())
    }

    fn is_connected(&self) -> bool {
        delegate!(self, d => d.is_connected())
    }

    fn requires_connection(&self) -> bool {
        delegate!(self, d => d.requires_connection())
    }

    fn request_authorization(&mut self) -> oneshot::Receiver<bool> {
        delegate!(self, d => d.request_authorization())
    }

    fn start(&mut self) -> oneshot::Receiver<Result<(), DetectorError>> {
        delegate!(self, d => d.start())
    }

    fn stop(&mut self) {
        delegate!(self, d => d.stop())
    }

    fn current_calibration_sample(&self) -> Option<CalibrationSample> {
        delegate!(self, d => d.current_calibration_sample())
    }

    fn create_calibration_data(&self, samples: &[CalibrationSample]) -> Option<CalibrationData> {
        delegate!(self, d => d.create_calibration_data(samples))
    }

    fn begin_monitoring(&mut self, calibration: CalibrationData, params: MonitorParams) {
        delegate!(self, d => d.begin_monitoring(calibration, params))
    }

    fn end_monitoring(&mut self) {
        delegate!(self, d => d.end_monitoring())
    }

    fn active_calibration(&self) -> Option<&CalibrationData> {
        delegate!(self, d => d.active_calibration())
    }

    fn update_parameters(&mut self, params: MonitorParams) {
        delegate!(self, d => d.update_parameters(params))
    }

    fn monitor_params(&self) -> MonitorParams {
        delegate!(self, d => d.monitor_params())
    }

    fn set_frame_rate(&mut self, tier: FrameRateTier) {
        delegate!(self, d => d.set_frame_rate(tier))
    }

    fn source_id(&self) -> String {
        delegate!(self, d => d.source_id())
    }
}
