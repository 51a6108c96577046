//! Narrow interfaces for injected collaborators
//!
//! Persistence and analytics are external systems; the state machine
//! and engine talk to them only through these traits so everything in
//! this workspace stays testable without real storage.

use crate::profile::SettingsProfile;
use crate::state::Status;
use detector::CalibrationData;
use uuid::Uuid;

/// Usage analytics consumer.
pub trait Analytics: Send {
    /// Accumulate monitored wall-clock time under the given flag
    fn track_time(&mut self, slouching: bool, seconds: f32);

    /// Record a discrete event (e.g. one slouch onset)
    fn record_event(&mut self, name: &str);
}

/// Settings persistence, keyed by profile id.
pub trait ProfileStore: Send {
    fn load_all(&self) -> Vec<SettingsProfile>;
    fn load_active_id(&self) -> Option<Uuid>;
    fn save(&mut self, profile: &SettingsProfile);
    fn save_active_id(&mut self, id: Uuid);
    fn delete(&mut self, id: Uuid);
}

/// Calibration persistence, keyed by a display-configuration
/// fingerprint.
pub trait CalibrationStore: Send {
    fn load(&self, fingerprint: &str) -> Option<CalibrationData>;
    fn save(&mut self, fingerprint: &str, data: &CalibrationData);
}

/// Presentation-layer status consumer (menu text/icon).
pub trait StatusSink: Send {
    fn status_changed(&mut self, status: Status);
}

/// No-op analytics for setups that opt out of tracking.
#[derive(Debug, Default)]
pub struct NullAnalytics;

impl Analytics for NullAnalytics {
    fn track_time(&mut self, _slouching: bool, _seconds: f32) {}
    fn record_event(&mut self, _name: &str) {}
}
