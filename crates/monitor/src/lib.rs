//! Posture Monitor Daemon
//!
//! Wires the whole pipeline together: a detector samples position, the
//! posture engine classifies it against a stored calibration, the state
//! machine arbitrates operating modes, and the compositor animates the
//! warning output.

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub mod adapters;
pub mod config;
pub mod service;

pub use adapters::{
    LogRenderSurface, LogStatusSink, MemoryAnalytics, MemoryCalibrationStore, MemoryProfileStore,
    RenderSurface, SyntheticLandmarkSource, SyntheticMotionSensor,
};
pub use config::{Modality, MonitorConfig};
pub use service::{Collaborators, Command, MonitorHandle, MonitorService};

/// Initialize structured logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    // Fails only when a subscriber was already installed
    let _ = tracing::subscriber::set_global_default(subscriber);
}
