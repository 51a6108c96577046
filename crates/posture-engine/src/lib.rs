//! Posture evaluation engine
//!
//! Pure reducers over monitoring state:
//! - [`engine::process`] classifies one positioned reading (smoothing,
//!   hysteresis, frame debounce, onset delay, severity curve)
//! - [`engine::process_absence`] tracks user absence from missed
//!   detections
//!
//! The reducers never perform side effects; they return an [`Effect`]
//! list the owner task executes.

pub mod config;
pub mod engine;
pub mod state;

pub use config::PostureConfig;
pub use engine::{process, process_absence, Effect};
pub use state::MonitoringState;
