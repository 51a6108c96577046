//! Application state and settings
//!
//! Owns the single authoritative operating state, the settings profile
//! collection, and the narrow interfaces behind which persistence and
//! analytics collaborators live.

pub mod collaborators;
pub mod machine;
pub mod profile;
pub mod state;

pub use collaborators::{Analytics, CalibrationStore, ProfileStore, StatusSink};
pub use machine::{AppStateMachine, TransitionEffect};
pub use profile::{ProfileError, ProfileManager, SettingsProfile};
pub use state::{AppState, PauseReason, Status};
