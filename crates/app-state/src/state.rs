//! Operating state

use serde::{Deserialize, Serialize};

/// Why monitoring is paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PauseReason {
    /// No settings profile exists yet
    NoProfile,
    /// User marked themselves on the go
    OnTheGo,
    /// Sensing source failed to start or dropped out
    SourceDisconnected,
    /// Screen is locked
    ScreenLocked,
    /// Head-worn motion source was taken off
    MotionSourceRemoved,
}

/// The single authoritative operating state. Exactly one instance,
/// process-wide; every transition goes through
/// [`crate::AppStateMachine::set_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppState {
    Disabled,
    Calibrating,
    Monitoring,
    Paused(PauseReason),
}

impl AppState {
    /// Sensing or calibration in progress
    pub fn is_active(&self) -> bool {
        matches!(self, AppState::Calibrating | AppState::Monitoring)
    }

    /// Whether the active detector should be running in this state.
    /// `Paused(MotionSourceRemoved)` keeps it running so the motion
    /// source can signal its own return.
    pub fn detector_should_run(&self) -> bool {
        matches!(
            self,
            AppState::Calibrating
                | AppState::Monitoring
                | AppState::Paused(PauseReason::MotionSourceRemoved)
        )
    }

    /// Status keyed for the presentation layer
    pub fn status(&self) -> Status {
        match self {
            AppState::Calibrating => Status::Calibrating,
            AppState::Monitoring => Status::Good,
            AppState::Disabled | AppState::Paused(_) => Status::Paused,
        }
    }
}

/// Small status enum driving the menu text/icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Good,
    Bad,
    Away,
    Paused,
    Calibrating,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detector_runs_while_awaiting_motion_return() {
        assert!(AppState::Paused(PauseReason::MotionSourceRemoved).detector_should_run());
        assert!(!AppState::Paused(PauseReason::ScreenLocked).detector_should_run());
        assert!(!AppState::Disabled.detector_should_run());
        assert!(AppState::Calibrating.detector_should_run());
    }

    #[test]
    fn test_active_states() {
        assert!(AppState::Monitoring.is_active());
        assert!(AppState::Calibrating.is_active());
        assert!(!AppState::Paused(PauseReason::OnTheGo).is_active());
        assert!(!AppState::Disabled.is_active());
    }
}
