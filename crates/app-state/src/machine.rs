//! Application state machine

use crate::state::{AppState, PauseReason, Status};
use tracing::{debug, info};

/// Synchronization side effects of an effective transition, in the
/// order the owner must execute them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEffect {
    /// Reconcile whether the active detector runs
    SetDetectorRunning(bool),
    /// Zero posture-warning intensity and the away blur target so no
    /// stale warning persists while inactive
    ClearWarnings,
    /// Re-apply the active profile's parameters to detector and
    /// compositor
    ApplyActiveProfile,
    /// Update the presentation layer's status text/icon
    NotifyStatus(Status),
}

/// The single read/write slot holding [`AppState`].
///
/// Assignment is a no-op when the value is unchanged, which prevents
/// redundant side effects and transition loops. The machine itself
/// performs no I/O: it returns the ordered effect list and the owner
/// task executes it, which is also what makes the "intensity is zero
/// within one transition" guarantee checkable.
#[derive(Debug)]
pub struct AppStateMachine {
    state: AppState,
}

impl AppStateMachine {
    pub fn new(initial: AppState) -> Self {
        Self { state: initial }
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    /// Transition to `new`, returning the side effects to run.
    pub fn set_state(&mut self, new: AppState) -> Vec<TransitionEffect> {
        if new == self.state {
            debug!(?new, "state unchanged, skipping transition");
            return Vec::new();
        }
        info!(from = ?self.state, to = ?new, "state transition");
        self.state = new;

        let mut effects = vec![TransitionEffect::SetDetectorRunning(
            new.detector_should_run(),
        )];
        if !new.is_active() {
            effects.push(TransitionEffect::ClearWarnings);
        }
        if new == AppState::Monitoring {
            effects.push(TransitionEffect::ApplyActiveProfile);
        }
        effects.push(TransitionEffect::NotifyStatus(new.status()));
        effects
    }

    /// A detector reported an asynchronous start failure. Never fatal:
    /// it becomes a paused state.
    pub fn handle_start_failure(&mut self) -> Vec<TransitionEffect> {
        self.set_state(AppState::Paused(PauseReason::SourceDisconnected))
    }

    /// Physical coupling of the motion source changed. Calibration
    /// handles its own suspension, so only monitoring reacts here.
    pub fn handle_connection_change(&mut self, connected: bool) -> Vec<TransitionEffect> {
        match (self.state, connected) {
            (AppState::Monitoring, false) => {
                self.set_state(AppState::Paused(PauseReason::MotionSourceRemoved))
            }
            (AppState::Paused(PauseReason::MotionSourceRemoved), true) => {
                self.set_state(AppState::Monitoring)
            }
            _ => Vec::new(),
        }
    }
}

impl Default for AppStateMachine {
    fn default() -> Self {
        Self::new(AppState::Disabled)
    }
}
