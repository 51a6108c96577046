//! Calibration step state machine

use detector::{CalibrationSample, MIN_CALIBRATION_SAMPLES};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Calibration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("A calibration run is already in progress")]
    AlreadyRunning,

    #[error("No connected displays to calibrate against")]
    NoDisplays,
}

/// Screen corner, in capture order (clockwise from top-left).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl Corner {
    /// Fixed visit order within one display
    pub const SEQUENCE: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomRight,
        Corner::BottomLeft,
    ];
}

/// A connected display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayInfo {
    pub id: String,
    pub name: String,
}

impl DisplayInfo {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

/// One step of the run: look at `corner` of `display`. Every other
/// display shows the neutral "look elsewhere" affordance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationStep {
    pub index: usize,
    pub display: DisplayInfo,
    pub corner: Corner,
}

/// Controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalibrationPhase {
    #[default]
    Idle,
    /// Detector needs physical coupling before sampling may begin.
    /// Step progression is suspended; cancel is still accepted.
    WaitingForConnection,
    Sampling,
    Complete,
    Cancelled,
}

/// Result of a capture trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// Moved to the next step
    Advanced,
    /// All steps visited with enough samples; reduce these via the
    /// detector's `create_calibration_data`
    Finished(Vec<CalibrationSample>),
    /// All steps visited but fewer than the minimum samples landed
    Cancelled,
    /// Trigger arrived outside the sampling phase
    Ignored,
}

/// Drives the display × corner step sequence.
///
/// Capture is triggered by a single designated input action, never at
/// sensor rate, and the whole machine lives on the owner task, so a
/// reentrancy guard on `begin` is the only concurrency protection
/// needed.
#[derive(Debug, Default)]
pub struct CalibrationController {
    steps: Vec<CalibrationStep>,
    cursor: usize,
    samples: Vec<CalibrationSample>,
    phase: CalibrationPhase,
    requires_connection: bool,
}

impl CalibrationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a run over the given displays, visited in order with the
    /// four corners clockwise from top-left inside each.
    pub fn begin(
        &mut self,
        displays: &[DisplayInfo],
        requires_connection: bool,
        connected: bool,
    ) -> Result<(), CalibrationError> {
        if self.is_running() {
            warn!("calibration begin rejected: already running");
            return Err(CalibrationError::AlreadyRunning);
        }
        if displays.is_empty() {
            return Err(CalibrationError::NoDisplays);
        }

        self.steps = displays
            .iter()
            .flat_map(|display| {
                Corner::SEQUENCE
                    .iter()
                    .map(move |&corner| (display.clone(), corner))
            })
            .enumerate()
            .map(|(index, (display, corner))| CalibrationStep {
                index,
                display,
                corner,
            })
            .collect();
        self.cursor = 0;
        self.samples.clear();
        self.requires_connection = requires_connection;
        self.phase = if requires_connection && !connected {
            info!("calibration waiting for sensor connection");
            CalibrationPhase::WaitingForConnection
        } else {
            CalibrationPhase::Sampling
        };

        info!(steps = self.steps.len(), "calibration started");
        Ok(())
    }

    /// Record one sample (when the detector could resolve one) and
    /// advance. Outside the sampling phase this is a no-op.
    pub fn capture(&mut self, sample: Option<CalibrationSample>) -> CaptureOutcome {
        if self.phase != CalibrationPhase::Sampling {
            return CaptureOutcome::Ignored;
        }

        match sample {
            Some(s) => {
                debug!(step = self.cursor, value = s.value, "calibration sample captured");
                self.samples.push(s);
            }
            None => debug!(step = self.cursor, "no sample resolvable, step skipped"),
        }

        self.cursor += 1;
        if self.cursor < self.steps.len() {
            return CaptureOutcome::Advanced;
        }

        if self.samples.len() >= MIN_CALIBRATION_SAMPLES {
            info!(samples = self.samples.len(), "calibration run complete");
            self.phase = CalibrationPhase::Complete;
            CaptureOutcome::Finished(std::mem::take(&mut self.samples))
        } else {
            // Too few samples to bound the space; prior calibration
            // stays authoritative.
            warn!(
                samples = self.samples.len(),
                "calibration discarded: fewer than {} samples", MIN_CALIBRATION_SAMPLES
            );
            self.phase = CalibrationPhase::Cancelled;
            self.samples.clear();
            CaptureOutcome::Cancelled
        }
    }

    /// Abort without producing data. Accepted in any running phase,
    /// including while waiting for connection.
    pub fn cancel(&mut self) {
        if !self.is_running() {
            return;
        }
        info!("calibration cancelled");
        self.phase = CalibrationPhase::Cancelled;
        self.samples.clear();
    }

    /// Detector coupling changed. Suspends sampling when lost, resumes
    /// at the current step (no restart) when it returns.
    pub fn connection_changed(&mut self, connected: bool) {
        if !self.requires_connection {
            return;
        }
        match (self.phase, connected) {
            (CalibrationPhase::Sampling, false) => {
                info!("sensor removed mid-calibration, suspending");
                self.phase = CalibrationPhase::WaitingForConnection;
            }
            (CalibrationPhase::WaitingForConnection, true) => {
                info!(step = self.cursor, "sensor back, resuming calibration");
                self.phase = CalibrationPhase::Sampling;
            }
            _ => {}
        }
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        matches!(
            self.phase,
            CalibrationPhase::Sampling | CalibrationPhase::WaitingForConnection
        )
    }

    /// Step currently awaiting capture
    pub fn current_step(&self) -> Option<&CalibrationStep> {
        if self.is_running() {
            self.steps.get(self.cursor)
        } else {
            None
        }
    }

    /// Displays that should show the "look elsewhere" affordance
    pub fn idle_displays(&self) -> Vec<&DisplayInfo> {
        let Some(step) = self.current_step() else {
            return Vec::new();
        };
        let mut idle: Vec<&DisplayInfo> = Vec::new();
        for s in &self.steps {
            if s.display != step.display && !idle.contains(&&s.display) {
                idle.push(&s.display);
            }
        }
        idle
    }
}
