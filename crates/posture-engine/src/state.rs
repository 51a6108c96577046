//! Monitoring state (tracked over time)

use std::collections::VecDeque;
use std::time::Duration;

/// Sliding window size for position smoothing
pub const SMOOTHING_WINDOW: usize = 5;

/// State mutated exclusively by the engine's reducers.
///
/// Created at monitoring start, reset on each calibration completion
/// and on each `begin_monitoring`, discarded on stop.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonitoringState {
    /// Debounced slouching flag
    pub is_currently_slouching: bool,

    /// User absent (no detection for a sustained run)
    pub is_currently_away: bool,

    /// Visible warning intensity in [0, 1]
    pub posture_warning_intensity: f32,

    /// Start of the current bad-posture run, cleared on any good frame
    pub bad_posture_start: Option<Duration>,

    /// Consecutive frames classified bad
    pub consecutive_bad_frames: u32,

    /// Consecutive frames classified good
    pub consecutive_good_frames: u32,

    /// Consecutive frames with no confident detection
    pub consecutive_missed_frames: u32,

    /// Recent raw positions, oldest first (bounded by
    /// [`SMOOTHING_WINDOW`])
    pub recent_positions: VecDeque<f32>,

    /// Timestamp of the previous processed reading; `None` until the
    /// first reading after (re)start, so no analytics interval is
    /// accumulated without a true reference
    pub last_reading_at: Option<Duration>,
}

impl MonitoringState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Smoothed position over the recent window
    pub fn smoothed_position(&self) -> Option<f32> {
        if self.recent_positions.is_empty() {
            return None;
        }
        Some(self.recent_positions.iter().sum::<f32>() / self.recent_positions.len() as f32)
    }

    /// Reset for a fresh session
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
