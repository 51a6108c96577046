//! Animated output channels

/// Maximum blur level the presentation layer understands
pub const BLUR_MAX_LEVEL: u32 = 64;

/// Per-tick blur steps: slow ease-in, fast ease-out
const BLUR_STEP_UP: u32 = 1;
const BLUR_STEP_DOWN: u32 = 3;

/// Per-tick overlay steps: gentle ramp, near-instant drop
const OVERLAY_STEP_UP: f32 = 0.05;
const OVERLAY_STEP_DOWN: f32 = 0.5;

/// Integer blur channel in [0, [`BLUR_MAX_LEVEL`]].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BlurChannel {
    level: u32,
    target: u32,
}

impl BlurChannel {
    /// Retarget from an intensity in [0, 1]
    pub fn set_target(&mut self, intensity: f32) {
        self.target = (intensity.clamp(0.0, 1.0) * BLUR_MAX_LEVEL as f32).round() as u32;
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn at_target(&self) -> bool {
        self.level == self.target
    }

    /// One animation step toward the target, never overshooting
    pub fn step(&mut self) {
        if self.level < self.target {
            self.level = (self.level + BLUR_STEP_UP).min(self.target);
        } else if self.level > self.target {
            self.level = self.level.saturating_sub(BLUR_STEP_DOWN).max(self.target);
        }
    }
}

/// Float overlay channel in [0, 1].
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct OverlayChannel {
    value: f32,
    target: f32,
}

impl OverlayChannel {
    pub fn set_target(&mut self, intensity: f32) {
        self.target = intensity.clamp(0.0, 1.0);
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn at_target(&self) -> bool {
        self.value == self.target
    }

    /// One animation step; drops land exactly on the target so posture
    /// recovery reads as immediate
    pub fn step(&mut self) {
        if self.value < self.target {
            self.value = (self.value + OVERLAY_STEP_UP).min(self.target);
        } else if self.value > self.target {
            self.value = (self.value - OVERLAY_STEP_DOWN).max(self.target);
        }
    }
}
