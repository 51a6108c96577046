//! Warning intensity compositor
//!
//! Reconciles two independent concerns into per-tick animated output:
//! privacy blur while the user is away, and the posture warning. The
//! blur channel eases in slowly and out fast; the overlay channel ramps
//! gently but drops near-instantly so recovery feels immediate.

mod channel;

pub use channel::{BlurChannel, OverlayChannel, BLUR_MAX_LEVEL};

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Compositor tick period
pub const TICK: Duration = Duration::from_millis(33);

/// Visual style used to render warning intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WarningMode {
    /// Posture and privacy share the blur channel
    #[default]
    Blur,
    /// Posture drives a vignette overlay; privacy keeps the blur
    Vignette,
    /// Posture drives a border overlay
    Border,
    /// Posture drives a solid overlay
    Solid,
    /// Only privacy blur is visualized
    None,
}

impl WarningMode {
    /// Posture intensity is drawn through the separate overlay channel
    pub fn uses_overlay(&self) -> bool {
        matches!(
            self,
            WarningMode::Vignette | WarningMode::Border | WarningMode::Solid
        )
    }
}

/// One tick's output for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositorFrame {
    /// Blur level in [0, [`BLUR_MAX_LEVEL`]]
    pub blur_level: u32,
    /// Overlay intensity in [0, 1]
    pub overlay_intensity: f32,
}

/// Merges away and posture intensity into animated channel values.
#[derive(Debug, Default)]
pub struct WarningCompositor {
    mode: WarningMode,
    blur: BlurChannel,
    overlay: OverlayChannel,
}

impl WarningCompositor {
    pub fn new(mode: WarningMode) -> Self {
        Self {
            mode,
            blur: BlurChannel::default(),
            overlay: OverlayChannel::default(),
        }
    }

    pub fn mode(&self) -> WarningMode {
        self.mode
    }

    /// Switch presentation mode. The overlay channel is zeroed and
    /// rebuilt so no stale intensity leaks into the new mode.
    pub fn set_mode(&mut self, mode: WarningMode) {
        if mode == self.mode {
            return;
        }
        debug!(?mode, "warning mode switched");
        self.mode = mode;
        self.overlay = OverlayChannel::default();
    }

    /// Update channel targets from the two concerns.
    pub fn update_targets(&mut self, away: bool, posture_intensity: f32) {
        let away_intensity: f32 = if away { 1.0 } else { 0.0 };
        match self.mode {
            WarningMode::Blur => {
                self.blur
                    .set_target(away_intensity.max(posture_intensity));
                self.overlay.set_target(0.0);
            }
            WarningMode::None => {
                self.blur.set_target(away_intensity);
                self.overlay.set_target(0.0);
            }
            WarningMode::Vignette | WarningMode::Border | WarningMode::Solid => {
                self.blur.set_target(away_intensity);
                self.overlay.set_target(posture_intensity);
            }
        }
    }

    /// Drop both targets to zero (state machine deactivation).
    pub fn clear(&mut self) {
        self.blur.set_target(0.0);
        self.overlay.set_target(0.0);
    }

    /// Advance both channels one step toward their targets.
    ///
    /// Returns `None` when both are already at target, so an idle
    /// compositor costs nothing per tick.
    pub fn tick(&mut self) -> Option<CompositorFrame> {
        if self.blur.at_target() && self.overlay.at_target() {
            return None;
        }
        self.blur.step();
        self.overlay.step();
        Some(self.frame())
    }

    /// Current channel values without stepping
    pub fn frame(&self) -> CompositorFrame {
        CompositorFrame {
            blur_level: self.blur.level(),
            overlay_intensity: self.overlay.value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticks(compositor: &mut WarningCompositor, n: usize) -> Vec<CompositorFrame> {
        (0..n).filter_map(|_| compositor.tick()).collect()
    }

    #[test]
    fn test_blur_mode_shares_channel() {
        let mut c = WarningCompositor::new(WarningMode::Blur);
        c.update_targets(false, 0.5);
        ticks(&mut c, 200);
        assert_eq!(c.frame().blur_level, 32);
        assert_eq!(c.frame().overlay_intensity, 0.0);

        // Away wins when higher
        c.update_targets(true, 0.5);
        ticks(&mut c, 200);
        assert_eq!(c.frame().blur_level, BLUR_MAX_LEVEL);
    }

    #[test]
    fn test_blur_mode_takes_higher_of_away_and_posture() {
        let mut c = WarningCompositor::new(WarningMode::Blur);
        c.update_targets(true, 0.25);
        ticks(&mut c, 200);
        assert_eq!(c.frame().blur_level, BLUR_MAX_LEVEL);

        c.update_targets(false, 0.25);
        ticks(&mut c, 200);
        assert_eq!(c.frame().blur_level, 16);
    }

    #[test]
    fn test_none_mode_visualizes_only_away() {
        let mut c = WarningCompositor::new(WarningMode::None);
        c.update_targets(false, 1.0);
        assert!(c.tick().is_none());
        assert_eq!(c.frame().blur_level, 0);

        c.update_targets(true, 0.0);
        ticks(&mut c, 200);
        assert_eq!(c.frame().blur_level, BLUR_MAX_LEVEL);
    }

    #[test]
    fn test_overlay_modes_split_channels() {
        let mut c = WarningCompositor::new(WarningMode::Vignette);
        c.update_targets(true, 0.8);
        ticks(&mut c, 400);

        let frame = c.frame();
        assert_eq!(frame.blur_level, BLUR_MAX_LEVEL);
        assert!((frame.overlay_intensity - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_slow_ease_in_fast_ease_out() {
        let mut c = WarningCompositor::new(WarningMode::Blur);
        c.update_targets(false, 1.0);

        // +1 per tick rising
        let rising = ticks(&mut c, 3);
        assert_eq!(
            rising.iter().map(|f| f.blur_level).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        ticks(&mut c, 200);

        // -3 per tick falling, never overshooting
        c.update_targets(false, 0.0);
        let falling = ticks(&mut c, 2);
        assert_eq!(
            falling.iter().map(|f| f.blur_level).collect::<Vec<_>>(),
            vec![61, 58]
        );

        let mut previous = 58;
        while let Some(frame) = c.tick() {
            assert!(previous - frame.blur_level <= 3);
            assert!(frame.blur_level < previous);
            previous = frame.blur_level;
        }
        assert_eq!(c.frame().blur_level, 0);
    }

    #[test]
    fn test_idle_tick_is_noop() {
        let mut c = WarningCompositor::new(WarningMode::Blur);
        assert!(c.tick().is_none());

        c.update_targets(false, 0.1);
        while c.tick().is_some() {}
        assert!(c.tick().is_none());
    }

    #[test]
    fn test_overlay_recovery_is_immediate() {
        let mut c = WarningCompositor::new(WarningMode::Border);
        c.update_targets(false, 1.0);
        ticks(&mut c, 400);
        assert!((c.frame().overlay_intensity - 1.0).abs() < 1e-6);

        // Posture recovered: 0.5 per tick down, two ticks to zero
        c.update_targets(false, 0.0);
        let down = ticks(&mut c, 4);
        assert!((down[0].overlay_intensity - 0.5).abs() < 1e-6);
        assert_eq!(down[1].overlay_intensity, 0.0);
        assert_eq!(down.len(), 2);
    }

    #[test]
    fn test_mode_switch_rebuilds_overlay() {
        let mut c = WarningCompositor::new(WarningMode::Solid);
        c.update_targets(false, 1.0);
        ticks(&mut c, 100);
        assert!(c.frame().overlay_intensity > 0.0);

        c.set_mode(WarningMode::Vignette);
        assert_eq!(c.frame().overlay_intensity, 0.0);

        // Same-mode assignment leaves channels alone
        c.update_targets(false, 1.0);
        ticks(&mut c, 10);
        let before = c.frame();
        c.set_mode(WarningMode::Vignette);
        assert_eq!(c.frame(), before);
    }

    #[test]
    fn test_clear_drops_both_targets() {
        let mut c = WarningCompositor::new(WarningMode::Vignette);
        c.update_targets(true, 1.0);
        ticks(&mut c, 400);

        c.clear();
        while c.tick().is_some() {}
        assert_eq!(c.frame().blur_level, 0);
        assert_eq!(c.frame().overlay_intensity, 0.0);
    }
}
