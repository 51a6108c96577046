//! Posture reducers

use crate::config::PostureConfig;
use crate::state::{MonitoringState, SMOOTHING_WINDOW};
use detector::{CalibrationData, PostureReading, SensorReading};
use std::time::Duration;
use tracing::trace;

/// Consecutive identical classifications required to flip the
/// slouching flag
pub const DEBOUNCE_FRAMES: u32 = 8;

/// Exit bar as a fraction of the enter bar (hysteresis)
pub const HYSTERESIS_EXIT_FACTOR: f32 = 0.7;

/// Consecutive missed detections before the user counts as away
pub const AWAY_THRESHOLD_FRAMES: u32 = 15;

/// Analytics intervals are clamped here to absorb sleep/stall gaps
pub const MAX_ANALYTICS_GAP: Duration = Duration::from_secs(2);

/// Minimum visible severity when the lean-closer signal fires alone
pub const LEAN_SEVERITY_FLOOR: f32 = 0.5;

/// Lower bound on the lean-closer ratio margin
pub const LEAN_RATIO_MARGIN: f32 = 0.05;

const EPSILON: f32 = 1e-4;

/// Side effects requested by the reducers, executed by the owner task.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Accumulate wall-clock time tagged with the slouching flag that
    /// held *before* this reading
    TrackTime { slouching: bool, seconds: f32 },
    /// One-shot event on the good-to-bad transition edge
    SlouchEvent,
    /// Status text/icon needs refreshing
    RefreshStatus,
    /// Warning intensity changed; compositor target update
    RefreshBlur { intensity: f32 },
    /// Per-frame classified reading for external consumers
    EmitReading(PostureReading),
}

/// Severity past the dead zone, normalized over the remaining range
pub fn severity(slouch_amount: f32, dead_zone: f32, range: f32) -> f32 {
    ((slouch_amount - dead_zone) / (range - dead_zone).max(EPSILON)).clamp(0.0, 1.0)
}

/// Map severity through the configured curve
pub fn intensity_curve(severity: f32, exponent: f32) -> f32 {
    severity.powf(1.0 / exponent.max(EPSILON)).clamp(0.0, 1.0)
}

/// Evaluate one positioned reading.
///
/// Pure: returns the successor state and the effects the owner should
/// run. The reading must carry a position; absence is handled by
/// [`process_absence`].
pub fn process(
    state: &MonitoringState,
    reading: SensorReading,
    calibration: &CalibrationData,
    config: &PostureConfig,
    now: Duration,
) -> (MonitoringState, Vec<Effect>) {
    let mut next = state.clone();
    let mut effects = Vec::new();

    // Analytics interval, only once a true previous reference exists
    if let Some(prev) = state.last_reading_at {
        let elapsed = now.saturating_sub(prev).min(MAX_ANALYTICS_GAP);
        if !elapsed.is_zero() {
            effects.push(Effect::TrackTime {
                slouching: state.is_currently_slouching,
                seconds: elapsed.as_secs_f32(),
            });
        }
    }
    next.last_reading_at = Some(now);

    let Some(position) = reading.position else {
        return (next, effects);
    };

    // Smoothing over a fixed FIFO window
    next.recent_positions.push_back(position);
    while next.recent_positions.len() > SMOOTHING_WINDOW {
        next.recent_positions.pop_front();
    }
    let smoothed =
        next.recent_positions.iter().sum::<f32>() / next.recent_positions.len() as f32;

    let range = calibration.range();
    let slouch_amount = calibration.bad_threshold() - smoothed;
    let dead_zone = config.dead_zone_fraction * range;

    // Hysteresis: lower bar to stay slouching than to become slouching
    let bar = if state.is_currently_slouching {
        HYSTERESIS_EXIT_FACTOR * dead_zone
    } else {
        dead_zone
    };
    let mut is_bad = slouch_amount > bar;

    // Secondary signal: leaning too close to the screen
    let lean_closer = match (reading.head_width, calibration.reference_width()) {
        (Some(width), Some(reference)) if reference > 0.0 => {
            width / reference > 1.0 + config.dead_zone_fraction.max(LEAN_RATIO_MARGIN)
        }
        _ => false,
    };
    if lean_closer {
        is_bad = true;
    }

    // Onset reference: first frame of the current bad run
    if is_bad {
        next.bad_posture_start.get_or_insert(now);
    } else {
        next.bad_posture_start = None;
    }

    // Frame debounce, opposing counter reset every frame
    if is_bad {
        next.consecutive_bad_frames += 1;
        next.consecutive_good_frames = 0;
    } else {
        next.consecutive_good_frames += 1;
        next.consecutive_bad_frames = 0;
    }
    if is_bad && !state.is_currently_slouching && next.consecutive_bad_frames >= DEBOUNCE_FRAMES {
        next.is_currently_slouching = true;
        effects.push(Effect::SlouchEvent);
    } else if !is_bad
        && state.is_currently_slouching
        && next.consecutive_good_frames >= DEBOUNCE_FRAMES
    {
        next.is_currently_slouching = false;
    }

    let mut frame_severity = severity(slouch_amount, dead_zone, range);
    if lean_closer && frame_severity < LEAN_SEVERITY_FLOOR {
        // Guarantees the warning is perceptible when triggered purely
        // by the secondary signal
        frame_severity = LEAN_SEVERITY_FLOOR;
    }

    let onset_elapsed = next
        .bad_posture_start
        .map(|start| now.saturating_sub(start) >= config.warning_onset_delay)
        .unwrap_or(false);
    let visible = next.is_currently_slouching && onset_elapsed;
    let intensity = if visible {
        intensity_curve(frame_severity, config.intensity_exponent)
    } else {
        0.0
    };
    next.posture_warning_intensity = intensity;

    trace!(
        smoothed,
        slouch_amount,
        is_bad,
        intensity,
        "reading evaluated"
    );

    if intensity != state.posture_warning_intensity {
        effects.push(Effect::RefreshBlur { intensity });
    }
    if next.is_currently_slouching != state.is_currently_slouching {
        effects.push(Effect::RefreshStatus);
    }
    effects.push(Effect::EmitReading(PostureReading {
        timestamp: now,
        is_bad_posture: next.is_currently_slouching,
        severity: frame_severity,
    }));

    (next, effects)
}

/// Track user absence from the detection outcome of each frame.
///
/// Raises `is_currently_away` after [`AWAY_THRESHOLD_FRAMES`]
/// consecutive misses (when the away feature is enabled) and clears it
/// immediately on the next successful detection.
pub fn process_absence(
    state: &MonitoringState,
    detected: bool,
    away_enabled: bool,
) -> (MonitoringState, Vec<Effect>) {
    let mut next = state.clone();
    let mut effects = Vec::new();

    if detected {
        next.consecutive_missed_frames = 0;
        if state.is_currently_away {
            next.is_currently_away = false;
            effects.push(Effect::RefreshStatus);
        }
    } else {
        next.consecutive_missed_frames = state.consecutive_missed_frames + 1;
        if away_enabled
            && !state.is_currently_away
            && next.consecutive_missed_frames >= AWAY_THRESHOLD_FRAMES
        {
            next.is_currently_away = true;
            effects.push(Effect::RefreshStatus);
        }
    }

    (next, effects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use detector::{CalibrationSample, CameraCalibration};
    use proptest::prelude::*;

    const FRAME: Duration = Duration::from_millis(100);

    fn calibration() -> CalibrationData {
        let samples: Vec<CalibrationSample> = [0.4, 0.6, 0.5, 0.5]
            .iter()
            .map(|&v| CalibrationSample::new(v))
            .collect();
        CalibrationData::Camera(CameraCalibration::from_samples(&samples, "cam-0").unwrap())
    }

    fn calibration_with_width(width: f32) -> CalibrationData {
        match calibration() {
            CalibrationData::Camera(mut c) => {
                c.reference_width = Some(width);
                CalibrationData::Camera(c)
            }
            other => other,
        }
    }

    /// Drive `frames` identical readings, returning the final state and
    /// every effect in order.
    fn drive(
        mut state: MonitoringState,
        reading: SensorReading,
        calibration: &CalibrationData,
        config: &PostureConfig,
        frames: u32,
        mut now: Duration,
    ) -> (MonitoringState, Vec<Effect>, Duration) {
        let mut all = Vec::new();
        for _ in 0..frames {
            let (next, effects) = process(&state, reading, calibration, config, now);
            state = next;
            all.extend(effects);
            now += FRAME;
        }
        (state, all, now)
    }

    #[test]
    fn test_flip_to_slouching_needs_eight_bad_frames() {
        let cal = calibration();
        let config = PostureConfig::default();
        let mut state = MonitoringState::new();
        let mut now = Duration::ZERO;

        for frame in 1..=7 {
            let (next, effects) = process(&state, SensorReading::at(0.1), &cal, &config, now);
            state = next;
            assert!(!state.is_currently_slouching, "flipped early at frame {frame}");
            assert!(!effects.contains(&Effect::SlouchEvent));
            now += FRAME;
        }

        let (state, effects) = process(&state, SensorReading::at(0.1), &cal, &config, now);
        assert!(state.is_currently_slouching);
        assert_eq!(
            effects.iter().filter(|e| **e == Effect::SlouchEvent).count(),
            1
        );
    }

    #[test]
    fn test_slouch_event_fires_once_per_run() {
        let cal = calibration();
        let config = PostureConfig::default();
        let (_, effects, _) = drive(
            MonitoringState::new(),
            SensorReading::at(0.1),
            &cal,
            &config,
            40,
            Duration::ZERO,
        );
        assert_eq!(
            effects.iter().filter(|e| **e == Effect::SlouchEvent).count(),
            1
        );
    }

    #[test]
    fn test_flip_back_needs_eight_good_classifications() {
        let cal = calibration();
        let config = PostureConfig::default();

        let (slouching, _, now) = drive(
            MonitoringState::new(),
            SensorReading::at(0.1),
            &cal,
            &config,
            12,
            Duration::ZERO,
        );
        assert!(slouching.is_currently_slouching);

        // Upright frames: the smoothing window still classifies the
        // first two as bad, then eight good classifications flip back.
        let mut state = slouching;
        let mut t = now;
        let mut flipped_at = None;
        for frame in 1..=16 {
            let (next, _) = process(&state, SensorReading::at(0.6), &cal, &config, t);
            if state.is_currently_slouching && !next.is_currently_slouching {
                flipped_at = Some(frame);
            }
            state = next;
            t += FRAME;
        }

        let flipped_at = flipped_at.expect("never flipped back");
        assert!(flipped_at >= 8, "flipped after only {flipped_at} frames");
        assert!(!state.is_currently_slouching);
        assert!(state.consecutive_good_frames >= DEBOUNCE_FRAMES);
    }

    #[test]
    fn test_hysteresis_exit_below_enter() {
        for dead_zone_fraction in [0.05f32, 0.15, 0.3] {
            let dz = dead_zone_fraction * 0.2;
            assert!(HYSTERESIS_EXIT_FACTOR * dz < dz);
        }
    }

    #[test]
    fn test_hysteresis_holds_in_the_band() {
        let cal = calibration();
        let config = PostureConfig::default();

        // dead zone = 0.15 * 0.2 = 0.03; enter bar 0.03, exit bar 0.021.
        // slouch_amount at position 0.375 is 0.025: inside the band.
        let in_band = SensorReading::at(0.375);

        // Not slouching: 0.025 < 0.03 stays good
        let (state, _, _) = drive(
            MonitoringState::new(),
            in_band,
            &cal,
            &config,
            20,
            Duration::ZERO,
        );
        assert!(!state.is_currently_slouching);

        // Already slouching: 0.025 > 0.021 stays bad
        let (slouching, _, now) = drive(
            MonitoringState::new(),
            SensorReading::at(0.1),
            &cal,
            &config,
            12,
            Duration::ZERO,
        );
        let mut state = slouching;
        let mut t = now;
        // Flush the smoothing window to the in-band position first
        for _ in 0..30 {
            let (next, _) = process(&state, in_band, &cal, &config, t);
            state = next;
            t += FRAME;
        }
        assert!(state.is_currently_slouching);
    }

    #[test]
    fn test_no_warning_before_onset_delay() {
        let cal = calibration();
        let config = PostureConfig {
            warning_onset_delay: Duration::from_secs(5),
            ..Default::default()
        };

        let mut state = MonitoringState::new();
        let mut now = Duration::ZERO;
        for frame in 0..50 {
            let (next, _) = process(&state, SensorReading::at(0.1), &cal, &config, now);
            state = next;
            assert_eq!(
                state.posture_warning_intensity, 0.0,
                "warning visible at frame {frame}, {now:?} into the run"
            );
            now += FRAME;
        }

        // Frame at exactly 5s since the run began
        let (state, effects) = process(&state, SensorReading::at(0.1), &cal, &config, now);
        assert!(state.posture_warning_intensity > 0.0);
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::RefreshBlur { intensity } if *intensity > 0.0)));
    }

    #[test]
    fn test_onset_reference_cleared_on_good_frame() {
        let cal = calibration();
        let config = PostureConfig::default();

        let (state, _, now) = drive(
            MonitoringState::new(),
            SensorReading::at(0.1),
            &cal,
            &config,
            3,
            Duration::ZERO,
        );
        assert!(state.bad_posture_start.is_some());

        let (state, _) = process(&state, SensorReading::at(0.9), &cal, &config, now);
        assert!(state.bad_posture_start.is_none());
    }

    #[test]
    fn test_analytics_skips_first_reading_and_clamps_gaps() {
        let cal = calibration();
        let config = PostureConfig::default();
        let state = MonitoringState::new();

        let (state, effects) =
            process(&state, SensorReading::at(0.5), &cal, &config, Duration::ZERO);
        assert!(!effects
            .iter()
            .any(|e| matches!(e, Effect::TrackTime { .. })));

        // A 10s stall gap is clamped to 2s
        let (_, effects) = process(
            &state,
            SensorReading::at(0.5),
            &cal,
            &config,
            Duration::from_secs(10),
        );
        match effects
            .iter()
            .find(|e| matches!(e, Effect::TrackTime { .. }))
            .unwrap()
        {
            Effect::TrackTime { slouching, seconds } => {
                assert!(!slouching);
                assert!((seconds - 2.0).abs() < 1e-6);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_analytics_tagged_with_previous_flag() {
        let cal = calibration();
        let config = PostureConfig {
            warning_onset_delay: Duration::ZERO,
            ..Default::default()
        };

        let (state, _, now) = drive(
            MonitoringState::new(),
            SensorReading::at(0.1),
            &cal,
            &config,
            8,
            Duration::ZERO,
        );
        assert!(state.is_currently_slouching);

        let (_, effects) = process(&state, SensorReading::at(0.1), &cal, &config, now);
        match effects.first().unwrap() {
            Effect::TrackTime { slouching, .. } => assert!(*slouching),
            other => panic!("expected TrackTime first, got {other:?}"),
        }
    }

    #[test]
    fn test_lean_closer_forces_bad_and_floors_severity() {
        let cal = calibration_with_width(0.3);
        let config = PostureConfig::default();

        // Upright position, but head 40% wider than the calibrated
        // reference: the secondary signal alone must classify bad and
        // keep the severity perceptible.
        let reading = SensorReading {
            position: Some(0.6),
            head_width: Some(0.42),
        };

        let (state, effects) =
            process(&MonitoringState::new(), reading, &cal, &config, Duration::ZERO);
        assert_eq!(state.consecutive_bad_frames, 1);
        assert!(state.bad_posture_start.is_some());

        match effects
            .iter()
            .find(|e| matches!(e, Effect::EmitReading(_)))
            .unwrap()
        {
            Effect::EmitReading(reading) => {
                assert!((reading.severity - LEAN_SEVERITY_FLOOR).abs() < 1e-6)
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_lean_ratio_margin_uses_dead_zone_when_larger() {
        let cal = calibration_with_width(0.3);
        let config = PostureConfig {
            dead_zone_fraction: 0.3,
            ..Default::default()
        };

        // 20% wider: over the 5% floor margin but under the 30% dead
        // zone margin, so no lean trigger.
        let reading = SensorReading {
            position: Some(0.6),
            head_width: Some(0.36),
        };
        let (state, _) = process(&MonitoringState::new(), reading, &cal, &config, Duration::ZERO);
        assert_eq!(state.consecutive_bad_frames, 0);
    }

    #[test]
    fn test_away_after_fifteen_misses_and_instant_return() {
        let mut state = MonitoringState::new();
        for i in 1..=14 {
            let (next, _) = process_absence(&state, false, true);
            state = next;
            assert!(!state.is_currently_away, "away raised early at miss {i}");
        }

        let (mut state, effects) = process_absence(&state, false, true);
        assert!(state.is_currently_away);
        assert_eq!(effects, vec![Effect::RefreshStatus]);

        // One successful detection clears immediately
        let (next, effects) = process_absence(&state, true, true);
        state = next;
        assert!(!state.is_currently_away);
        assert_eq!(state.consecutive_missed_frames, 0);
        assert_eq!(effects, vec![Effect::RefreshStatus]);
    }

    #[test]
    fn test_away_disabled_never_raises() {
        let mut state = MonitoringState::new();
        for _ in 0..40 {
            let (next, _) = process_absence(&state, false, false);
            state = next;
        }
        assert!(!state.is_currently_away);
        assert_eq!(state.consecutive_missed_frames, 40);
    }

    #[test]
    fn test_missed_reading_keeps_classification_state() {
        let cal = calibration();
        let config = PostureConfig::default();

        let (state, _, now) = drive(
            MonitoringState::new(),
            SensorReading::at(0.1),
            &cal,
            &config,
            5,
            Duration::ZERO,
        );
        let before = state.consecutive_bad_frames;

        let (state, _) = process(&state, SensorReading::missed(), &cal, &config, now);
        assert_eq!(state.consecutive_bad_frames, before);
        assert_eq!(state.last_reading_at, Some(now));
    }

    proptest! {
        #[test]
        fn prop_intensity_stays_in_unit_interval(
            slouch_amount in -2.0f32..2.0,
            dead_zone_fraction in 0.0f32..0.5,
            range in 0.01f32..1.0,
            exponent in 0.1f32..5.0,
        ) {
            let dz = dead_zone_fraction * range;
            let s = severity(slouch_amount, dz, range);
            let i = intensity_curve(s, exponent);
            prop_assert!((0.0..=1.0).contains(&s));
            prop_assert!((0.0..=1.0).contains(&i));
        }

        #[test]
        fn prop_intensity_monotone_in_slouch_amount(
            a in -2.0f32..2.0,
            delta in 0.0f32..2.0,
            dead_zone_fraction in 0.0f32..0.5,
            range in 0.01f32..1.0,
            exponent in 0.1f32..5.0,
        ) {
            let dz = dead_zone_fraction * range;
            let lo = intensity_curve(severity(a, dz, range), exponent);
            let hi = intensity_curve(severity(a + delta, dz, range), exponent);
            prop_assert!(hi >= lo);
        }

        #[test]
        fn prop_exit_strictly_below_enter(
            dead_zone_fraction in 0.001f32..0.5,
            range in 0.01f32..1.0,
        ) {
            let dz = dead_zone_fraction * range;
            prop_assert!(HYSTERESIS_EXIT_FACTOR * dz < dz);
        }
    }
}
