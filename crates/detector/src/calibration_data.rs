//! Calibrated threshold data
//!
//! Produced once per completed calibration run by the active detector,
//! replaced wholesale on recalibration, and persisted externally keyed
//! by a display-configuration fingerprint.

use crate::reading::CalibrationSample;
use serde::{Deserialize, Serialize};

/// Minimum samples needed to bound the cornered sampling space
pub const MIN_CALIBRATION_SAMPLES: usize = 4;

/// Smallest positional range considered usable
pub const MIN_RANGE: f32 = 1e-3;

/// Modality-specific calibration values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CalibrationData {
    Camera(CameraCalibration),
    Motion(MotionCalibration),
}

impl CalibrationData {
    /// Usable for monitoring. Camera data needs a real positional range
    /// and a non-empty source; motion data is valid once captured.
    pub fn is_valid(&self) -> bool {
        match self {
            CalibrationData::Camera(c) => c.range > MIN_RANGE && !c.source_id.is_empty(),
            CalibrationData::Motion(_) => true,
        }
    }

    /// Position below which posture counts as bad
    pub fn bad_threshold(&self) -> f32 {
        match self {
            CalibrationData::Camera(c) => c.bad_position,
            CalibrationData::Motion(m) => m.bad_pitch,
        }
    }

    /// Calibrated positional span
    pub fn range(&self) -> f32 {
        match self {
            CalibrationData::Camera(c) => c.range,
            CalibrationData::Motion(m) => m.range,
        }
    }

    /// Neutral head width captured at calibration time, if any
    pub fn reference_width(&self) -> Option<f32> {
        match self {
            CalibrationData::Camera(c) => c.reference_width,
            CalibrationData::Motion(_) => None,
        }
    }

    /// Identifier of the source this data was calibrated against
    pub fn source_id(&self) -> &str {
        match self {
            CalibrationData::Camera(c) => &c.source_id,
            CalibrationData::Motion(m) => &m.source_id,
        }
    }
}

/// Camera-modality calibration: normalized vertical positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraCalibration {
    /// Worst sampled position (screen corners pull the head down)
    pub bad_position: f32,
    /// Best sampled position
    pub good_position: f32,
    /// Mean of all samples
    pub neutral: f32,
    /// good - bad span
    pub range: f32,
    /// Camera identifier the run was performed against
    pub source_id: String,
    /// Mean head width across samples, for the lean-closer signal
    pub reference_width: Option<f32>,
}

impl CameraCalibration {
    /// Reduce captured samples. `None` for fewer than
    /// [`MIN_CALIBRATION_SAMPLES`] samples.
    pub fn from_samples(samples: &[CalibrationSample], source_id: &str) -> Option<Self> {
        let (min, max, mean) = reduce(samples)?;

        let widths: Vec<f32> = samples.iter().filter_map(|s| s.reference_width).collect();
        let reference_width = if widths.is_empty() {
            None
        } else {
            Some(widths.iter().sum::<f32>() / widths.len() as f32)
        };

        Some(Self {
            bad_position: min,
            good_position: max,
            neutral: mean,
            range: max - min,
            source_id: source_id.to_string(),
            reference_width,
        })
    }
}

/// Head-motion calibration: pitch in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionCalibration {
    /// Lowest sampled pitch (looking furthest down)
    pub bad_pitch: f32,
    /// Highest sampled pitch
    pub good_pitch: f32,
    /// Mean pitch across samples
    pub neutral_pitch: f32,
    /// good - bad span
    pub range: f32,
    /// Sensor identifier
    pub source_id: String,
}

impl MotionCalibration {
    pub fn from_samples(samples: &[CalibrationSample], source_id: &str) -> Option<Self> {
        let (min, max, mean) = reduce(samples)?;
        Some(Self {
            bad_pitch: min,
            good_pitch: max,
            neutral_pitch: mean,
            range: max - min,
            source_id: source_id.to_string(),
        })
    }
}

/// min/max/mean over the sample scalars, rejecting short runs
fn reduce(samples: &[CalibrationSample]) -> Option<(f32, f32, f32)> {
    if samples.len() < MIN_CALIBRATION_SAMPLES {
        return None;
    }

    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    let mut sum = 0.0f32;
    for s in samples {
        min = min.min(s.value);
        max = max.max(s.value);
        sum += s.value;
    }

    Some((min, max, sum / samples.len() as f32))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(values: &[f32]) -> Vec<CalibrationSample> {
        values.iter().map(|&v| CalibrationSample::new(v)).collect()
    }

    #[test]
    fn test_reduction_reference_vector() {
        let data =
            CameraCalibration::from_samples(&samples(&[0.4, 0.6, 0.5, 0.5]), "cam-0").unwrap();

        assert_eq!(data.bad_position, 0.4);
        assert_eq!(data.good_position, 0.6);
        assert_eq!(data.neutral, 0.5);
        assert!((data.range - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_three_samples_rejected() {
        assert!(CameraCalibration::from_samples(&samples(&[0.4, 0.6, 0.5]), "cam-0").is_none());
        assert!(MotionCalibration::from_samples(&samples(&[-10.0, 5.0, 0.0]), "airpods").is_none());
    }

    #[test]
    fn test_validity_requires_range_and_source() {
        let flat =
            CameraCalibration::from_samples(&samples(&[0.5, 0.5, 0.5, 0.5]), "cam-0").unwrap();
        assert!(!CalibrationData::Camera(flat).is_valid());

        let unsourced = CameraCalibration::from_samples(&samples(&[0.4, 0.6, 0.5, 0.5]), "");
        assert!(!CalibrationData::Camera(unsourced.unwrap()).is_valid());

        let good =
            CameraCalibration::from_samples(&samples(&[0.4, 0.6, 0.5, 0.5]), "cam-0").unwrap();
        assert!(CalibrationData::Camera(good).is_valid());
    }

    #[test]
    fn test_motion_trivially_valid() {
        // Motion data is valid once captured, even with a flat range
        let m = MotionCalibration::from_samples(&samples(&[0.0, 0.0, 0.0, 0.0]), "airpods");
        assert!(CalibrationData::Motion(m.unwrap()).is_valid());
    }

    #[test]
    fn test_reference_width_mean() {
        let with_widths = vec![
            CalibrationSample::with_width(0.4, 0.30),
            CalibrationSample::with_width(0.6, 0.34),
            CalibrationSample::new(0.5),
            CalibrationSample::new(0.5),
        ];
        let data = CameraCalibration::from_samples(&with_widths, "cam-0").unwrap();
        assert!((data.reference_width.unwrap() - 0.32).abs() < 1e-6);
    }

    #[test]
    fn test_serde_round_trip() {
        let data = CalibrationData::Camera(
            CameraCalibration::from_samples(
                &samples(&[0.4, 0.6, 0.5, 0.5]),
                "FaceTime HD Camera",
            )
            .unwrap(),
        );

        let json = serde_json::to_string(&data).unwrap();
        let back: CalibrationData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, data);
    }
}
