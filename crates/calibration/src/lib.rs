//! Calibration protocol
//!
//! Drives a fixed sequence of sampling steps (every connected display ×
//! four corners, clockwise from top-left) and reduces the captured
//! samples into calibration data via the active detector.

mod controller;

pub use controller::{
    CalibrationController, CalibrationError, CalibrationPhase, CalibrationStep, CaptureOutcome,
    Corner, DisplayInfo,
};

/// Key under which calibration data is persisted by the external store.
///
/// Changes whenever the camera or the display arrangement changes, so a
/// stale calibration is never applied to a different setup.
pub fn configuration_fingerprint(source_id: &str, displays: &[DisplayInfo]) -> String {
    let mut parts = vec![source_id.to_string()];
    parts.extend(displays.iter().map(|d| d.id.clone()));
    parts.join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_sensitive_to_displays() {
        let one = vec![DisplayInfo::new("main", "Built-in")];
        let two = vec![
            DisplayInfo::new("main", "Built-in"),
            DisplayInfo::new("ext-1", "External"),
        ];

        let a = configuration_fingerprint("cam-0", &one);
        let b = configuration_fingerprint("cam-0", &two);
        let c = configuration_fingerprint("cam-1", &one);

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, configuration_fingerprint("cam-0", &one));
    }
}
