//! Head-motion (orientation-sampling) detector
//!
//! Derives pitch from a head-worn sensor. Unavailable unless both the
//! OS version and the paired hardware support orientation streaming.
//! Unlike the camera, this modality can lose physical coupling: taking
//! the sensor off emits a `Connection(false)` event, and the sampling
//! task keeps watching for its return so the app can resume on its own.

use crate::calibration_data::{CalibrationData, MotionCalibration};
use crate::reading::{CalibrationSample, SensorReading};
use crate::{Detector, DetectorError, DetectorEvent, FrameRateTier, MonitorParams};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Head orientation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Orientation {
    pub pitch: f32,
    pub roll: f32,
    pub yaw: f32,
}

/// Head-worn sensor collaborator. The real implementation wraps the
/// platform motion framework; tests inject scripted sensors.
pub trait MotionSensor: Send + Sync {
    /// OS version supports orientation streaming
    fn os_supported(&self) -> bool;

    /// Paired hardware supports orientation streaming
    fn hardware_supported(&self) -> bool;

    /// Currently worn on the head
    fn is_worn(&self) -> bool;

    /// Current orientation, `None` when no sample is deliverable
    fn sample(&self) -> Option<Orientation>;

    /// Prompt for motion access. Must resolve `reply` exactly once.
    fn request_access(&self, reply: oneshot::Sender<bool>);

    /// Stable sensor identifier
    fn source_id(&self) -> String;
}

/// Orientation-sampling detector over an injected head-worn sensor.
pub struct MotionDetector {
    sensor: Arc<dyn MotionSensor>,
    events: mpsc::Sender<DetectorEvent>,
    interval_ms: Arc<AtomicU64>,
    monitoring: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
    active: bool,
    calibration: Option<CalibrationData>,
    params: MonitorParams,
}

impl MotionDetector {
    pub fn new(
        sensor: Arc<dyn MotionSensor>,
        tier: FrameRateTier,
        events: mpsc::Sender<DetectorEvent>,
    ) -> Self {
        let worn = sensor.is_worn();
        Self {
            sensor,
            events,
            interval_ms: Arc::new(AtomicU64::new(tier.interval_ms())),
            monitoring: Arc::new(AtomicBool::new(false)),
            connected: Arc::new(AtomicBool::new(worn)),
            generation: Arc::new(AtomicU64::new(0)),
            active: false,
            calibration: None,
            params: MonitorParams::default(),
        }
    }

    fn spawn_sampling(&self) {
        let gen = self.generation.load(Ordering::Acquire);
        let generation = Arc::clone(&self.generation);
        let monitoring = Arc::clone(&self.monitoring);
        let connected = Arc::clone(&self.connected);
        let interval_ms = Arc::clone(&self.interval_ms);
        let sensor = Arc::clone(&self.sensor);
        let events = self.events.clone();

        tokio::spawn(async move {
            debug!("motion sampling task started");
            loop {
                let ms = interval_ms.load(Ordering::Relaxed);
                tokio::time::sleep(Duration::from_millis(ms)).await;

                if generation.load(Ordering::Acquire) != gen {
                    debug!("motion sampling task detached");
                    break;
                }

                // Coupling is watched even when not monitoring, so a
                // removed sensor can announce its own return.
                let worn = sensor.is_worn();
                if worn != connected.swap(worn, Ordering::AcqRel) {
                    info!(worn, "motion sensor coupling changed");
                    if events.send(DetectorEvent::Connection(worn)).await.is_err() {
                        break;
                    }
                }

                if !worn || !monitoring.load(Ordering::Acquire) {
                    continue;
                }

                let reading = match sensor.sample() {
                    Some(o) => SensorReading::at(o.pitch),
                    None => SensorReading::missed(),
                };
                if events.send(DetectorEvent::Reading(reading)).await.is_err() {
                    debug!("detector event receiver dropped");
                    break;
                }
            }
        });
    }
}

impl Detector for MotionDetector {
    fn is_available(&self) -> bool {
        self.sensor.os_supported() && self.sensor.hardware_supported()
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn requires_connection(&self) -> bool {
        true
    }

    fn request_authorization(&mut self) -> oneshot::Receiver<bool> {
        let (tx, rx) = oneshot::channel();
        self.sensor.request_access(tx);
        rx
    }

    fn start(&mut self) -> oneshot::Receiver<Result<(), DetectorError>> {
        let (tx, rx) = oneshot::channel();

        if !self.is_available() {
            warn!("motion start refused: unsupported OS or hardware");
            let _ = tx.send(Err(DetectorError::Unavailable));
            return rx;
        }
        if self.active {
            let _ = tx.send(Ok(()));
            return rx;
        }

        info!(source = %self.sensor.source_id(), "starting motion detector");
        self.connected
            .store(self.sensor.is_worn(), Ordering::Release);
        self.active = true;
        self.spawn_sampling();
        let _ = tx.send(Ok(()));
        rx
    }

    fn stop(&mut self) {
        if !self.active {
            return;
        }
        info!("stopping motion detector");
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.monitoring.store(false, Ordering::Release);
        self.active = false;
    }

    fn current_calibration_sample(&self) -> Option<CalibrationSample> {
        if !self.sensor.is_worn() {
            return None;
        }
        self.sensor
            .sample()
            .map(|o| CalibrationSample::new(o.pitch))
    }

    fn create_calibration_data(&self, samples: &[CalibrationSample]) -> Option<CalibrationData> {
        MotionCalibration::from_samples(samples, &self.sensor.source_id())
            .map(CalibrationData::Motion)
    }

    fn begin_monitoring(&mut self, calibration: CalibrationData, params: MonitorParams) {
        debug!(?params, "motion monitoring armed");
        self.calibration = Some(calibration);
        self.params = params;
        self.monitoring.store(true, Ordering::Release);
    }

    fn end_monitoring(&mut self) {
        self.monitoring.store(false, Ordering::Release);
        self.calibration = None;
    }

    fn active_calibration(&self) -> Option<&CalibrationData> {
        self.calibration.as_ref()
    }

    fn update_parameters(&mut self, params: MonitorParams) {
        self.params = params;
    }

    fn monitor_params(&self) -> MonitorParams {
        self.params
    }

    fn set_frame_rate(&mut self, tier: FrameRateTier) {
        self.interval_ms.store(tier.interval_ms(), Ordering::Relaxed);
    }

    fn source_id(&self) -> String {
        self.sensor.source_id()
    }
}
