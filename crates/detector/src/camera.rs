//! Camera (position-sampling) detector
//!
//! Derives one normalized vertical coordinate per sample interval from
//! whichever landmark the injected source can resolve this frame,
//! preferring the full-body landmark and falling back to the face.
//! Landmark extraction itself is a collaborator behind [`LandmarkSource`].

use crate::calibration_data::{CalibrationData, CameraCalibration};
use crate::reading::{CalibrationSample, SensorReading};
use crate::{Detector, DetectorError, DetectorEvent, FrameRateTier, MonitorParams};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Detections below this confidence count as "no reading"
pub const MIN_CONFIDENCE: f32 = 0.5;

/// Sensing access state reported by the landmark source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    NotDetermined,
    Authorized,
    Denied,
}

/// One extracted landmark frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LandmarkFrame {
    /// Vertical coordinate of the full-body landmark, if resolvable
    pub body_y: Option<f32>,
    /// Vertical coordinate of the face landmark, if resolvable
    pub face_y: Option<f32>,
    /// Head bounding width, for the lean-closer signal
    pub head_width: Option<f32>,
    /// Detection confidence in [0, 1]
    pub confidence: f32,
}

/// Landmark extraction collaborator. The real implementation wraps the
/// platform vision stack; tests inject scripted sources.
pub trait LandmarkSource: Send + Sync {
    /// A camera is present on this system
    fn is_available(&self) -> bool;

    /// Current sensing access state
    fn authorization(&self) -> AuthorizationStatus;

    /// Prompt for access. Must resolve `reply` exactly once.
    fn request_access(&self, reply: oneshot::Sender<bool>);

    /// Extract landmarks from the current frame, `None` when no frame
    /// is available
    fn sample(&self) -> Option<LandmarkFrame>;

    /// Stable camera identifier (calibration fingerprint part)
    fn source_id(&self) -> String;
}

/// Position-sampling detector over an injected landmark source.
pub struct CameraDetector {
    source: Arc<dyn LandmarkSource>,
    events: mpsc::Sender<DetectorEvent>,
    interval_ms: Arc<AtomicU64>,
    monitoring: Arc<AtomicBool>,
    /// Bumped on stop so a detached task stops delivering
    generation: Arc<AtomicU64>,
    active: bool,
    calibration: Option<CalibrationData>,
    params: MonitorParams,
}

impl CameraDetector {
    pub fn new(
        source: Arc<dyn LandmarkSource>,
        tier: FrameRateTier,
        events: mpsc::Sender<DetectorEvent>,
    ) -> Self {
        Self {
            source,
            events,
            interval_ms: Arc::new(AtomicU64::new(tier.interval_ms())),
            monitoring: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
            active: false,
            calibration: None,
            params: MonitorParams::default(),
        }
    }

    /// Resolve one reading from a landmark frame: body landmark first,
    /// face fallback, low confidence treated as a miss.
    fn resolve(frame: Option<LandmarkFrame>) -> SensorReading {
        match frame {
            Some(f) if f.confidence >= MIN_CONFIDENCE => SensorReading {
                position: f.body_y.or(f.face_y),
                head_width: f.head_width,
            },
            _ => SensorReading::missed(),
        }
    }

    fn spawn_sampling(&self) {
        let gen = self.generation.load(Ordering::Acquire);
        let generation = Arc::clone(&self.generation);
        let monitoring = Arc::clone(&self.monitoring);
        let interval_ms = Arc::clone(&self.interval_ms);
        let source = Arc::clone(&self.source);
        let events = self.events.clone();

        tokio::spawn(async move {
            debug!("camera sampling task started");
            loop {
                let ms = interval_ms.load(Ordering::Relaxed);
                tokio::time::sleep(Duration::from_millis(ms)).await;

                if generation.load(Ordering::Acquire) != gen {
                    debug!("camera sampling task detached");
                    break;
                }
                if !monitoring.load(Ordering::Acquire) {
                    continue;
                }

                let reading = Self::resolve(source.sample());
                if events.send(DetectorEvent::Reading(reading)).await.is_err() {
                    debug!("detector event receiver dropped");
                    break;
                }
            }
        });
    }
}

impl Detector for CameraDetector {
    fn is_available(&self) -> bool {
        self.source.is_available()
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn is_connected(&self) -> bool {
        // A camera has no coupling notion; connected while active
        self.active
    }

    fn requires_connection(&self) -> bool {
        false
    }

    fn request_authorization(&mut self) -> oneshot::Receiver<bool> {
        let (tx, rx) = oneshot::channel();
        if self.source.authorization() == AuthorizationStatus::Authorized {
            let _ = tx.send(true);
        } else {
            self.source.request_access(tx);
        }
        rx
    }

    fn start(&mut self) -> oneshot::Receiver<Result<(), DetectorError>> {
        let (tx, rx) = oneshot::channel();

        if !self.source.is_available() {
            let _ = tx.send(Err(DetectorError::Unavailable));
            return rx;
        }
        if self.source.authorization() != AuthorizationStatus::Authorized {
            warn!("camera start refused: not authorized");
            let _ = tx.send(Err(DetectorError::Unauthorized));
            return rx;
        }
        if self.active {
            let _ = tx.send(Ok(()));
            return rx;
        }

        info!(source = %self.source.source_id(), "starting camera detector");
        self.active = true;
        self.spawn_sampling();
        let _ = tx.send(Ok(()));
        rx
    }

    fn stop(&mut self) {
        if !self.active {
            return;
        }
        info!("stopping camera detector");
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.monitoring.store(false, Ordering::Release);
        self.active = false;
    }

    fn current_calibration_sample(&self) -> Option<CalibrationSample> {
        let reading = Self::resolve(self.source.sample());
        reading.position.map(|value| CalibrationSample {
            value,
            reference_width: reading.head_width,
        })
    }

    fn create_calibration_data(&self, samples: &[CalibrationSample]) -> Option<CalibrationData> {
        CameraCalibration::from_samples(samples, &self.source.source_id())
            .map(CalibrationData::Camera)
    }

    fn begin_monitoring(&mut self, calibration: CalibrationData, params: MonitorParams) {
        debug!(?params, "camera monitoring armed");
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
        self.source.source_id()
    }
}
