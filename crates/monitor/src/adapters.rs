//! Stand-in collaborator implementations
//!
//! The real deployment injects platform implementations (vision stack,
//! motion framework, settings storage, menu UI). Until those are
//! wired, the daemon runs against a synthetic landmark source and
//! in-memory stores so every pipeline stage stays exercisable.

use app_state::{Analytics, CalibrationStore, ProfileStore, SettingsProfile, Status, StatusSink};
use compositor::CompositorFrame;
use detector::{
    AuthorizationStatus, CalibrationData, LandmarkFrame, LandmarkSource, MotionSensor, Orientation,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;
use tracing::{debug, info};
use uuid::Uuid;

/// Consumer of composited output frames.
pub trait RenderSurface: Send {
    fn render(&mut self, frame: CompositorFrame);
}

/// Deterministic landmark source: the head drifts slowly downward and
/// recovers, so every pipeline stage gets exercised end to end.
#[derive(Debug, Default)]
pub struct SyntheticLandmarkSource {
    ticks: AtomicU64,
}

impl LandmarkSource for SyntheticLandmarkSource {
    fn is_available(&self) -> bool {
        true
    }

    fn authorization(&self) -> AuthorizationStatus {
        AuthorizationStatus::Authorized
    }

    fn request_access(&self, reply: oneshot::Sender<bool>) {
        let _ = reply.send(true);
    }

    fn sample(&self) -> Option<LandmarkFrame> {
        let t = self.ticks.fetch_add(1, Ordering::Relaxed) as f32;
        // Slow slouch-and-recover cycle around the calibrated band
        let position = 0.5 + 0.25 * (t / 40.0).sin();
        Some(LandmarkFrame {
            body_y: Some(position),
            face_y: Some(position - 0.02),
            head_width: Some(0.3),
            confidence: 0.9,
        })
    }

    fn source_id(&self) -> String {
        "synthetic-cam".to_string()
    }
}

/// Deterministic head-worn sensor with the same drift.
#[derive(Debug, Default)]
pub struct SyntheticMotionSensor {
    ticks: AtomicU64,
}

impl MotionSensor for SyntheticMotionSensor {
    fn os_supported(&self) -> bool {
        true
    }

    fn hardware_supported(&self) -> bool {
        true
    }

    fn is_worn(&self) -> bool {
        true
    }

    fn sample(&self) -> Option<Orientation> {
        let t = self.ticks.fetch_add(1, Ordering::Relaxed) as f32;
        Some(Orientation {
            pitch: -15.0 * (t / 40.0).sin().max(0.0),
            roll: 0.0,
            yaw: 0.0,
        })
    }

    fn request_access(&self, reply: oneshot::Sender<bool>) {
        let _ = reply.send(true);
    }

    fn source_id(&self) -> String {
        "synthetic-airpods".to_string()
    }
}

/// In-memory profile store.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: HashMap<Uuid, SettingsProfile>,
    active_id: Option<Uuid>,
}

impl ProfileStore for MemoryProfileStore {
    fn load_all(&self) -> Vec<SettingsProfile> {
        self.profiles.values().cloned().collect()
    }

    fn load_active_id(&self) -> Option<Uuid> {
        self.active_id
    }

    fn save(&mut self, profile: &SettingsProfile) {
        self.profiles.insert(profile.id, profile.clone());
    }

    fn save_active_id(&mut self, id: Uuid) {
        self.active_id = Some(id);
    }

    fn delete(&mut self, id: Uuid) {
        self.profiles.remove(&id);
    }
}

/// In-memory calibration store keyed by configuration fingerprint.
#[derive(Debug, Default)]
pub struct MemoryCalibrationStore {
    blobs: HashMap<String, CalibrationData>,
}

impl CalibrationStore for MemoryCalibrationStore {
    fn load(&self, fingerprint: &str) -> Option<CalibrationData> {
        self.blobs.get(fingerprint).cloned()
    }

    fn save(&mut self, fingerprint: &str, data: &CalibrationData) {
        info!(fingerprint, "calibration persisted");
        self.blobs.insert(fingerprint.to_string(), data.clone());
    }
}

/// Status sink that logs transitions.
#[derive(Debug, Default)]
pub struct LogStatusSink;

impl StatusSink for LogStatusSink {
    fn status_changed(&mut self, status: Status) {
        info!(?status, "status changed");
    }
}

/// Analytics sink that accumulates in memory and logs.
#[derive(Debug, Default)]
pub struct MemoryAnalytics {
    pub slouching_seconds: f32,
    pub upright_seconds: f32,
    pub events: Vec<String>,
}

impl Analytics for MemoryAnalytics {
    fn track_time(&mut self, slouching: bool, seconds: f32) {
        if slouching {
            self.slouching_seconds += seconds;
        } else {
            self.upright_seconds += seconds;
        }
    }

    fn record_event(&mut self, name: &str) {
        debug!(name, "analytics event");
        self.events.push(name.to_string());
    }
}

/// Render surface that logs target levels.
#[derive(Debug, Default)]
pub struct LogRenderSurface {
    last: Option<CompositorFrame>,
}

impl RenderSurface for LogRenderSurface {
    fn render(&mut self, frame: CompositorFrame) {
        if self.last != Some(frame) {
            debug!(
                blur = frame.blur_level,
                overlay = frame.overlay_intensity,
                "render"
            );
            self.last = Some(frame);
        }
    }
}
