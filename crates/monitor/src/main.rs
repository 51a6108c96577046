//! Posture Monitor - Main Entry Point

use calibration::DisplayInfo;
use detector::{AnyDetector, CameraDetector, FrameRateTier, MotionDetector};
use monitor::{
    init_logging, Collaborators, LogRenderSurface, LogStatusSink, MemoryAnalytics,
    MemoryCalibrationStore, MemoryProfileStore, Modality, MonitorConfig, MonitorService,
    SyntheticLandmarkSource, SyntheticMotionSensor,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    info!("=== Upright Posture Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let config = MonitorConfig::load()?;
    info!(modality = ?config.modality, "starting posture monitor");

    let (events_tx, events_rx) = mpsc::channel(64);
    let detector = match config.modality {
        Modality::Camera => AnyDetector::Camera(CameraDetector::new(
            Arc::new(SyntheticLandmarkSource::default()),
            FrameRateTier::Standard,
            events_tx,
        )),
        Modality::Motion => AnyDetector::Motion(MotionDetector::new(
            Arc::new(SyntheticMotionSensor::default()),
            FrameRateTier::Standard,
            events_tx,
        )),
    };

    let displays = config
        .displays
        .iter()
        .map(|id| DisplayInfo::new(id, id))
        .collect();

    let collaborators = Collaborators {
        analytics: Box::new(MemoryAnalytics::default()),
        status_sink: Box::new(LogStatusSink),
        calibration_store: Box::new(MemoryCalibrationStore::default()),
        profile_store: Box::new(MemoryProfileStore::default()),
        surface: Box::new(LogRenderSurface::default()),
    };

    let (service, handle) = MonitorService::new(
        detector,
        events_rx,
        displays,
        config.away_detection,
        collaborators,
    );

    let service_task = tokio::spawn(service.run());

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    handle.send(monitor::Command::Shutdown).await;
    service_task.await?;

    Ok(())
}
