//! Owner-task event loop
//!
//! All shared state (operating state, monitoring state, compositor
//! channels) lives on this single task. Detector callbacks, control
//! commands, and the compositor tick are marshalled through channels
//! into one `select!` loop, so reentrancy guards are the only
//! concurrency protection anything here needs.

use crate::adapters::RenderSurface;
use app_state::{
    Analytics, AppState, AppStateMachine, CalibrationStore, ProfileManager, ProfileStore,
    SettingsProfile, Status, StatusSink, TransitionEffect,
};
use calibration::{configuration_fingerprint, CalibrationController, CaptureOutcome, DisplayInfo};
use detector::{
    AnyDetector, CalibrationData, Detector, DetectorError, DetectorEvent, PostureReading,
    SensorReading,
};
use posture_engine::{Effect, MonitoringState, PostureConfig};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Control commands accepted by the owner loop.
#[derive(Debug, Clone)]
pub enum Command {
    SetState(AppState),
    BeginCalibration,
    CaptureCalibrationStep,
    CancelCalibration,
    SelectProfile(Uuid),
    UpdateProfile(SettingsProfile),
    Shutdown,
}

/// Handle for sending commands into a running service.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    commands: mpsc::Sender<Command>,
}

impl MonitorHandle {
    /// Send a command; `false` when the service has shut down
    pub async fn send(&self, command: Command) -> bool {
        self.commands.send(command).await.is_ok()
    }
}

/// Injected external collaborators.
pub struct Collaborators {
    pub analytics: Box<dyn Analytics>,
    pub status_sink: Box<dyn StatusSink>,
    pub calibration_store: Box<dyn CalibrationStore>,
    pub profile_store: Box<dyn ProfileStore>,
    pub surface: Box<dyn RenderSurface>,
}

/// The monitoring daemon's single logical owner.
pub struct MonitorService {
    machine: AppStateMachine,
    detector: AnyDetector,
    controller: CalibrationController,
    compositor: compositor::WarningCompositor,
    profiles: ProfileManager,
    monitoring_state: MonitoringState,
    calibration: Option<CalibrationData>,
    displays: Vec<DisplayInfo>,
    away_enabled: bool,
    analytics: Box<dyn Analytics>,
    status_sink: Box<dyn StatusSink>,
    calibration_store: Box<dyn CalibrationStore>,
    profile_store: Box<dyn ProfileStore>,
    surface: Box<dyn RenderSurface>,
    events: mpsc::Receiver<DetectorEvent>,
    commands: mpsc::Receiver<Command>,
    auth_results_tx: mpsc::Sender<bool>,
    auth_results: mpsc::Receiver<bool>,
    start_results_tx: mpsc::Sender<Result<(), DetectorError>>,
    start_results: mpsc::Receiver<Result<(), DetectorError>>,
    readings_tx: Option<mpsc::Sender<PostureReading>>,
    epoch: Instant,
    state_before_calibration: AppState,
    state_before_activation: AppState,
}

impl MonitorService {
    pub fn new(
        detector: AnyDetector,
        events: mpsc::Receiver<DetectorEvent>,
        displays: Vec<DisplayInfo>,
        away_enabled: bool,
        collaborators: Collaborators,
    ) -> (Self, MonitorHandle) {
        let Collaborators {
            analytics,
            status_sink,
            calibration_store,
            profile_store,
            surface,
        } = collaborators;

        let profiles =
            ProfileManager::from_persisted(profile_store.load_all(), profile_store.load_active_id());
        let fingerprint = configuration_fingerprint(&detector.source_id(), &displays);
        let calibration = calibration_store.load(&fingerprint);
        if calibration.is_some() {
            info!(fingerprint, "calibration restored for this configuration");
        }

        let (commands_tx, commands_rx) = mpsc::channel(32);
        let (auth_results_tx, auth_results) = mpsc::channel(4);
        let (start_results_tx, start_results) = mpsc::channel(4);
        let compositor =
            compositor::WarningCompositor::new(profiles.active().warning_mode);

        let service = Self {
            machine: AppStateMachine::default(),
            detector,
            controller: CalibrationController::new(),
            compositor,
            profiles,
            monitoring_state: MonitoringState::new(),
            calibration,
            displays,
            away_enabled,
            analytics,
            status_sink,
            calibration_store,
            profile_store,
            surface,
            events,
            commands: commands_rx,
            auth_results_tx,
            auth_results,
            start_results_tx,
            start_results,
            readings_tx: None,
            epoch: Instant::now(),
            state_before_calibration: AppState::Disabled,
            state_before_activation: AppState::Disabled,
        };
        let handle = MonitorHandle {
            commands: commands_tx,
        };
        (service, handle)
    }

    /// Subscribe to per-frame classified readings
    pub fn posture_readings(&mut self) -> mpsc::Receiver<PostureReading> {
        let (tx, rx) = mpsc::channel(32);
        self.readings_tx = Some(tx);
        rx
    }

    /// Run until a shutdown command arrives or all handles drop.
    pub async fn run(mut self) {
        let mut ticker = interval(compositor::TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("monitor service running");

        loop {
            tokio::select! {
                Some(event) = self.events.recv() => self.on_detector_event(event),
                Some(granted) = self.auth_results.recv() => self.on_auth_result(granted),
                Some(result) = self.start_results.recv() => self.on_start_result(result),
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.on_command(command),
                },
                _ = ticker.tick() => self.on_tick(),
            }
        }

        self.detector.stop();
        info!("monitor service stopped");
    }

    /// Apply a state change, remembering where it came from so an
    /// authorization denial can restore the pre-existing state.
    fn transition_to(&mut self, next: AppState) {
        let previous = self.machine.state();
        let effects = self.machine.set_state(next);
        self.apply_transition(previous, effects);
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::SetState(state) => self.transition_to(state),
            Command::BeginCalibration => self.begin_calibration(),
            Command::CaptureCalibrationStep => self.capture_step(),
            Command::CancelCalibration => {
                if self.controller.is_running() {
                    self.controller.cancel();
                    self.transition_to(self.state_before_calibration);
                }
            }
            Command::SelectProfile(id) => match self.profiles.set_active(id) {
                Ok(()) => {
                    self.profile_store.save_active_id(id);
                    if self.machine.state() == AppState::Monitoring {
                        self.apply_active_profile();
                    }
                }
                Err(error) => warn!(%id, %error, "profile switch rejected"),
            },
            Command::UpdateProfile(profile) => {
                let is_active = profile.id == self.profiles.active().id;
                match self.profiles.update(profile.clone()) {
                    Ok(()) => {
                        self.profile_store.save(&profile);
                        if is_active {
                            self.detector.set_frame_rate(profile.frame_rate_tier);
                            self.detector.update_parameters(profile.monitor_params());
                            self.compositor.set_mode(profile.warning_mode);
                        }
                    }
                    Err(error) => warn!(%error, "profile update rejected"),
                }
            }
            // Intercepted by the run loop; nothing to do here
            Command::Shutdown => {}
        }
    }

    fn begin_calibration(&mut self) {
        let requires = self.detector.requires_connection();
        let connected = self.detector.is_connected();
        match self.controller.begin(&self.displays, requires, connected) {
            Ok(()) => {
                self.state_before_calibration = self.machine.state();
                self.transition_to(AppState::Calibrating);
            }
            Err(error) => warn!(%error, "calibration not started"),
        }
    }

    fn capture_step(&mut self) {
        match self.controller.capture(self.detector.current_calibration_sample()) {
            CaptureOutcome::Advanced => {
                if let Some(step) = self.controller.current_step() {
                    debug!(index = step.index, corner = ?step.corner, "next calibration step");
                }
            }
            CaptureOutcome::Finished(samples) => {
                match self.detector.create_calibration_data(&samples) {
                    Some(data) => self.complete_calibration(data),
                    None => {
                        // Sample set rejected; prior calibration stays
                        // authoritative
                        warn!("calibration data rejected by detector");
                        self.transition_to(self.state_before_calibration);
                    }
                }
            }
            CaptureOutcome::Cancelled => {
                self.transition_to(self.state_before_calibration);
            }
            CaptureOutcome::Ignored => debug!("capture ignored outside sampling phase"),
        }
    }

    fn complete_calibration(&mut self, data: CalibrationData) {
        let fingerprint = configuration_fingerprint(&self.detector.source_id(), &self.displays);
        self.calibration_store.save(&fingerprint, &data);
        self.calibration = Some(data);
        self.monitoring_state.reset();
        self.transition_to(AppState::Monitoring);
    }

    fn on_detector_event(&mut self, event: DetectorEvent) {
        match event {
            DetectorEvent::Connection(connected) => {
                self.controller.connection_changed(connected);
                let previous = self.machine.state();
                let effects = self.machine.handle_connection_change(connected);
                self.apply_transition(previous, effects);
            }
            DetectorEvent::Reading(reading) => self.on_reading(reading),
        }
    }

    fn on_reading(&mut self, reading: SensorReading) {
        if self.machine.state() != AppState::Monitoring {
            return;
        }

        let (next, effects) = posture_engine::process_absence(
            &self.monitoring_state,
            reading.position.is_some(),
            self.away_enabled,
        );
        self.monitoring_state = next;
        self.run_engine_effects(effects);

        if reading.position.is_some() {
            // The detector is the authoritative holder of the armed
            // session calibration
            let Some(calibration) = self.detector.active_calibration().cloned() else {
                return;
            };
            let config = self.active_posture_config();
            let now = self.epoch.elapsed();
            let (next, effects) = posture_engine::process(
                &self.monitoring_state,
                reading,
                &calibration,
                &config,
                now,
            );
            self.monitoring_state = next;
            self.run_engine_effects(effects);
        }

        self.compositor.update_targets(
            self.monitoring_state.is_currently_away,
            self.monitoring_state.posture_warning_intensity,
        );
    }

    fn run_engine_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::TrackTime { slouching, seconds } => {
                    self.analytics.track_time(slouching, seconds)
                }
                Effect::SlouchEvent => self.analytics.record_event("slouch"),
                Effect::RefreshStatus => {
                    let status = if self.monitoring_state.is_currently_away {
                        Status::Away
                    } else if self.monitoring_state.is_currently_slouching {
                        Status::Bad
                    } else {
                        Status::Good
                    };
                    self.status_sink.status_changed(status);
                }
                Effect::RefreshBlur { intensity } => self
                    .compositor
                    .update_targets(self.monitoring_state.is_currently_away, intensity),
                Effect::EmitReading(reading) => {
                    if let Some(tx) = &self.readings_tx {
                        let _ = tx.try_send(reading);
                    }
                }
            }
        }
    }

    fn apply_transition(&mut self, previous: AppState, effects: Vec<TransitionEffect>) {
        for effect in effects {
            match effect {
                TransitionEffect::SetDetectorRunning(true) => {
                    if !self.detector.is_active() {
                        // Authorization first; the grant comes back
                        // through the loop and triggers the start
                        self.state_before_activation = previous;
                        let grant = self.detector.request_authorization();
                        let results = self.auth_results_tx.clone();
                        tokio::spawn(async move {
                            let _ = results.send(grant.await.unwrap_or(false)).await;
                        });
                    }
                }
                TransitionEffect::SetDetectorRunning(false) => self.detector.stop(),
                TransitionEffect::ClearWarnings => {
                    self.monitoring_state.posture_warning_intensity = 0.0;
                    self.compositor.clear();
                }
                TransitionEffect::ApplyActiveProfile => self.apply_active_profile(),
                TransitionEffect::NotifyStatus(status) => self.status_sink.status_changed(status),
            }
        }
    }

    fn apply_active_profile(&mut self) {
        let profile = self.profiles.active().clone();
        self.detector.set_frame_rate(profile.frame_rate_tier);
        self.compositor.set_mode(profile.warning_mode);

        match self.calibration.clone() {
            Some(calibration) if calibration.is_valid() => {
                self.monitoring_state.reset();
                self.detector
                    .begin_monitoring(calibration, profile.monitor_params());
            }
            _ => {
                warn!("no valid calibration for this configuration; run calibration first");
                self.detector.end_monitoring();
            }
        }
    }

    fn on_auth_result(&mut self, granted: bool) {
        if !granted {
            warn!("sensing authorization denied, restoring previous state");
            self.transition_to(self.state_before_activation);
            return;
        }
        if self.detector.is_active() || !self.machine.state().detector_should_run() {
            return;
        }
        let completion = self.detector.start();
        let results = self.start_results_tx.clone();
        tokio::spawn(async move {
            if let Ok(result) = completion.await {
                let _ = results.send(result).await;
            }
        });
    }

    fn on_start_result(&mut self, result: Result<(), DetectorError>) {
        match result {
            Ok(()) => debug!("detector start confirmed"),
            Err(error) => {
                warn!(%error, "detector start failed");
                let previous = self.machine.state();
                let effects = self.machine.handle_start_failure();
                self.apply_transition(previous, effects);
            }
        }
    }

    fn on_tick(&mut self) {
        if let Some(frame) = self.compositor.tick() {
            self.surface.render(frame);
        }
    }

    /// Reducer config for the current frame. The detector holds the
    /// authoritative session parameters; the onset delay comes from the
    /// active profile.
    fn active_posture_config(&self) -> PostureConfig {
        let params = self.detector.monitor_params();
        PostureConfig {
            intensity_exponent: params.intensity_exponent,
            dead_zone_fraction: params.dead_zone_fraction,
            warning_onset_delay: self.profiles.active().warning_onset_delay,
        }
    }
}
