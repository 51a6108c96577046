//! Settings profiles

use chrono::{DateTime, Utc};
use compositor::WarningMode;
use detector::{FrameRateTier, MonitorParams};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Profile errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("Profile not found")]
    NotFound,

    #[error("The last remaining profile cannot be deleted")]
    LastProfile,
}

/// One named settings bundle. Many may exist; exactly one is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsProfile {
    pub id: Uuid,
    pub name: String,
    pub warning_mode: WarningMode,
    /// Overlay tint as "#rrggbb"
    pub warning_color: String,
    /// Tolerance band as a fraction of the calibrated range
    pub dead_zone: f32,
    /// Severity curve aggressiveness
    pub intensity: f32,
    pub warning_onset_delay: Duration,
    pub frame_rate_tier: FrameRateTier,
    pub updated_at: DateTime<Utc>,
}

impl SettingsProfile {
    pub fn new(name: &str) -> Self {
        let params = MonitorParams::default();
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            warning_mode: WarningMode::default(),
            warning_color: "#d23f31".to_string(),
            dead_zone: params.dead_zone_fraction,
            intensity: params.intensity_exponent,
            warning_onset_delay: Duration::from_secs(5),
            frame_rate_tier: FrameRateTier::default(),
            updated_at: Utc::now(),
        }
    }

    /// Detector-facing parameter snapshot
    pub fn monitor_params(&self) -> MonitorParams {
        MonitorParams {
            intensity_exponent: self.intensity,
            dead_zone_fraction: self.dead_zone,
        }
    }
}

/// Profile collection with one active profile.
///
/// Deleting the last remaining profile is disallowed so monitoring
/// always has parameters to apply.
#[derive(Debug)]
pub struct ProfileManager {
    profiles: Vec<SettingsProfile>,
    active_id: Uuid,
}

impl ProfileManager {
    /// Manager seeded with a default profile
    pub fn new() -> Self {
        let default = SettingsProfile::new("Default");
        let active_id = default.id;
        Self {
            profiles: vec![default],
            active_id,
        }
    }

    /// Rebuild from persisted profiles; falls back to a fresh default
    /// when the store was empty or the active id is gone.
    pub fn from_persisted(profiles: Vec<SettingsProfile>, active_id: Option<Uuid>) -> Self {
        if profiles.is_empty() {
            return Self::new();
        }
        let active_id = active_id
            .filter(|id| profiles.iter().any(|p| p.id == *id))
            .unwrap_or(profiles[0].id);
        Self {
            profiles,
            active_id,
        }
    }

    pub fn create(&mut self, name: &str) -> &SettingsProfile {
        let profile = SettingsProfile::new(name);
        info!(%profile.id, name, "profile created");
        self.profiles.push(profile);
        self.profiles.last().expect("just pushed")
    }

    pub fn update(&mut self, profile: SettingsProfile) -> Result<(), ProfileError> {
        let slot = self
            .profiles
            .iter_mut()
            .find(|p| p.id == profile.id)
            .ok_or(ProfileError::NotFound)?;
        *slot = SettingsProfile {
            updated_at: Utc::now(),
            ..profile
        };
        Ok(())
    }

    pub fn delete(&mut self, id: Uuid) -> Result<(), ProfileError> {
        if self.profiles.len() == 1 {
            return Err(ProfileError::LastProfile);
        }
        let index = self
            .profiles
            .iter()
            .position(|p| p.id == id)
            .ok_or(ProfileError::NotFound)?;
        self.profiles.remove(index);
        info!(%id, "profile deleted");

        if self.active_id == id {
            self.active_id = self.profiles[0].id;
        }
        Ok(())
    }

    pub fn set_active(&mut self, id: Uuid) -> Result<(), ProfileError> {
        if !self.profiles.iter().any(|p| p.id == id) {
            return Err(ProfileError::NotFound);
        }
        info!(%id, "active profile switched");
        self.active_id = id;
        Ok(())
    }

    pub fn active(&self) -> &SettingsProfile {
        self.profiles
            .iter()
            .find(|p| p.id == self.active_id)
            .expect("active profile always exists")
    }

    pub fn all(&self) -> &[SettingsProfile] {
        &self.profiles
    }
}

impl Default for ProfileManager {
    fn default() -> Self {
        Self::new()
    }
}
