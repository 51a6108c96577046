//! Daemon configuration
//!
//! Layered: built-in defaults, optional `upright.toml`, then
//! `UPRIGHT_`-prefixed environment overrides.

use serde::{Deserialize, Serialize};

/// Which sensing modality to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    #[default]
    Camera,
    Motion,
}

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Sensing modality
    pub modality: Modality,

    /// Raise the privacy blur when the user is absent
    pub away_detection: bool,

    /// Display identifiers to calibrate against, in arrangement order
    pub displays: Vec<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            modality: Modality::Camera,
            away_detection: true,
            displays: vec!["main".to_string()],
        }
    }
}

impl MonitorConfig {
    /// Load with the standard layering
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("upright").required(false))
            .add_source(config::Environment::with_prefix("UPRIGHT"))
            .build()?
            .try_deserialize()
    }
}
