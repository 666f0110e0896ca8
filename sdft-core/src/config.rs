//! # Configuration Module
//!
//! Session settings that are fixed when the analysis starts, plus the
//! initial value of the smoothing parameter. Stored as pretty-printed JSON so
//! a setup can be saved and restored between sessions.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::spectrum::SmoothingMode;
use crate::tuning::{
    DEFAULT_KEY_COUNT, DEFAULT_PITCH_FORK, DEFAULT_REFERENCE_KEY, PianoTuning,
};

/// Upper bound of the smoothing parameter, in seconds.
pub const MAX_SMOOTHING_SECONDS: f64 = 0.25;
/// Default smoothing parameter, in seconds.
pub const DEFAULT_SMOOTHING_SECONDS: f64 = 0.05;
/// Snapshots are published to the UI at 60 fps.
pub const DEFAULT_UPDATE_INTERVAL_SECONDS: f64 = 1.0 / 60.0;

/// Everything needed to start an analysis session, except the sample rate,
/// which comes from the audio device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    /// Frequency of the reference key in Hz.
    pub pitch_fork: f64,
    /// Number of keys to analyze.
    pub key_count: usize,
    /// Key index tuned to `pitch_fork`.
    pub reference_key: i32,
    /// Smoothing stage: positive allocates the exact average with this much
    /// history, negative selects the fast average, zero disables smoothing.
    pub max_smoothing_seconds: f64,
    /// Initial smoothing window, in `[0, MAX_SMOOTHING_SECONDS]`.
    pub smoothing_seconds: f64,
    /// Minimum stream time between two published snapshots.
    pub update_interval_seconds: f64,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            pitch_fork: DEFAULT_PITCH_FORK,
            key_count: DEFAULT_KEY_COUNT,
            reference_key: DEFAULT_REFERENCE_KEY,
            max_smoothing_seconds: -1.0,
            smoothing_seconds: DEFAULT_SMOOTHING_SECONDS,
            update_interval_seconds: DEFAULT_UPDATE_INTERVAL_SECONDS,
        }
    }
}

impl SpectrumConfig {
    /// Checks the fields that do not depend on the sample rate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.pitch_fork.is_finite() && self.pitch_fork > 0.0) {
            return Err(ConfigError::InvalidPitchFork(self.pitch_fork));
        }
        if self.key_count == 0 {
            return Err(ConfigError::NoKeys);
        }
        if !self.max_smoothing_seconds.is_finite() {
            return Err(ConfigError::InvalidSmoothing(self.max_smoothing_seconds));
        }
        if !(0.0..=MAX_SMOOTHING_SECONDS).contains(&self.smoothing_seconds) {
            return Err(ConfigError::InvalidSmoothing(self.smoothing_seconds));
        }
        if !(self.update_interval_seconds.is_finite() && self.update_interval_seconds > 0.0) {
            return Err(ConfigError::InvalidUpdateInterval(self.update_interval_seconds));
        }
        Ok(())
    }

    /// Builds the tuning for a device running at `sample_rate`.
    pub fn tuning(&self, sample_rate: f64) -> Result<PianoTuning, ConfigError> {
        PianoTuning::new(sample_rate, self.pitch_fork, self.key_count, self.reference_key)
    }

    pub fn smoothing_mode(&self) -> SmoothingMode {
        SmoothingMode::from_seconds(self.max_smoothing_seconds)
    }

    /// Loads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: SpectrumConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json_string = serde_json::to_string_pretty(self)?;
        fs::write(path, json_string).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
