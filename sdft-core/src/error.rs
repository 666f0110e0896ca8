//! Errors raised while building a tuning or a spectrum.
//!
//! Everything here is detected at construction time; the per-sample path
//! has no failure modes.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid sample rate: {0}. Must be a positive, finite number of Hz")]
    InvalidSampleRate(f64),

    #[error("Invalid pitch fork: {0}. Must be a positive, finite frequency in Hz")]
    InvalidPitchFork(f64),

    #[error("Key count must be at least 1")]
    NoKeys,

    #[error("Key {key} has a non-positive bandwidth ({bandwidth} Hz)")]
    InvalidBandwidth { key: i32, bandwidth: f64 },

    #[error("Key {key} maps to an empty window (N = 0)")]
    EmptyWindow { key: i32 },

    #[error("Invalid smoothing window: {0} seconds")]
    InvalidSmoothing(f64),

    #[error("Invalid update interval: {0} seconds. Must be positive")]
    InvalidUpdateInterval(f64),

    #[error("Could not access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config file: {0}")]
    Json(#[from] serde_json::Error),
}
