// sdft-core/src/lib.rs

//! Per-key level spectrum for piano audio.
//!
//! A bank of sliding DFT bins, one per piano key, each tuned so that its
//! frequency index lands as close as possible to the key's equal-tempered
//! pitch. Every input sample updates every bin in constant time, producing a
//! normalized level in `[0, 1]` per key, optionally smoothed over time.
//!
//! This crate is headless and contains no GUI code. Audio capture through
//! CPAL is behind the `capture` feature.

pub mod complex;
pub mod config;
pub mod engine;
pub mod error;
pub mod frequency_bin;
pub mod moving_average;
pub mod ring_buffer;
pub mod spectrum;
pub mod tuning;

#[cfg(feature = "capture")]
pub mod audio;

pub use complex::Complex;
pub use config::SpectrumConfig;
pub use engine::{EngineControl, LevelFrame, SpectrumEngine};
pub use error::ConfigError;
pub use frequency_bin::FrequencyBin;
pub use moving_average::{FastMovingAverage, HeavyMovingAverage, MovingAverage};
pub use ring_buffer::RingBuffer;
pub use spectrum::{BuildEvent, SlidingSpectrum, SmoothingMode};
pub use tuning::{BinSpec, PianoTuning};
