//! # Sliding Spectrum Module
//!
//! Drives one [`FrequencyBin`] per key over a stream of samples.
//!
//! All bins share a single sample history sized for the longest window, so
//! each bin reads its outgoing sample from the same [`RingBuffer`]. Levels are
//! computed for every sample and, when smoothing is enabled, fed to the moving
//! average at the same rate. Nothing is allocated after construction.
//!
//! See <https://www.comm.utoronto.ca/~dimitris/ece431/slidingdft.pdf>.

use tracing::debug;

use crate::error::ConfigError;
use crate::frequency_bin::FrequencyBin;
use crate::moving_average::{FastMovingAverage, HeavyMovingAverage, MovingAverage};
use crate::ring_buffer::RingBuffer;
use crate::tuning::{BinSpec, PianoTuning};

/// How the level vector is smoothed before it is reported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SmoothingMode {
    /// Report the instantaneous levels of the last sample.
    None,
    /// Approximate moving average with O(keys) memory.
    Fast,
    /// Exact moving average, with history preallocated for windows up to
    /// `max_window_seconds`.
    Heavy { max_window_seconds: f64 },
}

impl SmoothingMode {
    /// Decodes the sign convention used in configuration files: positive
    /// values select the exact average with that much history, negative
    /// values the fast one, and zero disables smoothing.
    pub fn from_seconds(seconds: f64) -> Self {
        if seconds > 0.0 {
            SmoothingMode::Heavy {
                max_window_seconds: seconds,
            }
        } else if seconds < 0.0 {
            SmoothingMode::Fast
        } else {
            SmoothingMode::None
        }
    }
}

/// Diagnostics emitted while a spectrum is being built.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildEvent {
    /// The shared sample history was allocated.
    RingBufferAllocated {
        requested: usize,
        capacity: usize,
        address_bits: u32,
    },
    /// The smoothing stage was allocated.
    MovingAverageAllocated {
        channels: usize,
        /// History per channel in samples; `None` for the fast average.
        max_window: Option<usize>,
    },
}

fn log_build_event(event: BuildEvent) {
    match event {
        BuildEvent::RingBufferAllocated {
            requested,
            capacity,
            address_bits,
        } => debug!(requested, capacity, address_bits, "allocated sample ring buffer"),
        BuildEvent::MovingAverageAllocated {
            channels,
            max_window,
        } => debug!(channels, ?max_window, "allocated moving average"),
    }
}

/// Per-key sliding DFT over a mono sample stream.
#[derive(Debug, Clone)]
pub struct SlidingSpectrum {
    bins: Vec<FrequencyBin>,
    ring_buffer: RingBuffer<f32>,
    moving_average: Option<MovingAverage>,
    levels: Vec<f32>,
    sample_rate: f64,
}

impl SlidingSpectrum {
    /// Builds a spectrum for every key of `tuning`.
    ///
    /// Build diagnostics go to `tracing` at debug level.
    pub fn new(tuning: &PianoTuning, smoothing: SmoothingMode) -> Result<Self, ConfigError> {
        Self::with_observer(tuning, smoothing, &mut log_build_event)
    }

    /// Same as [`SlidingSpectrum::new`], reporting build diagnostics to `observer`.
    pub fn with_observer(
        tuning: &PianoTuning,
        smoothing: SmoothingMode,
        observer: &mut dyn FnMut(BuildEvent),
    ) -> Result<Self, ConfigError> {
        let mapping = tuning.mapping()?;
        Self::from_mapping(tuning.sample_rate(), &mapping, smoothing, observer)
    }

    /// Builds a spectrum from an existing frequency table.
    ///
    /// # Arguments
    /// * `sample_rate` - Sample rate in Hz, used for smoothing windows
    /// * `mapping` - One entry per bin; output levels follow this order
    /// * `smoothing` - Smoothing stage to allocate
    /// * `observer` - Receives build diagnostics
    ///
    /// # Returns
    /// * `Err(ConfigError)` - Empty table, zero-length window, bad sample rate
    ///   or bad smoothing history
    pub fn from_mapping(
        sample_rate: f64,
        mapping: &[BinSpec],
        smoothing: SmoothingMode,
        observer: &mut dyn FnMut(BuildEvent),
    ) -> Result<Self, ConfigError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(ConfigError::InvalidSampleRate(sample_rate));
        }
        if mapping.is_empty() {
            return Err(ConfigError::NoKeys);
        }

        let mut bins = Vec::with_capacity(mapping.len());
        for entry in mapping {
            if entry.n == 0 {
                return Err(ConfigError::EmptyWindow {
                    key: entry.key as i32,
                });
            }
            bins.push(FrequencyBin::new(entry.k, entry.n));
        }

        let max_n = bins.iter().map(|bin| bin.n() as usize).max().unwrap_or(0);
        let ring_buffer = RingBuffer::new(max_n);
        observer(BuildEvent::RingBufferAllocated {
            requested: max_n,
            capacity: ring_buffer.capacity(),
            address_bits: ring_buffer.address_bits(),
        });

        let channels = bins.len();
        let moving_average = match smoothing {
            SmoothingMode::None => None,
            SmoothingMode::Fast => {
                observer(BuildEvent::MovingAverageAllocated {
                    channels,
                    max_window: None,
                });
                Some(MovingAverage::Fast(FastMovingAverage::new(
                    channels,
                    sample_rate,
                )))
            }
            SmoothingMode::Heavy { max_window_seconds } => {
                if !(max_window_seconds.is_finite() && max_window_seconds > 0.0) {
                    return Err(ConfigError::InvalidSmoothing(max_window_seconds));
                }
                let max_window = (sample_rate * max_window_seconds).round() as usize;
                observer(BuildEvent::MovingAverageAllocated {
                    channels,
                    max_window: Some(max_window),
                });
                Some(MovingAverage::Heavy(HeavyMovingAverage::new(
                    channels,
                    sample_rate,
                    max_window,
                )))
            }
        };

        Ok(Self {
            bins,
            ring_buffer,
            moving_average,
            levels: vec![0.0; channels],
            sample_rate,
        })
    }

    /// Processes a batch of samples and returns the levels after the last one.
    ///
    /// Every slot of `samples` is set to zero once it has been consumed, so
    /// callers can reuse the buffer as a mixdown accumulator for the next
    /// block. `smoothing_window_seconds` sets the moving average window and is
    /// ignored when smoothing is disabled.
    ///
    /// The returned slice is the spectrum's own level storage. It stays valid
    /// until the next call; use [`SlidingSpectrum::snapshot`] or
    /// [`SlidingSpectrum::copy_levels_into`] to keep a copy.
    pub fn process(&mut self, samples: &mut [f32], smoothing_window_seconds: f64) -> &[f32] {
        if let Some(average) = self.moving_average.as_mut() {
            average.set_window_seconds(smoothing_window_seconds);
        }

        for sample in samples.iter_mut() {
            let current_sample = *sample;
            *sample = 0.0;
            self.ring_buffer.write(current_sample);

            for (bin, level) in self.bins.iter_mut().zip(self.levels.iter_mut()) {
                let previous_sample = self.ring_buffer.read(bin.n() as usize);
                bin.update(f64::from(previous_sample), f64::from(current_sample));
                *level = bin.level();
            }

            if let Some(average) = self.moving_average.as_mut() {
                average.update(&self.levels);
            }
        }

        if let Some(average) = self.moving_average.as_ref() {
            if average.window() > 0 {
                for (channel, level) in self.levels.iter_mut().enumerate() {
                    *level = average.read(channel);
                }
            }
        }

        &self.levels
    }

    /// The levels reported by the last call to `process`.
    pub fn levels(&self) -> &[f32] {
        &self.levels
    }

    /// Owned copy of the current levels.
    pub fn snapshot(&self) -> Vec<f32> {
        self.levels.clone()
    }

    /// Copies the current levels into `out` without allocating.
    ///
    /// Copies `min(out.len(), self.len())` values and returns that count.
    pub fn copy_levels_into(&self, out: &mut [f32]) -> usize {
        let count = out.len().min(self.levels.len());
        out[..count].copy_from_slice(&self.levels[..count]);
        count
    }

    pub fn bins(&self) -> &[FrequencyBin] {
        &self.bins
    }

    /// Number of bins (and levels).
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// The smoothing stage, if any.
    pub fn smoothing(&self) -> Option<&MovingAverage> {
        self.moving_average.as_ref()
    }

    /// Capacity of the shared sample history.
    pub fn history_capacity(&self) -> usize {
        self.ring_buffer.capacity()
    }
}
