//! # Musical Tuning Module
//!
//! Maps piano keys to the sliding DFT parameters that track them.
//!
//! ## Features
//! - Equal temperament key to frequency conversion around a configurable
//!   reference key and pitch fork (A4 = 440 Hz on key 48 by default)
//! - Per-key bandwidth from the semitone spacing
//! - Integer `k`/`N` search that minimizes the frequency quantization error
//! - Scientific pitch names for display (`A0` to `C8` on an 88-key piano)

use crate::error::ConfigError;

/// A4 is 440 Hz by default.
pub const DEFAULT_PITCH_FORK: f64 = 440.0;
/// Most pianos have 88 keys.
pub const DEFAULT_KEY_COUNT: usize = 88;
/// Key index of the pitch fork reference. Key 48 is A4 when key 0 is A0.
pub const DEFAULT_REFERENCE_KEY: i32 = 48;

/// Note names starting at A, since the reference key is always an A.
const NOTE_NAMES: [&str; 12] = [
    "A", "A#", "B", "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#",
];

/// The analysis parameters for one key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinSpec {
    /// Key index, 0-based.
    pub key: usize,
    /// Nominal frequency of the key in Hz.
    pub frequency: f64,
    /// Width of the semitone bucket centered on the key, in Hz.
    pub bandwidth: f64,
    /// Frequency index within the window.
    pub k: u32,
    /// Window length in samples.
    pub n: u32,
}

impl BinSpec {
    /// The frequency the bin actually tracks, `sample_rate * k / n`.
    pub fn effective_frequency(&self, sample_rate: f64) -> f64 {
        sample_rate * (f64::from(self.k) / f64::from(self.n))
    }

    /// How far the tracked frequency is from the nominal one, in cents.
    pub fn quantization_cents(&self, sample_rate: f64) -> f64 {
        calculate_cents_deviation(self.effective_frequency(sample_rate), self.frequency)
    }
}

/// Equal-tempered keyboard description for a given sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct PianoTuning {
    sample_rate: f64,
    pitch_fork: f64,
    key_count: usize,
    reference_key: i32,
}

impl PianoTuning {
    /// Creates a tuning, rejecting values that cannot produce valid bins.
    ///
    /// # Arguments
    /// * `sample_rate` - Sample rate in Hz
    /// * `pitch_fork` - Frequency of the reference key in Hz
    /// * `key_count` - Number of keys to analyze, starting at key 0
    /// * `reference_key` - Key index tuned to `pitch_fork`
    pub fn new(
        sample_rate: f64,
        pitch_fork: f64,
        key_count: usize,
        reference_key: i32,
    ) -> Result<Self, ConfigError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(ConfigError::InvalidSampleRate(sample_rate));
        }
        if !(pitch_fork.is_finite() && pitch_fork > 0.0) {
            return Err(ConfigError::InvalidPitchFork(pitch_fork));
        }
        if key_count == 0 {
            return Err(ConfigError::NoKeys);
        }
        Ok(Self {
            sample_rate,
            pitch_fork,
            key_count,
            reference_key,
        })
    }

    /// An 88-key piano with A4 = 440 Hz.
    pub fn standard(sample_rate: f64) -> Result<Self, ConfigError> {
        Self::new(
            sample_rate,
            DEFAULT_PITCH_FORK,
            DEFAULT_KEY_COUNT,
            DEFAULT_REFERENCE_KEY,
        )
    }

    /// Converts a (possibly fractional) key index to its fundamental frequency.
    ///
    /// See <https://en.wikipedia.org/wiki/Piano_key_frequencies>.
    pub fn key_to_frequency(&self, key: f64) -> f64 {
        self.pitch_fork * 2.0_f64.powf((key - f64::from(self.reference_key)) / 12.0)
    }

    /// Computes the analysis parameters for every key.
    ///
    /// For each key the bandwidth is the width of its semitone bucket, which
    /// gives a first guess of `N = sample_rate / bandwidth` and
    /// `k = frequency / bandwidth`. `N` is then lowered one step at a time for
    /// as long as `sample_rate * k / N` gets closer to the key's frequency.
    /// The result trades a little bandwidth (bins become slightly wider and
    /// overlap their neighbours) for a more accurate center frequency.
    ///
    /// # Returns
    /// * `Ok(table)` - One entry per key, in ascending key order
    /// * `Err(ConfigError)` - A key produced a non-positive bandwidth or an empty window
    pub fn mapping(&self) -> Result<Vec<BinSpec>, ConfigError> {
        let mut table = Vec::with_capacity(self.key_count);

        for key in 0..self.key_count {
            let key_position = key as f64;
            let frequency = self.key_to_frequency(key_position);
            let bandwidth = 2.0 * (self.key_to_frequency(key_position + 0.5) - frequency);
            if !(bandwidth > 0.0) {
                return Err(ConfigError::InvalidBandwidth {
                    key: key as i32,
                    bandwidth,
                });
            }

            let mut n = (self.sample_rate / bandwidth).floor() as u32;
            let k = (frequency / bandwidth).floor() as u32;
            if n == 0 {
                return Err(ConfigError::EmptyWindow { key: key as i32 });
            }

            let error = |n: u32| (self.sample_rate * (f64::from(k) / f64::from(n)) - frequency).abs();
            let mut delta = error(n);
            for candidate in (1..n).rev() {
                let candidate_delta = error(candidate);
                if candidate_delta < delta {
                    delta = candidate_delta;
                    n = candidate;
                } else {
                    break;
                }
            }

            table.push(BinSpec {
                key,
                frequency,
                bandwidth,
                k,
                n,
            });
        }

        Ok(table)
    }

    /// Scientific pitch name of a key, e.g. `A4` for the reference key.
    pub fn note_name(&self, key: usize) -> String {
        let offset = key as i64 - i64::from(self.reference_key);
        let name = NOTE_NAMES[offset.rem_euclid(12) as usize];
        // Octave numbers change at C, nine semitones above A.
        let octave = 4 + (offset + 9).div_euclid(12);
        format!("{}{}", name, octave)
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn pitch_fork(&self) -> f64 {
        self.pitch_fork
    }

    pub fn key_count(&self) -> usize {
        self.key_count
    }

    pub fn reference_key(&self) -> i32 {
        self.reference_key
    }
}

/// Calculates the deviation from a target frequency in cents.
///
/// 100 cents is a semitone; positive values are sharp, negative values flat.
pub fn calculate_cents_deviation(freq: f64, target_freq: f64) -> f64 {
    1200.0 * (freq / target_freq).log2()
}
