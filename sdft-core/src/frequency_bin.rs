//! # Frequency Bin Module
//!
//! One sliding DFT coefficient, tracked sample by sample.
//!
//! For a window of `N` samples and frequency index `k` the coefficient obeys
//! `X[n] = (X[n-1] - x[n-N] + x[n]) * e^(i*2*pi*k/N)`, so each new sample costs
//! one complex multiply instead of a full transform.
//!
//! The running power sum is maintained incrementally as well. Rounding error
//! accumulates in it over long runs; this drift is accepted and not corrected.

use std::f64::consts::PI;

use crate::complex::Complex;

/// Sliding DFT state for a single target frequency.
#[derive(Debug, Clone)]
pub struct FrequencyBin {
    k: u32,
    n: u32,
    bands: f64,
    coeff: Complex,
    dft: Complex,
    total_power: f64,
}

impl FrequencyBin {
    /// Creates a bin for frequency index `k` over a window of `n` samples.
    ///
    /// # Arguments
    /// * `k` - Frequency divided by the bandwidth
    /// * `n` - Sample rate divided by the bandwidth (window length in samples)
    ///
    /// `n` must be at least 1. [`SlidingSpectrum`](crate::spectrum::SlidingSpectrum)
    /// rejects empty windows before building its bins; direct callers are
    /// responsible for the same check.
    pub fn new(k: u32, n: u32) -> Self {
        debug_assert!(n > 0, "sliding DFT window must hold at least one sample");
        Self {
            k,
            n,
            bands: f64::from(n) / 2.0,
            coeff: Complex::new(0.0, 2.0 * PI * (f64::from(k) / f64::from(n))).exp(),
            dft: Complex::ZERO,
            total_power: 0.0,
        }
    }

    /// Advances the window by one sample.
    ///
    /// # Arguments
    /// * `previous_sample` - The sample leaving the window (written `n` samples ago)
    /// * `current_sample` - The newest sample
    #[inline]
    pub fn update(&mut self, previous_sample: f64, current_sample: f64) {
        self.total_power += current_sample * current_sample;
        self.total_power -= previous_sample * previous_sample;

        self.dft = (self.dft - Complex::from(previous_sample) + Complex::from(current_sample))
            * self.coeff;
    }

    /// Magnitude of the coefficient relative to the RMS of the window.
    ///
    /// A pure tone sitting exactly on this bin reads 1.0; energy elsewhere in
    /// the spectrum pulls it towards 0. Silence reads 0. A ratio above 1 is
    /// reported as 0 rather than clamped.
    #[inline]
    pub fn level(&self) -> f32 {
        let rms = (self.total_power / self.bands).sqrt();
        // Drift can leave a tiny negative power after silence, hence `> 0`.
        if !(rms > 0.0) {
            return 0.0;
        }
        let level = (self.dft.magnitude() / self.bands) / rms;
        if level <= 1.0 { level as f32 } else { 0.0 }
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn n(&self) -> u32 {
        self.n
    }

    pub fn bands(&self) -> f64 {
        self.bands
    }

    /// Current value of the DFT accumulator.
    pub fn dft(&self) -> Complex {
        self.dft
    }

    /// Sum of squares of the last `n` samples, up to accumulated rounding.
    pub fn total_power(&self) -> f64 {
        self.total_power
    }
}
