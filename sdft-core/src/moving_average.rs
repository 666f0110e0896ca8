//! # Moving Average Module
//!
//! Smooths the per-key level vector into an envelope. Two strategies share
//! the same window handling:
//! - **Fast**: one scalar per channel, an exponential approximation of the
//!   windowed mean. Memory is O(channels).
//! - **Heavy**: the exact windowed sum, backed by one [`RingBuffer`] of history
//!   per channel. Memory is O(channels x max window).
//!
//! The window is set in seconds and converted to samples. When the requested
//! window changes, the effective window moves towards it by one sample per
//! update so the envelope never jumps.

use crate::ring_buffer::RingBuffer;

/// Window size state shared by both strategies.
#[derive(Debug, Clone)]
pub struct AverageWindow {
    sample_rate: f64,
    current: usize,
    target: usize,
    primed: bool,
}

impl AverageWindow {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            current: 0,
            target: 0,
            primed: false,
        }
    }

    /// Sets the target window. The very first call also sets the current
    /// window so averaging starts at the requested width.
    pub fn set_seconds(&mut self, seconds: f64) {
        self.set_samples(self.seconds_to_samples(seconds));
    }

    pub fn set_samples(&mut self, samples: usize) {
        self.target = samples;
        if !self.primed {
            self.current = samples;
            self.primed = true;
        }
    }

    /// Moves the current window one sample towards the target.
    #[inline]
    pub fn step(&mut self) {
        if self.target > self.current {
            self.current += 1;
        } else if self.target < self.current {
            self.current -= 1;
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn current_in_seconds(&self) -> f64 {
        self.current as f64 / self.sample_rate
    }

    pub fn seconds_to_samples(&self, seconds: f64) -> usize {
        // Negative and NaN saturate to 0.
        (seconds * self.sample_rate).round() as usize
    }
}

/// Approximate moving average: `sum += level - sum / window`.
///
/// See <https://www.daycounter.com/LabBook/Moving-Average.phtml>.
#[derive(Debug, Clone)]
pub struct FastMovingAverage {
    window: AverageWindow,
    sum: Vec<f64>,
}

impl FastMovingAverage {
    pub fn new(channels: usize, sample_rate: f64) -> Self {
        Self {
            window: AverageWindow::new(sample_rate),
            sum: vec![0.0; channels],
        }
    }

    pub fn update(&mut self, levels: &[f32]) {
        self.window.step();
        let window = self.window.current();
        for (sum, &level) in self.sum.iter_mut().zip(levels) {
            let level = f64::from(level);
            *sum = if window > 0 {
                *sum + level - *sum / window as f64
            } else {
                level
            };
        }
    }

    pub fn read(&self, channel: usize) -> f32 {
        let window = self.window.current();
        if window == 0 {
            // The sum holds the latest level when the window is closed.
            return self.sum[channel] as f32;
        }
        (self.sum[channel] / window as f64) as f32
    }
}

/// Exact moving average over the last `window` levels of each channel.
#[derive(Debug, Clone)]
pub struct HeavyMovingAverage {
    window: AverageWindow,
    max_window: usize,
    sum: Vec<f64>,
    history: Vec<RingBuffer<f32>>,
}

impl HeavyMovingAverage {
    /// Pre-allocates `max_window` samples of history per channel.
    ///
    /// # Arguments
    /// * `channels` - Number of level channels (keys)
    /// * `sample_rate` - Converts window seconds to samples
    /// * `max_window` - Largest window that will ever be requested, in samples
    pub fn new(channels: usize, sample_rate: f64, max_window: usize) -> Self {
        Self {
            window: AverageWindow::new(sample_rate),
            max_window,
            sum: vec![0.0; channels],
            history: (0..channels).map(|_| RingBuffer::new(max_window)).collect(),
        }
    }

    pub fn update(&mut self, levels: &[f32]) {
        let current = self.window.current();
        let target = self.window.target();

        for ((sum, history), &value) in self.sum.iter_mut().zip(&mut self.history).zip(levels) {
            history.write(value);
            *sum += f64::from(value);

            if target == current {
                *sum -= f64::from(history.read(current));
            } else if target < current {
                // The window is about to shrink by one, so drop two trailing values.
                *sum -= f64::from(history.read(current));
                *sum -= f64::from(history.read(current - 1));
            }
            // Growing keeps the new value without dropping one.
        }

        self.window.step();
    }

    pub fn read(&self, channel: usize) -> f32 {
        let window = self.window.current();
        if window == 0 {
            return self.history[channel].read(0);
        }
        (self.sum[channel] / window as f64) as f32
    }

    pub fn max_window(&self) -> usize {
        self.max_window
    }
}

/// The smoothing strategy owned by a spectrum.
#[derive(Debug, Clone)]
pub enum MovingAverage {
    Fast(FastMovingAverage),
    Heavy(HeavyMovingAverage),
}

impl MovingAverage {
    /// Feeds one level per channel.
    #[inline]
    pub fn update(&mut self, levels: &[f32]) {
        match self {
            MovingAverage::Fast(average) => average.update(levels),
            MovingAverage::Heavy(average) => average.update(levels),
        }
    }

    /// Current smoothed level for `channel`.
    ///
    /// With a window of 0 this is the latest unsmoothed level.
    #[inline]
    pub fn read(&self, channel: usize) -> f32 {
        match self {
            MovingAverage::Fast(average) => average.read(channel),
            MovingAverage::Heavy(average) => average.read(channel),
        }
    }

    /// Requests a new window size in seconds.
    pub fn set_window_seconds(&mut self, seconds: f64) {
        match self {
            MovingAverage::Fast(average) => average.window.set_seconds(seconds),
            MovingAverage::Heavy(average) => {
                // Reads past the history would alias newer slots.
                let samples = average.window.seconds_to_samples(seconds).min(average.max_window);
                average.window.set_samples(samples);
            }
        }
    }

    /// Requests a new window size in samples.
    pub fn set_window_samples(&mut self, samples: usize) {
        match self {
            MovingAverage::Fast(average) => average.window.set_samples(samples),
            MovingAverage::Heavy(average) => {
                let samples = samples.min(average.max_window);
                average.window.set_samples(samples);
            }
        }
    }

    /// Moves the effective window one sample towards the requested one.
    pub fn update_window(&mut self) {
        self.window_mut().step();
    }

    /// Effective window in samples.
    pub fn window(&self) -> usize {
        self.window_ref().current()
    }

    /// Requested window in samples.
    pub fn target_window(&self) -> usize {
        self.window_ref().target()
    }

    pub fn window_in_seconds(&self) -> f64 {
        self.window_ref().current_in_seconds()
    }

    /// Running sum for `channel`, before division by the window.
    pub fn sum(&self, channel: usize) -> f64 {
        match self {
            MovingAverage::Fast(average) => average.sum[channel],
            MovingAverage::Heavy(average) => average.sum[channel],
        }
    }

    pub fn channels(&self) -> usize {
        match self {
            MovingAverage::Fast(average) => average.sum.len(),
            MovingAverage::Heavy(average) => average.sum.len(),
        }
    }

    fn window_ref(&self) -> &AverageWindow {
        match self {
            MovingAverage::Fast(average) => &average.window,
            MovingAverage::Heavy(average) => &average.window,
        }
    }

    fn window_mut(&mut self) -> &mut AverageWindow {
        match self {
            MovingAverage::Fast(average) => &mut average.window,
            MovingAverage::Heavy(average) => &mut average.window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heavy(channels: usize, max_window: usize) -> MovingAverage {
        MovingAverage::Heavy(HeavyMovingAverage::new(channels, 1000.0, max_window))
    }

    fn fast(channels: usize) -> MovingAverage {
        MovingAverage::Fast(FastMovingAverage::new(channels, 1000.0))
    }

    /// Exact sum of the last `window` values, counting the time before the
    /// first input as zeros.
    fn trailing_sum(inputs: &[f32], window: usize) -> f64 {
        inputs.iter().rev().take(window).map(|&v| f64::from(v)).sum()
    }

    #[test]
    fn test_window_from_seconds() {
        let mut average = fast(1);
        average.set_window_seconds(0.05);
        assert_eq!(average.window(), 50);
        assert_eq!(average.target_window(), 50);
        assert!((average.window_in_seconds() - 0.05).abs() < 1e-12);

        // Later requests only move the target.
        average.set_window_seconds(0.0524);
        assert_eq!(average.window(), 50);
        assert_eq!(average.target_window(), 52);
    }

    #[test]
    fn test_window_ramps_one_sample_per_update() {
        let mut average = fast(2);
        average.set_window_samples(10);
        average.set_window_samples(4);

        let mut previous = average.window();
        for _ in 0..10 {
            average.update(&[0.5, 0.5]);
            let window = average.window();
            assert!(previous.abs_diff(window) <= 1);
            assert!(window >= 4);
            previous = window;
        }
        assert_eq!(average.window(), 4);

        average.set_window_samples(7);
        for _ in 0..3 {
            average.update_window();
        }
        assert_eq!(average.window(), 7);
        average.update_window();
        assert_eq!(average.window(), 7);
    }

    #[test]
    fn test_fast_converges_monotonically() {
        let mut average = fast(3);
        average.set_window_samples(32);

        let constant = [0.8f32, 0.25, 1.0];
        let mut previous = [0.0f32; 3];
        for _ in 0..2000 {
            average.update(&constant);
            for channel in 0..3 {
                let value = average.read(channel);
                assert!(
                    value >= previous[channel],
                    "channel {} moved away from the target: {} -> {}",
                    channel,
                    previous[channel],
                    value
                );
                assert!(value <= constant[channel] + 1e-6);
                previous[channel] = value;
            }
        }
        for channel in 0..3 {
            assert!((average.read(channel) - constant[channel]).abs() < 1e-4);
        }
    }

    #[test]
    fn test_fast_zero_window_is_passthrough() {
        let mut average = fast(2);
        average.set_window_samples(0);
        average.update(&[0.3, 0.9]);
        assert_eq!(average.read(0), 0.3);
        assert_eq!(average.read(1), 0.9);
        average.update(&[0.1, 0.2]);
        assert_eq!(average.read(0), 0.1);
        assert_eq!(average.read(1), 0.2);
    }

    #[test]
    fn test_heavy_is_exact_for_fixed_window() {
        let window = 16;
        let mut average = heavy(2, 64);
        average.set_window_samples(window);

        let mut inputs = [Vec::new(), Vec::new()];
        for i in 0..200u32 {
            let levels = [(i % 7) as f32 * 0.125, ((i * 13) % 11) as f32 * 0.0625];
            average.update(&levels);
            inputs[0].push(levels[0]);
            inputs[1].push(levels[1]);

            for channel in 0..2 {
                assert_eq!(average.sum(channel), trailing_sum(&inputs[channel], window));
            }
        }
        let expected = trailing_sum(&inputs[0], window) / window as f64;
        assert!((f64::from(average.read(0)) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_heavy_is_exact_across_grow_and_shrink() {
        let mut average = heavy(1, 40);
        average.set_window_samples(8);

        // Targets alternate between growing, shrinking and holding, including
        // changes that arrive before the previous ramp has finished.
        let schedule = [(0, 8), (20, 20), (26, 3), (31, 30), (40, 0), (75, 12), (80, 5), (83, 40), (150, 1), (200, 0)];
        let mut inputs = Vec::new();
        for i in 0..260u32 {
            if let Some(&(_, target)) = schedule.iter().find(|(at, _)| *at == i) {
                average.set_window_samples(target);
            }
            let value = ((i * 29) % 17) as f32 * 0.25;
            average.update(&[value]);
            inputs.push(value);

            let window = average.window();
            assert_eq!(
                average.sum(0),
                trailing_sum(&inputs, window),
                "sum diverged at update {} with window {}",
                i,
                window
            );
        }
        assert_eq!(average.window(), 0);
        // A closed window passes the latest value through.
        assert_eq!(average.read(0), *inputs.last().unwrap());
    }

    #[test]
    fn test_heavy_target_is_clamped_to_history() {
        let mut average = heavy(1, 10);
        average.set_window_seconds(1.0);
        assert_eq!(average.window(), 10);
        assert_eq!(average.target_window(), 10);

        let mut inputs = Vec::new();
        for i in 0..50u32 {
            let value = (i % 5) as f32;
            average.update(&[value]);
            inputs.push(value);
            assert_eq!(average.sum(0), trailing_sum(&inputs, 10));
        }
    }

    #[test]
    fn test_channels() {
        assert_eq!(fast(88).channels(), 88);
        assert_eq!(heavy(12, 4).channels(), 12);
    }
}
