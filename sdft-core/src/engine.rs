//! # Analysis Engine Module
//!
//! The glue between an audio callback and the [`SlidingSpectrum`].
//!
//! The audio backend calls [`SpectrumEngine::process_interleaved`] once per
//! block, on its own real-time thread. The engine:
//! 1. Mixes every input channel into one mono scratch buffer
//! 2. Runs the spectrum over the block with the current smoothing window
//! 3. Publishes a copy of the levels to the UI at a throttled rate
//!
//! Block lengths may change from one callback to the next. Snapshots are sent
//! with `try_send` so a slow UI never blocks the audio thread; when the channel
//! is full the snapshot is dropped.
//!
//! Snapshot buffers come from a small pool. Consumers hand them back through
//! [`SpectrumEngine::recycler`] so that, in steady state, publishing does not
//! allocate on the audio thread.

use std::fmt;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::info;

use crate::config::{MAX_SMOOTHING_SECONDS, SpectrumConfig};
use crate::error::ConfigError;
use crate::spectrum::SlidingSpectrum;
use crate::tuning::PianoTuning;

/// Messages from the UI thread to the audio thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineControl {
    /// New smoothing window in seconds.
    SetSmoothing(f64),
}

/// Snapshot buffers preallocated per engine.
pub const FRAME_POOL_SIZE: usize = 4;

/// A copy of the levels, published to the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelFrame {
    /// Stream time of the start of the block that produced the levels, in seconds.
    pub time: f64,
    /// One level per key, in ascending key order.
    pub levels: Vec<f32>,
}

impl LevelFrame {
    /// Writes the levels as two lowercase hex digits per key, each level
    /// scaled from `[0, 1]` to `0..=255`.
    ///
    /// This is the line format LED bridges read from stdin, one frame per line.
    pub fn write_hex(&self, out: &mut impl fmt::Write) -> fmt::Result {
        for &level in &self.levels {
            write!(out, "{:02x}", level_to_byte(level))?;
        }
        Ok(())
    }

    pub fn to_hex(&self) -> String {
        let mut line = String::with_capacity(self.levels.len() * 2);
        // Writing into a String cannot fail.
        let _ = self.write_hex(&mut line);
        line
    }
}

/// Scales a level to a byte, rounding to nearest. Out-of-range values are
/// clamped and NaN maps to 0.
pub fn level_to_byte(level: f32) -> u8 {
    if level.is_nan() {
        return 0;
    }
    (level.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Owns the spectrum and everything the audio callback needs around it.
#[derive(Debug)]
pub struct SpectrumEngine {
    spectrum: SlidingSpectrum,
    tuning: PianoTuning,
    scratch: Vec<f32>,
    smoothing_seconds: f64,
    update_interval: f64,
    next_update_time: f64,
    frames_processed: u64,
    dropped_frames: u64,
    fresh_allocations: u64,
    sender: Sender<LevelFrame>,
    recycle_tx: Sender<Vec<f32>>,
    recycle_rx: Receiver<Vec<f32>>,
    spare: Option<Vec<f32>>,
}

impl SpectrumEngine {
    /// Builds the engine for a device running at `sample_rate`.
    ///
    /// # Arguments
    /// * `config` - Session configuration
    /// * `sample_rate` - Device sample rate in Hz
    /// * `sender` - Channel the level snapshots are published on
    pub fn new(
        config: &SpectrumConfig,
        sample_rate: f64,
        sender: Sender<LevelFrame>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let tuning = config.tuning(sample_rate)?;
        let spectrum = SlidingSpectrum::new(&tuning, config.smoothing_mode())?;

        let keys = spectrum.len();
        let (recycle_tx, recycle_rx) = crossbeam_channel::bounded(FRAME_POOL_SIZE * 2);
        for _ in 0..FRAME_POOL_SIZE {
            let _ = recycle_tx.try_send(Vec::with_capacity(keys));
        }

        info!(
            sample_rate,
            keys,
            smoothing = ?config.smoothing_mode(),
            "sliding DFT engine ready"
        );

        Ok(Self {
            spectrum,
            tuning,
            scratch: Vec::new(),
            smoothing_seconds: config.smoothing_seconds,
            update_interval: config.update_interval_seconds,
            next_update_time: 0.0,
            frames_processed: 0,
            dropped_frames: 0,
            fresh_allocations: 0,
            sender,
            recycle_tx,
            recycle_rx,
            spare: None,
        })
    }

    /// Processes one block of interleaved samples.
    ///
    /// # Arguments
    /// * `data` - `frames * channels` samples, frame by frame
    /// * `channels` - Number of interleaved channels; 0 means no input is connected
    pub fn process_interleaved(&mut self, data: &[f32], channels: usize) {
        if channels == 0 || data.is_empty() {
            return;
        }
        let frames = data.len() / channels;
        if self.scratch.len() != frames {
            self.scratch.resize(frames, 0.0);
        }

        // The spectrum zeroes each slot as it consumes it, so the scratch
        // buffer is clean before we accumulate into it.
        for (mono, frame) in self.scratch.iter_mut().zip(data.chunks_exact(channels)) {
            for &sample in frame {
                *mono += sample;
            }
        }

        let current_time = self.current_time();
        let levels = self.spectrum.process(&mut self.scratch, self.smoothing_seconds);
        self.frames_processed += frames as u64;

        if self.next_update_time <= current_time {
            self.next_update_time = current_time + self.update_interval;

            let mut buffer = match self.spare.take().or_else(|| self.recycle_rx.try_recv().ok()) {
                Some(buffer) => buffer,
                None => {
                    self.fresh_allocations += 1;
                    Vec::with_capacity(levels.len())
                }
            };
            buffer.clear();
            buffer.extend_from_slice(levels);

            let frame = LevelFrame {
                time: current_time,
                levels: buffer,
            };
            match self.sender.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(frame)) => {
                    self.dropped_frames += 1;
                    self.spare = Some(frame.levels);
                }
                Err(TrySendError::Disconnected(frame)) => self.spare = Some(frame.levels),
            }
        }
    }

    /// Channel for handing `LevelFrame::levels` back once a consumer is done
    /// with them.
    ///
    /// Send with `try_send`: the return channel is bounded, and a buffer that
    /// does not fit can simply be dropped.
    pub fn recycler(&self) -> Sender<Vec<f32>> {
        self.recycle_tx.clone()
    }

    /// Sets the smoothing window, clamped to `[0, MAX_SMOOTHING_SECONDS]`.
    pub fn set_smoothing_seconds(&mut self, seconds: f64) {
        self.smoothing_seconds = if seconds.is_nan() {
            0.0
        } else {
            seconds.clamp(0.0, MAX_SMOOTHING_SECONDS)
        };
    }

    /// Applies every control message waiting on `controls` without blocking.
    pub fn apply_controls(&mut self, controls: &Receiver<EngineControl>) {
        for control in controls.try_iter() {
            match control {
                EngineControl::SetSmoothing(seconds) => self.set_smoothing_seconds(seconds),
            }
        }
    }

    /// Stream time at the start of the next block, in seconds.
    pub fn current_time(&self) -> f64 {
        self.frames_processed as f64 / self.spectrum.sample_rate()
    }

    pub fn smoothing_seconds(&self) -> f64 {
        self.smoothing_seconds
    }

    /// Snapshots dropped because the UI was not keeping up.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    /// Snapshot buffers allocated on the audio thread because the pool was empty.
    pub fn fresh_allocations(&self) -> u64 {
        self.fresh_allocations
    }

    pub fn spectrum(&self) -> &SlidingSpectrum {
        &self.spectrum
    }

    pub fn tuning(&self) -> &PianoTuning {
        &self.tuning
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::SmoothingMode;
    use std::f64::consts::PI;

    fn config() -> SpectrumConfig {
        SpectrumConfig {
            key_count: 24,
            reference_key: 12,
            max_smoothing_seconds: 0.0,
            smoothing_seconds: 0.0,
            update_interval_seconds: 0.01,
            ..Default::default()
        }
    }

    fn tone(frequency: f64, amplitude: f64, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (amplitude * (2.0 * PI * frequency * i as f64 / 8000.0).sin()) as f32)
            .collect()
    }

    #[test]
    fn test_mixdown_sums_channels() {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let mut engine = SpectrumEngine::new(&config(), 8000.0, tx).unwrap();

        let left = tone(440.0, 0.4, 2000);
        let right = tone(523.25, 0.3, 2000);
        let interleaved: Vec<f32> = left.iter().zip(&right).flat_map(|(&l, &r)| [l, r]).collect();

        // Variable block lengths, as some hosts deliver them.
        let mut offset = 0;
        for frames in [128usize, 128, 100, 7, 512, 1].iter().cycle() {
            if offset >= left.len() {
                break;
            }
            let end = (offset + frames).min(left.len());
            engine.process_interleaved(&interleaved[offset * 2..end * 2], 2);
            offset = end;
        }

        let tuning = config().tuning(8000.0).unwrap();
        let mut reference = SlidingSpectrum::new(&tuning, SmoothingMode::None).unwrap();
        let mut mono: Vec<f32> = left.iter().zip(&right).map(|(l, r)| l + r).collect();
        let expected = reference.process(&mut mono, 0.0);

        assert_eq!(engine.spectrum().levels(), expected);
        assert!((engine.current_time() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_publishes_at_throttled_rate() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut engine = SpectrumEngine::new(&config(), 8000.0, tx).unwrap();

        let block = tone(440.0, 0.5, 32);
        for _ in 0..250 {
            engine.process_interleaved(&block, 1);
        }

        let frames: Vec<LevelFrame> = rx.try_iter().collect();
        assert_eq!(frames[0].time, 0.0);
        assert!(
            frames.len() >= 60 && frames.len() <= 101,
            "published {} frames in one second",
            frames.len()
        );
        for pair in frames.windows(2) {
            assert!(pair[1].time - pair[0].time >= 0.01 - 1e-9);
        }
        assert!(frames.iter().all(|frame| frame.levels.len() == 24));
    }

    #[test]
    fn test_full_channel_drops_frames() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let mut engine = SpectrumEngine::new(&config(), 8000.0, tx).unwrap();

        let block = vec![0.1f32; 160];
        for _ in 0..5 {
            engine.process_interleaved(&block, 1);
        }
        assert_eq!(rx.try_iter().count(), 1);
        assert_eq!(engine.dropped_frames(), 4);
    }

    #[test]
    fn test_recycled_buffers_avoid_allocation() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let mut engine = SpectrumEngine::new(&config(), 8000.0, tx).unwrap();
        let recycler = engine.recycler();

        let block = tone(440.0, 0.5, 160);
        for _ in 0..50 {
            engine.process_interleaved(&block, 1);
            let frame = rx.try_recv().unwrap();
            assert_eq!(frame.levels.len(), 24);
            recycler.try_send(frame.levels).unwrap();
        }
        assert_eq!(engine.fresh_allocations(), 0);
        assert_eq!(engine.dropped_frames(), 0);
    }

    #[test]
    fn test_pool_runs_dry_without_recycling() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut engine = SpectrumEngine::new(&config(), 8000.0, tx).unwrap();

        let block = vec![0.1f32; 160];
        for _ in 0..10 {
            engine.process_interleaved(&block, 1);
        }
        assert_eq!(rx.try_iter().count(), 10);
        assert_eq!(engine.fresh_allocations(), (10 - FRAME_POOL_SIZE) as u64);
    }

    #[test]
    fn test_dropped_frame_buffer_is_reused() {
        let (tx, _rx) = crossbeam_channel::bounded(1);
        let mut engine = SpectrumEngine::new(&config(), 8000.0, tx).unwrap();

        let block = vec![0.1f32; 160];
        for _ in 0..20 {
            engine.process_interleaved(&block, 1);
        }
        // One frame sits in the channel; every later one bounces back as the spare.
        assert_eq!(engine.dropped_frames(), 19);
        assert_eq!(engine.fresh_allocations(), 0);
    }

    #[test]
    fn test_hex_line_format() {
        let frame = LevelFrame {
            time: 0.0,
            levels: vec![0.0, 1.0, 0.5],
        };
        assert_eq!(frame.to_hex(), "00ff80");

        let mut line = String::from(">");
        frame.write_hex(&mut line).unwrap();
        assert_eq!(line, ">00ff80");
    }

    #[test]
    fn test_level_to_byte_clamps() {
        assert_eq!(level_to_byte(0.0), 0x00);
        assert_eq!(level_to_byte(1.0), 0xff);
        assert_eq!(level_to_byte(0.1), 26);
        assert_eq!(level_to_byte(-0.5), 0x00);
        assert_eq!(level_to_byte(2.0), 0xff);
        assert_eq!(level_to_byte(f32::NAN), 0x00);

        let frame = LevelFrame {
            time: 1.0,
            levels: vec![0.25; 61],
        };
        let line = frame.to_hex();
        assert_eq!(line.len(), 122);
        assert!(line.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_no_input_is_ignored() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut engine = SpectrumEngine::new(&config(), 8000.0, tx).unwrap();
        engine.process_interleaved(&[0.5; 64], 0);
        engine.process_interleaved(&[], 2);
        assert_eq!(engine.current_time(), 0.0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_smoothing_controls() {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let mut engine = SpectrumEngine::new(&SpectrumConfig::default(), 44100.0, tx).unwrap();
        assert_eq!(engine.smoothing_seconds(), 0.05);

        let (control_tx, control_rx) = crossbeam_channel::unbounded();
        control_tx.send(EngineControl::SetSmoothing(0.1)).unwrap();
        control_tx.send(EngineControl::SetSmoothing(0.2)).unwrap();
        engine.apply_controls(&control_rx);
        assert_eq!(engine.smoothing_seconds(), 0.2);

        engine.set_smoothing_seconds(3.0);
        assert_eq!(engine.smoothing_seconds(), MAX_SMOOTHING_SECONDS);
        engine.set_smoothing_seconds(-1.0);
        assert_eq!(engine.smoothing_seconds(), 0.0);
        engine.set_smoothing_seconds(f64::NAN);
        assert_eq!(engine.smoothing_seconds(), 0.0);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let (tx, _rx) = crossbeam_channel::unbounded();
        assert!(SpectrumEngine::new(&SpectrumConfig::default(), 0.0, tx.clone()).is_err());
        let config = SpectrumConfig {
            key_count: 0,
            ..Default::default()
        };
        assert!(SpectrumEngine::new(&config, 44100.0, tx).is_err());
    }
}
