//! # Audio Capture Module
//!
//! Real-time input through CPAL (Cross-Platform Audio Library), feeding a
//! [`SpectrumEngine`] directly from the audio callback.
//!
//! ## Features
//! - Default input device selection
//! - 32-bit float stream, as close to 44.1 kHz as the device allows
//! - Any channel count; channels are mixed down to mono by the engine
//! - Smoothing changes from the UI applied between callbacks

use anyhow::{Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};
use tracing::{error, info};

use crate::config::SpectrumConfig;
use crate::engine::{EngineControl, LevelFrame, SpectrumEngine};

/// Preferred device sample rate in Hz.
pub const TARGET_SAMPLE_RATE: u32 = 44100;

/// A running capture session. Dropping `stream` stops the analysis.
pub struct Capture {
    pub stream: cpal::Stream,
    /// Rate the device actually runs at, in Hz.
    pub sample_rate: u32,
    /// Hands consumed snapshot buffers back to the engine.
    pub recycler: Sender<Vec<f32>>,
}

/// Starts analysing the default input device.
///
/// The engine is built for the rate the device actually runs at and is moved
/// into the audio callback, which owns it from then on.
///
/// # Arguments
/// * `config` - Session configuration
/// * `frames` - Channel the level snapshots are published on
/// * `controls` - Channel the UI sends smoothing changes on
///
/// # Returns
/// * `Ok(capture)` - Running stream handle, its sample rate and the buffer recycler
/// * `Err(e)` - No usable device, or the configuration is invalid for its rate
pub fn start_capture(
    config: &SpectrumConfig,
    frames: Sender<LevelFrame>,
    controls: Receiver<EngineControl>,
) -> Result<Capture> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    info!(device = %device.name()?, "using audio input device");

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, TARGET_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let sample_rate = TARGET_SAMPLE_RATE.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let stream_config: cpal::StreamConfig = supported_config
        .with_sample_rate(cpal::SampleRate(sample_rate))
        .into();
    let channels = usize::from(stream_config.channels);

    info!(sample_rate, channels, "selected input format");

    let mut engine = SpectrumEngine::new(config, f64::from(sample_rate), frames)?;
    let recycler = engine.recycler();

    let err_fn = |err| error!("an error occurred on the audio stream: {}", err);

    let stream = device.build_input_stream(
        &stream_config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            engine.apply_controls(&controls);
            engine.process_interleaved(data, channels);
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok(Capture {
        stream,
        sample_rate,
        recycler,
    })
}

/// Picks the f32 input configuration closest to `target_rate`, preferring
/// fewer channels when several ranges are equally close.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32 && c.channels() > 0)
        .min_by_key(|c| {
            let rate = target_rate.clamp(c.min_sample_rate().0, c.max_sample_rate().0);
            (rate.abs_diff(target_rate), c.channels())
        })
}
