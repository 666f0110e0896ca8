//! # sdft-hex
//!
//! Headless front end: captures the default input device and prints one line
//! per level snapshot to stdout, two lowercase hex digits per key. LED bridges
//! (Adalight serial, WS281x over TCP) read this stream from a pipe.
//!
//! Logs go to stderr so stdout carries nothing but frames.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sdft_core::audio;
use sdft_core::SpectrumConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "sdft-hex")]
#[command(about = "Stream per-key piano levels as hex lines", long_about = None)]
struct Args {
    /// JSON configuration file; flags below override its values
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Number of keys to analyze
    #[arg(long, value_name = "KEYS")]
    key_count: Option<usize>,

    /// Key index tuned to the pitch fork (33 puts A4 on a 61-key C2..C7 keyboard)
    #[arg(long, value_name = "KEY")]
    reference_key: Option<i32>,

    /// Frequency of the reference key
    #[arg(long, value_name = "HZ")]
    pitch_fork: Option<f64>,

    /// Smoothing window
    #[arg(long, value_name = "SECONDS")]
    smoothing: Option<f64>,

    /// Frames per second written to stdout
    #[arg(long, value_name = "FPS")]
    fps: Option<f64>,
}

impl Args {
    fn to_config(&self) -> Result<SpectrumConfig> {
        let mut config = match &self.config {
            Some(path) => SpectrumConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => SpectrumConfig::default(),
        };
        if let Some(key_count) = self.key_count {
            config.key_count = key_count;
        }
        if let Some(reference_key) = self.reference_key {
            config.reference_key = reference_key;
        }
        if let Some(pitch_fork) = self.pitch_fork {
            config.pitch_fork = pitch_fork;
        }
        if let Some(smoothing) = self.smoothing {
            config.smoothing_seconds = smoothing;
        }
        if let Some(fps) = self.fps {
            config.update_interval_seconds = 1.0 / fps;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().to_config()?;

    let (frames_tx, frames_rx) = crossbeam_channel::bounded(8);
    // No runtime controls; the sender stays alive so the channel never disconnects.
    let (_control_tx, control_rx) = crossbeam_channel::unbounded();
    let capture = audio::start_capture(&config, frames_tx, control_rx)?;
    info!(
        sample_rate = capture.sample_rate,
        keys = config.key_count,
        "streaming levels to stdout"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut line = String::with_capacity(config.key_count * 2);

    for frame in frames_rx.iter() {
        line.clear();
        frame.write_hex(&mut line)?;
        if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
            // The reader went away (e.g. `| head`); that is a normal end.
            if e.kind() == io::ErrorKind::BrokenPipe {
                break;
            }
            return Err(e.into());
        }
        let _ = capture.recycler.try_send(frame.levels);
    }

    info!("stopping capture");
    Ok(())
}
