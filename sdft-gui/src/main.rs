//! # Piano Spectrum - Live Per-Key Level Display
//!
//! The GUI for the sliding DFT analyzer. It shows one level bar per piano key,
//! a keyboard shaded by those levels and a readout for the strongest (or the
//! clicked) key.
//!
//! ## Architecture
//! - **Main Thread**: Iced GUI application with dark theme
//! - **Audio Thread**: Owns the CPAL stream; the analysis itself runs inside
//!   the stream callback
//! - **Communication**: Crossbeam channels for level snapshots and smoothing
//!   changes
//! - **Updates**: 60 FPS polling via the subscription system

mod ui;

use std::path::Path;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use iced::{self, Element, Subscription, Theme};
use sdft_core::{
    audio, BinSpec, EngineControl, LevelFrame, PianoTuning, SpectrumConfig,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use ui::main_display::create_main_view;

/// Where the session configuration is saved and loaded.
const CONFIG_PATH: &str = "sdft_config.json";
/// Snapshots queued between two UI ticks before the engine starts dropping them.
const FRAME_QUEUE_DEPTH: usize = 8;

pub fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("starting piano spectrum");
    iced::application("Piano Spectrum", SpectrumApp::update, SpectrumApp::view)
        .subscription(SpectrumApp::subscription)
        .theme(SpectrumApp::theme)
        .run()
}

#[derive(Debug, Clone)]
pub enum Message {
    /// User clicked a key on the keyboard; clicking it again releases it.
    KeySelected(usize),
    /// Smoothing slider moved, in seconds.
    SmoothingChanged(f64),

    SaveConfig,
    LoadConfig,

    ToggleLevelBars,
    ToggleKeyboard,
    ToggleReadout,

    Tick,
}

/// The keyboard layout the running engine was built with.
#[derive(Debug, Clone)]
pub struct KeyLayout {
    pub sample_rate: u32,
    pub bins: Vec<BinSpec>,
    pub names: Vec<String>,
}

impl KeyLayout {
    fn new(tuning: &PianoTuning, sample_rate: u32) -> anyhow::Result<Self> {
        let bins = tuning.mapping()?;
        let names = (0..tuning.key_count()).map(|key| tuning.note_name(key)).collect();
        Ok(Self {
            sample_rate,
            bins,
            names,
        })
    }
}

/// Everything the view needs, cloned out of the app state.
#[derive(Debug, Clone)]
pub struct AppDisplayData {
    pub layout: Option<KeyLayout>,
    pub levels: Vec<f32>,
    pub selected_key: Option<usize>,
    pub smoothing_seconds: f64,
    pub status: String,

    pub level_bars_visible: bool,
    pub keyboard_visible: bool,
    pub readout_visible: bool,
}

#[derive(Debug)]
struct SpectrumApp {
    config: SpectrumConfig,
    audio_worker: Option<AudioWorker>,
    /// Hands drawn snapshot buffers back to the audio thread.
    recycler: Option<Sender<Vec<f32>>>,
    display_data: AppDisplayData,
}

/// The audio thread and the channels wired to it.
#[derive(Debug)]
struct AudioWorker {
    shutdown_tx: Sender<()>,
    ready_rx: Receiver<Result<(u32, Sender<Vec<f32>>), String>>,
    frames_rx: Receiver<LevelFrame>,
    control_tx: Sender<EngineControl>,
    thread_handle: Option<JoinHandle<()>>,
}

impl AudioWorker {
    /// Spawns the thread that owns the capture stream.
    ///
    /// `cpal::Stream` cannot be moved between threads on every platform, so it
    /// is created, kept alive and dropped on the same dedicated thread. The
    /// thread reports the device sample rate (or the failure) on `ready_rx`.
    fn spawn(config: SpectrumConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let (frames_tx, frames_rx) = crossbeam_channel::bounded(FRAME_QUEUE_DEPTH);
        let (control_tx, control_rx) = crossbeam_channel::unbounded();

        let thread_handle = thread::spawn(move || {
            let stream = match audio::start_capture(&config, frames_tx, control_rx) {
                Ok(capture) => {
                    let _ = ready_tx.send(Ok((capture.sample_rate, capture.recycler)));
                    capture.stream
                }
                Err(e) => {
                    error!("failed to start audio capture: {:#}", e);
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
            };

            // Either a shutdown signal or the app dropping its sender ends the session.
            let _ = shutdown_rx.recv();
            drop(stream);
            info!("audio thread finished");
        });

        Self {
            shutdown_tx,
            ready_rx,
            frames_rx,
            control_tx,
            thread_handle: Some(thread_handle),
        }
    }
}

impl Drop for AudioWorker {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                warn!("audio thread panicked");
            }
        }
    }
}

impl Default for SpectrumApp {
    fn default() -> Self {
        let config = if Path::new(CONFIG_PATH).exists() {
            match SpectrumConfig::load(CONFIG_PATH) {
                Ok(config) => config,
                Err(e) => {
                    warn!("ignoring {}: {}", CONFIG_PATH, e);
                    SpectrumConfig::default()
                }
            }
        } else {
            SpectrumConfig::default()
        };

        let mut app = Self {
            display_data: AppDisplayData {
                layout: None,
                levels: Vec::new(),
                selected_key: None,
                smoothing_seconds: config.smoothing_seconds,
                status: "Starting audio...".to_string(),
                level_bars_visible: true,
                keyboard_visible: true,
                readout_visible: true,
            },
            config,
            audio_worker: None,
            recycler: None,
        };
        app.restart_audio();
        app
    }
}

impl SpectrumApp {
    /// Stops the current session, if any, and starts a new one with `self.config`.
    fn restart_audio(&mut self) {
        self.audio_worker = None;
        self.recycler = None;
        self.display_data.layout = None;
        self.display_data.levels.clear();
        self.display_data.selected_key = None;
        self.display_data.smoothing_seconds = self.config.smoothing_seconds;
        self.audio_worker = Some(AudioWorker::spawn(self.config.clone()));
    }

    fn update(&mut self, message: Message) {
        match message {
            Message::KeySelected(key) => {
                self.display_data.selected_key = if self.display_data.selected_key == Some(key) {
                    None
                } else {
                    Some(key)
                };
            }
            Message::SmoothingChanged(seconds) => {
                self.display_data.smoothing_seconds = seconds;
                self.config.smoothing_seconds = seconds;
                if let Some(worker) = &self.audio_worker {
                    let _ = worker.control_tx.send(EngineControl::SetSmoothing(seconds));
                }
            }
            Message::SaveConfig => match self.config.save(CONFIG_PATH) {
                Ok(()) => {
                    info!("saved configuration to {}", CONFIG_PATH);
                    self.display_data.status = format!("Saved {}", CONFIG_PATH);
                }
                Err(e) => {
                    error!("failed to save configuration: {}", e);
                    self.display_data.status = e.to_string();
                }
            },
            Message::LoadConfig => match SpectrumConfig::load(CONFIG_PATH) {
                Ok(config) => {
                    info!("loaded configuration from {}", CONFIG_PATH);
                    self.config = config;
                    self.display_data.status = "Restarting audio...".to_string();
                    self.restart_audio();
                }
                Err(e) => {
                    error!("failed to load configuration: {}", e);
                    self.display_data.status = e.to_string();
                }
            },
            Message::ToggleLevelBars => {
                self.display_data.level_bars_visible = !self.display_data.level_bars_visible;
            }
            Message::ToggleKeyboard => {
                self.display_data.keyboard_visible = !self.display_data.keyboard_visible;
            }
            Message::ToggleReadout => {
                self.display_data.readout_visible = !self.display_data.readout_visible;
            }
            Message::Tick => self.poll_audio(),
        }
    }

    /// Picks up the session start result and the newest level snapshot.
    fn poll_audio(&mut self) {
        let Some(worker) = &self.audio_worker else {
            return;
        };

        if let Ok(ready) = worker.ready_rx.try_recv() {
            match ready.map_err(anyhow::Error::msg).and_then(|(sample_rate, recycler)| {
                let tuning = self.config.tuning(f64::from(sample_rate))?;
                Ok((KeyLayout::new(&tuning, sample_rate)?, recycler))
            }) {
                Ok((layout, recycler)) => {
                    self.display_data.status = format!("Listening at {} Hz", layout.sample_rate);
                    self.display_data.layout = Some(layout);
                    self.recycler = Some(recycler);
                }
                Err(e) => {
                    self.display_data.status = format!("Audio unavailable: {}", e);
                }
            }
        }

        // Only the newest snapshot matters for drawing; every other buffer
        // goes straight back to the engine.
        for frame in worker.frames_rx.try_iter() {
            let previous = std::mem::replace(&mut self.display_data.levels, frame.levels);
            // The initial empty vector would make the engine allocate; keep it out of the pool.
            if let Some(recycler) = &self.recycler {
                if previous.capacity() >= self.display_data.levels.len() {
                    let _ = recycler.try_send(previous);
                }
            }
        }
    }

    fn view(&self) -> Element<'_, Message> {
        create_main_view(&self.display_data)
    }

    /// A timer that fires every 16ms (60 FPS) to poll the audio thread.
    fn subscription(&self) -> Subscription<Message> {
        iced::time::every(std::time::Duration::from_millis(16)).map(|_| Message::Tick)
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}
