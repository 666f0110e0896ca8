//! # UI Module
//!
//! All UI components of the piano spectrum display.

pub mod level_bars;
pub mod main_display;
pub mod piano_keyboard;
