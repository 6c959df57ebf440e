//! Base64 waveform ingest, spectrogram analysis and tracked playback.

pub mod audio;
pub mod config;
pub mod encode;
pub mod error;
pub mod playback;
pub mod session;

pub use error::{CoreError, Result};
