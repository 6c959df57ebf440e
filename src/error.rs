//! Error types for wavescope
//!
//! Every core operation returns [`Result`]; the binary wraps these with anyhow.

use thiserror::Error;

/// Error kinds surfaced by the decode, analysis, playback and save paths
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Malformed waveform container: {0}")]
    ContainerFormat(String),

    #[error("Cannot analyze an empty signal")]
    EmptySignal,

    #[error("Output device error: {0}")]
    OutputDevice(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<hound::Error> for CoreError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => CoreError::Io(io),
            hound::Error::FormatError(msg) => CoreError::ContainerFormat(msg.to_string()),
            hound::Error::Unsupported => {
                CoreError::ContainerFormat("unsupported sample format".to_string())
            }
            other => CoreError::ContainerFormat(other.to_string()),
        }
    }
}

/// Result type alias for wavescope
pub type Result<T> = std::result::Result<T, CoreError>;
