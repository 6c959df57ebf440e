use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PlaybackStatus {
    Stopped,
    Playing,
}

/// Snapshot of the playback position. `elapsed_seconds` stays within `[0, duration]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    pub elapsed_seconds: f64,
}

impl PlaybackState {
    pub fn stopped() -> Self {
        Self {
            status: PlaybackStatus::Stopped,
            elapsed_seconds: 0.0,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::stopped()
    }
}

/// Result of a `start()` request that did not fail
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// Nothing to play; the request was ignored
    NoAudio,
    AlreadyPlaying,
}

/// Published by the position tracker
#[derive(Clone, Debug, PartialEq)]
pub enum PlaybackEvent {
    Position(PlaybackState),
    /// Reached the end of the buffer and stopped on its own
    Finished,
    /// The output device failed mid-stream; playback is stopped
    DeviceError(String),
}
