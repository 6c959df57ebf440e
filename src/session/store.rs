use std::sync::Arc;

use crate::audio::buffer::WaveformBuffer;
use crate::config::PlaybackConfig;
use crate::playback::{PlaybackSession, PlaybackState, SinkFactory};

/// A loaded waveform with its playback
pub struct Session {
    buffer: Arc<WaveformBuffer>,
    source_file_name: Option<String>,
    playback: PlaybackSession,
}

impl Session {
    pub fn buffer(&self) -> &Arc<WaveformBuffer> {
        &self.buffer
    }

    pub fn source_file_name(&self) -> Option<&str> {
        self.source_file_name.as_deref()
    }

    pub fn playback(&self) -> &PlaybackSession {
        &self.playback
    }

    pub fn duration(&self) -> f64 {
        self.buffer.duration()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback.position()
    }
}

/// Holds at most one [`Session`]; a new load replaces the previous one wholesale.
pub struct SessionStore {
    current: Option<Session>,
    sink_factory: SinkFactory,
    playback: PlaybackConfig,
}

impl SessionStore {
    pub fn new(sink_factory: SinkFactory, playback: PlaybackConfig) -> Self {
        Self {
            current: None,
            sink_factory,
            playback,
        }
    }

    /// Install `buffer` as the current session.
    ///
    /// The previous session's playback is stopped and its device released
    /// before the new session becomes visible.
    pub fn load(&mut self, buffer: WaveformBuffer, source_file_name: Option<String>) -> &Session {
        self.clear();

        let buffer = Arc::new(buffer);
        let playback = PlaybackSession::new(
            buffer.clone(),
            (self.sink_factory)(),
            self.playback.poll_interval(),
        );

        log::info!(
            "Loaded {} ({:.2}s, {}Hz, {} ch, {})",
            source_file_name.as_deref().unwrap_or("<unnamed>"),
            buffer.duration(),
            buffer.sample_rate(),
            buffer.channels(),
            buffer.sample_format()
        );

        self.current.insert(Session {
            buffer,
            source_file_name,
            playback,
        })
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.is_some()
    }

    /// Stop any playback and drop the current session
    pub fn clear(&mut self) {
        if let Some(old) = self.current.take() {
            old.playback.stop();
            log::debug!(
                "Released session {}",
                old.source_file_name.as_deref().unwrap_or("<unnamed>")
            );
        }
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::PcmData;
    use crate::playback::{PlaybackStatus, SilentSink, SinkProbe};

    fn store(probe: &SinkProbe) -> SessionStore {
        SessionStore::new(SilentSink::factory(probe.clone()), PlaybackConfig { poll_interval_ms: 10 })
    }

    fn buffer(frames: usize, rate: u32) -> WaveformBuffer {
        WaveformBuffer::new(PcmData::I16(vec![1; frames]), 1, rate).unwrap()
    }

    #[test]
    fn starts_empty() {
        let store = store(&SinkProbe::default());
        assert!(store.current().is_none());
        assert!(!store.is_loaded());
    }

    #[test]
    fn second_load_replaces_first_and_stops_its_playback() {
        let probe = SinkProbe::default();
        let mut store = store(&probe);

        let first = store.load(buffer(80_000, 8_000), Some("first.txt".into()));
        first.playback().start().unwrap();
        assert!(probe.is_active());

        let second = store.load(buffer(4_000, 16_000), Some("second.txt".into()));
        assert_eq!(second.source_file_name(), Some("second.txt"));
        assert_eq!(second.buffer().sample_rate(), 16_000);
        assert_eq!(second.playback_state().status, PlaybackStatus::Stopped);
        assert_eq!(second.playback_state().elapsed_seconds, 0.0);
        assert_eq!(probe.halts(), 1);
        assert!(!probe.is_active());
    }

    #[test]
    fn clear_releases_playback() {
        let probe = SinkProbe::default();
        let mut store = store(&probe);
        store.load(buffer(80_000, 8_000), None).playback().start().unwrap();
        store.clear();
        assert!(store.current().is_none());
        assert!(!probe.is_active());
    }
}
