//! Operations exposed to the presentation layer.

use std::path::Path;

use super::store::{Session, SessionStore};
use crate::audio::analysis::analyze;
use crate::audio::decode::decode_file;
use crate::audio::spectrogram::SpectrogramResult;
use crate::config::AnalysisConfig;
use crate::encode::wav::encode;
use crate::error::Result;
use crate::playback::{PlaybackState, StartOutcome};

/// Read a base64 text file, decode it and make it the current session.
///
/// Any failure leaves the previously loaded session in place.
pub fn select_and_load<'a>(store: &'a mut SessionStore, path: &Path) -> Result<&'a Session> {
    let buffer = decode_file(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());
    Ok(store.load(buffer, name))
}

/// Spectrogram and profiles for display. Fails with `EmptySignal` on zero-length audio.
pub fn request_visualization(session: &Session, config: &AnalysisConfig) -> Result<SpectrogramResult> {
    analyze(session.buffer(), config)
}

/// Start when stopped, stop when playing. Returns the resulting state.
pub fn toggle_playback(session: &Session) -> Result<PlaybackState> {
    let playback = session.playback();
    if playback.is_playing() {
        playback.stop();
    } else if playback.start()? == StartOutcome::NoAudio {
        log::warn!("No audio to play");
    }
    Ok(playback.position())
}

/// Write the session's audio to `destination` in its original sample format
pub fn save_as(session: &Session, destination: &Path) -> Result<()> {
    encode(session.buffer(), destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::{PcmData, WaveformBuffer};
    use crate::config::PlaybackConfig;
    use crate::encode::wav::encode_to_base64;
    use crate::error::CoreError;
    use crate::playback::{PlaybackStatus, SilentSink, SinkProbe};

    fn store() -> SessionStore {
        SessionStore::new(SilentSink::factory(SinkProbe::default()), PlaybackConfig { poll_interval_ms: 10 })
    }

    fn write_b64(dir: &Path, name: &str, buffer: &WaveformBuffer) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, encode_to_base64(buffer).unwrap()).unwrap();
        path
    }

    #[test]
    fn load_names_session_after_file_base_name() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = WaveformBuffer::new(PcmData::I16(vec![3; 100]), 1, 8_000).unwrap();
        let path = write_b64(dir.path(), "clip.txt", &buffer);

        let mut store = store();
        let session = select_and_load(&mut store, &path).unwrap();
        assert_eq!(session.source_file_name(), Some("clip.txt"));
        assert_eq!(**session.buffer(), buffer);
    }

    #[test]
    fn failed_load_keeps_previous_session() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = WaveformBuffer::new(PcmData::I16(vec![3; 100]), 1, 8_000).unwrap();
        let good = write_b64(dir.path(), "good.txt", &buffer);
        let bad = dir.path().join("bad.txt");
        std::fs::write(&bad, "not base64 !!").unwrap();

        let mut store = store();
        select_and_load(&mut store, &good).unwrap();
        assert!(matches!(select_and_load(&mut store, &bad), Err(CoreError::Decode(_))));
        assert!(matches!(
            select_and_load(&mut store, &dir.path().join("missing.txt")),
            Err(CoreError::Io(_))
        ));
        assert_eq!(store.current().unwrap().source_file_name(), Some("good.txt"));
    }

    #[test]
    fn toggle_alternates_between_states() {
        let mut store = store();
        let session = store.load(WaveformBuffer::new(PcmData::I16(vec![0; 80_000]), 1, 8_000).unwrap(), None);
        assert_eq!(toggle_playback(session).unwrap().status, PlaybackStatus::Playing);
        assert_eq!(toggle_playback(session).unwrap().status, PlaybackStatus::Stopped);
    }

    #[test]
    fn toggle_on_empty_audio_stays_stopped() {
        let mut store = store();
        let session = store.load(WaveformBuffer::new(PcmData::F32(vec![]), 1, 8_000).unwrap(), None);
        assert_eq!(toggle_playback(session).unwrap().status, PlaybackStatus::Stopped);
        assert!(matches!(
            request_visualization(session, &AnalysisConfig::default()),
            Err(CoreError::EmptySignal)
        ));
    }

    #[test]
    fn save_then_reload_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = WaveformBuffer::new(PcmData::I24(vec![-40_000, 12, 8_000_000, 7]), 2, 44_100).unwrap();
        let mut store = store();
        let session = store.load(buffer.clone(), None);
        let wav = dir.path().join("saved.wav");
        save_as(session, &wav).unwrap();

        let reread = crate::audio::decode::decode_bytes(&std::fs::read(&wav).unwrap()).unwrap();
        assert_eq!(reread, buffer);
    }
}
