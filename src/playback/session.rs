//! Play/stop state machine with a background position tracker.
//!
//! The tracker thread wakes every poll interval, publishes the elapsed time,
//! and stops playback on its own once the end of the buffer is reached or the
//! device reports an error.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};

use super::output::{lock, AudioSink};
use super::types::{PlaybackEvent, PlaybackState, PlaybackStatus, StartOutcome};
use crate::audio::buffer::WaveformBuffer;
use crate::error::{CoreError, Result};

#[derive(Default)]
struct Tracked {
    state: PlaybackState,
    last_error: Option<String>,
}

struct Tracker {
    cancel_tx: Sender<()>,
    handle: JoinHandle<()>,
}

type Subscribers = Arc<Mutex<Vec<Sender<PlaybackEvent>>>>;

/// Playback of one loaded buffer
pub struct PlaybackSession {
    buffer: Arc<WaveformBuffer>,
    sink: Arc<Mutex<Box<dyn AudioSink>>>,
    shared: Arc<Mutex<Tracked>>,
    subscribers: Subscribers,
    tracker: Mutex<Option<Tracker>>,
    poll_interval: Duration,
}

impl PlaybackSession {
    pub fn new(buffer: Arc<WaveformBuffer>, sink: Box<dyn AudioSink>, poll_interval: Duration) -> Self {
        Self {
            buffer,
            sink: Arc::new(Mutex::new(sink)),
            shared: Arc::new(Mutex::new(Tracked::default())),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            tracker: Mutex::new(None),
            poll_interval,
        }
    }

    pub fn duration(&self) -> f64 {
        self.buffer.duration()
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Latest tracked position; frozen while stopped
    pub fn position(&self) -> PlaybackState {
        lock(&self.shared).state
    }

    pub fn is_playing(&self) -> bool {
        self.position().is_playing()
    }

    /// Last asynchronous device error, cleared on read
    pub fn take_error(&self) -> Option<String> {
        lock(&self.shared).last_error.take()
    }

    /// Receive position updates and end-of-playback notifications
    pub fn subscribe(&self) -> Receiver<PlaybackEvent> {
        let (tx, rx) = unbounded();
        lock(&self.subscribers).push(tx);
        rx
    }

    /// Start rendering from the first frame.
    ///
    /// A stopped session always restarts at zero rather than resuming.
    pub fn start(&self) -> Result<StartOutcome> {
        let mut tracker = lock(&self.tracker);

        if self.buffer.is_empty() {
            log::warn!("Nothing to play: buffer is empty");
            return Ok(StartOutcome::NoAudio);
        }
        if self.is_playing() {
            return Ok(StartOutcome::AlreadyPlaying);
        }
        // Reap a tracker that ended on its own (end of buffer or device error)
        if let Some(finished) = tracker.take() {
            let _ = finished.handle.join();
        }

        lock(&self.sink).play(self.buffer.clone())?;

        let started = Instant::now();
        {
            let mut shared = lock(&self.shared);
            shared.state = PlaybackState {
                status: PlaybackStatus::Playing,
                elapsed_seconds: 0.0,
            };
            shared.last_error = None;
            publish(&self.subscribers, PlaybackEvent::Position(shared.state));
        }

        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        let ctx = TrackerContext {
            cancel_rx,
            started,
            duration: self.duration(),
            interval: self.poll_interval,
            sink: self.sink.clone(),
            shared: self.shared.clone(),
            subscribers: self.subscribers.clone(),
        };

        let spawned = thread::Builder::new()
            .name("position-tracker".to_string())
            .spawn(move || ctx.run());

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                lock(&self.sink).halt();
                lock(&self.shared).state.status = PlaybackStatus::Stopped;
                return Err(CoreError::OutputDevice(format!(
                    "Failed to spawn position tracker: {}",
                    e
                )));
            }
        };

        *tracker = Some(Tracker { cancel_tx, handle });
        log::info!(
            "Playback started: {:.2}s at {}Hz",
            self.duration(),
            self.buffer.sample_rate()
        );
        Ok(StartOutcome::Started)
    }

    /// Halt rendering. Elapsed time keeps its last tracked value. No-op when stopped.
    pub fn stop(&self) {
        let mut tracker = lock(&self.tracker);
        let Some(active) = tracker.take() else {
            return;
        };

        let _ = active.cancel_tx.send(());
        let _ = active.handle.join();
        lock(&self.sink).halt();

        let mut shared = lock(&self.shared);
        if shared.state.is_playing() {
            shared.state.status = PlaybackStatus::Stopped;
            publish(&self.subscribers, PlaybackEvent::Position(shared.state));
            log::info!("Playback stopped at {:.2}s", shared.state.elapsed_seconds);
        }
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn publish(subscribers: &Subscribers, event: PlaybackEvent) {
    lock(subscribers).retain(|tx| tx.send(event.clone()).is_ok());
}

struct TrackerContext {
    cancel_rx: Receiver<()>,
    started: Instant,
    duration: f64,
    interval: Duration,
    sink: Arc<Mutex<Box<dyn AudioSink>>>,
    shared: Arc<Mutex<Tracked>>,
    subscribers: Subscribers,
}

impl TrackerContext {
    fn run(self) {
        loop {
            match self.cancel_rx.recv_timeout(self.interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
            }

            let elapsed = self.started.elapsed().as_secs_f64().min(self.duration);
            let device_error = lock(&self.sink).take_error();

            // Lock order: shared state before sink
            let mut shared = lock(&self.shared);
            if !shared.state.is_playing() {
                return;
            }
            shared.state.elapsed_seconds = shared.state.elapsed_seconds.max(elapsed);
            log::debug!("Playback position {:.2}s", shared.state.elapsed_seconds);

            if let Some(err) = device_error {
                log::warn!("Output device failed during playback: {}", err);
                lock(&self.sink).halt();
                shared.state.status = PlaybackStatus::Stopped;
                shared.last_error = Some(err.clone());
                publish(&self.subscribers, PlaybackEvent::DeviceError(err));
                return;
            }

            if elapsed >= self.duration {
                lock(&self.sink).halt();
                shared.state.status = PlaybackStatus::Stopped;
                publish(&self.subscribers, PlaybackEvent::Position(shared.state));
                publish(&self.subscribers, PlaybackEvent::Finished);
                log::info!("Playback finished after {:.2}s", self.duration);
                return;
            }

            publish(&self.subscribers, PlaybackEvent::Position(shared.state));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::PcmData;
    use crate::playback::output::{SilentSink, SinkProbe};

    const TICK: Duration = Duration::from_millis(10);

    fn session(frames: usize, probe: &SinkProbe) -> PlaybackSession {
        let buffer = WaveformBuffer::new(PcmData::I16(vec![0; frames]), 1, 8_000).unwrap();
        PlaybackSession::new(
            Arc::new(buffer),
            Box::new(SilentSink::with_probe(probe.clone())),
            TICK,
        )
    }

    fn wait_until_stopped(playback: &PlaybackSession, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        while Instant::now() < deadline {
            if !playback.is_playing() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn start_then_immediate_stop_leaves_position_near_zero() {
        let probe = SinkProbe::default();
        let playback = session(80_000, &probe);
        assert_eq!(playback.start().unwrap(), StartOutcome::Started);
        playback.stop();

        let state = playback.position();
        assert_eq!(state.status, PlaybackStatus::Stopped);
        assert!(state.elapsed_seconds <= TICK.as_secs_f64() * 2.0);
        assert_eq!(probe.halts(), 1);
        assert!(!probe.is_active());
    }

    #[test]
    fn stop_is_idempotent() {
        let probe = SinkProbe::default();
        let playback = session(800, &probe);
        playback.stop();
        playback.start().unwrap();
        playback.stop();
        playback.stop();
        assert_eq!(probe.halts(), 1);
        assert_eq!(playback.position().status, PlaybackStatus::Stopped);
    }

    #[test]
    fn empty_buffer_start_is_a_warning_not_an_error() {
        let probe = SinkProbe::default();
        let playback = session(0, &probe);
        assert_eq!(playback.start().unwrap(), StartOutcome::NoAudio);
        assert_eq!(probe.plays(), 0);
        assert!(!playback.is_playing());
    }

    #[test]
    fn second_start_while_playing_is_ignored() {
        let probe = SinkProbe::default();
        let playback = session(80_000, &probe);
        playback.start().unwrap();
        assert_eq!(playback.start().unwrap(), StartOutcome::AlreadyPlaying);
        assert_eq!(probe.plays(), 1);
    }

    #[test]
    fn position_is_monotonic_and_bounded_while_playing() {
        let probe = SinkProbe::default();
        let playback = session(2_400, &probe); // 0.3s
        playback.start().unwrap();

        let mut last = 0.0;
        for _ in 0..40 {
            let state = playback.position();
            assert!(state.elapsed_seconds >= last);
            assert!(state.elapsed_seconds <= playback.duration());
            last = state.elapsed_seconds;
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn auto_stops_at_end_of_buffer() {
        let probe = SinkProbe::default();
        let playback = session(400, &probe); // 50ms
        let events = playback.subscribe();
        playback.start().unwrap();

        assert!(wait_until_stopped(&playback, Duration::from_secs(2)));
        let state = playback.position();
        assert_eq!(state.elapsed_seconds, playback.duration());
        assert!(!probe.is_active());

        let received: Vec<PlaybackEvent> = events.try_iter().collect();
        assert_eq!(received.last(), Some(&PlaybackEvent::Finished));
    }

    #[test]
    fn restart_after_stop_begins_at_zero() {
        let probe = SinkProbe::default();
        let playback = session(400, &probe);
        playback.start().unwrap();
        assert!(wait_until_stopped(&playback, Duration::from_secs(2)));
        assert!(playback.position().elapsed_seconds > 0.0);

        let events = playback.subscribe();
        playback.start().unwrap();
        assert_eq!(
            events.try_recv().ok(),
            Some(PlaybackEvent::Position(PlaybackState {
                status: PlaybackStatus::Playing,
                elapsed_seconds: 0.0,
            }))
        );
        assert_eq!(probe.plays(), 2);
    }

    #[test]
    fn refused_device_leaves_session_stopped() {
        let probe = SinkProbe::default();
        probe.refuse_streams("no device");
        let playback = session(800, &probe);
        assert!(matches!(playback.start(), Err(CoreError::OutputDevice(_))));
        assert_eq!(playback.position(), PlaybackState::stopped());
    }

    #[test]
    fn device_error_mid_stream_stops_playback() {
        let probe = SinkProbe::default();
        let playback = session(80_000, &probe);
        let events = playback.subscribe();
        playback.start().unwrap();
        probe.inject_error("stream invalidated");

        assert!(wait_until_stopped(&playback, Duration::from_secs(2)));
        assert_eq!(playback.take_error().as_deref(), Some("stream invalidated"));
        assert!(!probe.is_active());
        assert!(events
            .try_iter()
            .any(|e| e == PlaybackEvent::DeviceError("stream invalidated".to_string())));
    }
}
