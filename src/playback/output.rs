//! Output devices
//!
//! [`CpalSink`] renders through the default cpal output device on a dedicated
//! thread, since cpal streams may be `!Send`. [`SilentSink`] accepts buffers
//! without producing sound, for headless runs and tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Sender};

use crate::audio::buffer::WaveformBuffer;
use crate::error::{CoreError, Result};

/// Something that can render a [`WaveformBuffer`] at its native rate
pub trait AudioSink: Send {
    /// Begin rendering `buffer` from its first frame, replacing anything already playing.
    ///
    /// Returns once the device has accepted (or refused) the stream.
    fn play(&mut self, buffer: Arc<WaveformBuffer>) -> Result<()>;

    /// Stop producing sound. Safe to call when idle.
    fn halt(&mut self);

    /// Error reported by the device since the last call, if any
    fn take_error(&mut self) -> Option<String>;
}

/// Builds a fresh sink for every loaded session
pub type SinkFactory = Box<dyn Fn() -> Box<dyn AudioSink> + Send + Sync>;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct OutputThread {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Plays through the host's default output device
#[derive(Default)]
pub struct CpalSink {
    worker: Option<OutputThread>,
    error_slot: Arc<Mutex<Option<String>>>,
}

impl CpalSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory() -> SinkFactory {
        Box::new(|| Box::new(CpalSink::new()))
    }

    fn run(
        buffer: Arc<WaveformBuffer>,
        error_slot: Arc<Mutex<Option<String>>>,
    ) -> std::result::Result<cpal::Stream, String> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or("No audio output device found")?;

        let config = cpal::StreamConfig {
            channels: buffer.channels(),
            sample_rate: cpal::SampleRate(buffer.sample_rate()),
            buffer_size: cpal::BufferSize::Default,
        };

        log::info!(
            "Audio output: {} @ {}Hz, {} ch",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            buffer.sample_rate(),
            buffer.channels()
        );

        let total = buffer.samples().len();
        let mut cursor = 0usize;
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let samples = buffer.samples();
                    for out in data.iter_mut() {
                        *out = if cursor < total {
                            samples.get_unit_f32(cursor)
                        } else {
                            0.0
                        };
                        cursor = (cursor + 1).min(total);
                    }
                },
                move |err| {
                    log::error!("Audio stream error: {}", err);
                    *lock(&error_slot) = Some(err.to_string());
                },
                None,
            )
            .map_err(|e| format!("Failed to build audio stream: {}", e))?;

        stream
            .play()
            .map_err(|e| format!("Failed to start audio stream: {}", e))?;

        Ok(stream)
    }
}

impl AudioSink for CpalSink {
    fn play(&mut self, buffer: Arc<WaveformBuffer>) -> Result<()> {
        self.halt();
        lock(&self.error_slot).take();

        let (init_tx, init_rx) = bounded::<std::result::Result<(), String>>(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let error_slot = self.error_slot.clone();

        let handle = thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                let stream = match Self::run(buffer, error_slot) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = init_tx.send(Err(e));
                        return;
                    }
                };
                let _ = init_tx.send(Ok(()));
                // Keep the stream alive until halted or the sink is dropped
                let _ = stop_rx.recv();
                drop(stream);
            })
            .map_err(|e| CoreError::OutputDevice(format!("Failed to spawn audio thread: {}", e)))?;

        let init = init_rx
            .recv()
            .map_err(|_| CoreError::OutputDevice("Audio thread terminated during init".to_string()))?;

        if let Err(msg) = init {
            let _ = handle.join();
            return Err(CoreError::OutputDevice(msg));
        }

        self.worker = Some(OutputThread { stop_tx, handle });
        Ok(())
    }

    fn halt(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            let _ = worker.handle.join();
            log::debug!("Audio output halted");
        }
    }

    fn take_error(&mut self) -> Option<String> {
        lock(&self.error_slot).take()
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.halt();
    }
}

/// Counters and fault injection shared with a [`SilentSink`]
#[derive(Clone, Debug, Default)]
pub struct SinkProbe {
    plays: Arc<AtomicUsize>,
    halts: Arc<AtomicUsize>,
    active: Arc<Mutex<Option<Arc<WaveformBuffer>>>>,
    pending_error: Arc<Mutex<Option<String>>>,
    refuse: Arc<Mutex<Option<String>>>,
}

impl SinkProbe {
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn halts(&self) -> usize {
        self.halts.load(Ordering::SeqCst)
    }

    /// Buffer currently being "rendered"
    pub fn active(&self) -> Option<Arc<WaveformBuffer>> {
        lock(&self.active).clone()
    }

    pub fn is_active(&self) -> bool {
        lock(&self.active).is_some()
    }

    /// Report `msg` as an asynchronous device failure on the next poll
    pub fn inject_error(&self, msg: &str) {
        *lock(&self.pending_error) = Some(msg.to_string());
    }

    /// Make subsequent `play()` calls fail with `msg`
    pub fn refuse_streams(&self, msg: &str) {
        *lock(&self.refuse) = Some(msg.to_string());
    }
}

/// Accepts audio without touching any hardware
#[derive(Default)]
pub struct SilentSink {
    probe: SinkProbe,
}

impl SilentSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_probe(probe: SinkProbe) -> Self {
        Self { probe }
    }

    pub fn probe(&self) -> SinkProbe {
        self.probe.clone()
    }

    /// Factory whose sinks all report through `probe`
    pub fn factory(probe: SinkProbe) -> SinkFactory {
        Box::new(move || Box::new(SilentSink::with_probe(probe.clone())))
    }
}

impl AudioSink for SilentSink {
    fn play(&mut self, buffer: Arc<WaveformBuffer>) -> Result<()> {
        if let Some(msg) = lock(&self.probe.refuse).clone() {
            return Err(CoreError::OutputDevice(msg));
        }
        self.probe.plays.fetch_add(1, Ordering::SeqCst);
        *lock(&self.probe.active) = Some(buffer);
        Ok(())
    }

    fn halt(&mut self) {
        if lock(&self.probe.active).take().is_some() {
            self.probe.halts.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn take_error(&mut self) -> Option<String> {
        lock(&self.probe.pending_error).take()
    }
}
