//! Playback engine adapter.
//!
//! [`PlaybackEngine`] is the single control surface the session controller
//! drives: load, pause/resume, stop, volume, rate, elapsed/duration, and
//! registrable end/error callbacks. [`SinkEngine`] implements it on top of
//! rodio.
//!
//! rodio's `OutputStream` and `Sink` are not `Send`, so the engine owns a
//! dedicated audio thread; commands cross over a channel and position /
//! duration snapshots come back through shared atomics. The audio thread
//! doubles as the completion watcher: when the sink drains it fires the
//! registered end callback exactly once and releases the handle.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use parking_lot::Mutex;
use rodio::{Decoder, OutputStream, Sink, Source};
use thiserror::Error;
use tracing::{debug, warn};

use super::AudioClip;

/// Completion/error continuation registered on the engine.
///
/// Invoked at most once per handle lifetime; handles created after
/// registration also receive the currently registered callbacks.
pub type EngineCallback = Arc<dyn Fn() + Send + Sync>;

/// Interval at which the audio thread refreshes position and checks for
/// completion.
const WATCH_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to open audio output device: {0}")]
    OutputUnavailable(String),
}

/// Control surface over the single active audio handle.
///
/// All operations are no-ops when no handle exists; a failed playback
/// start invokes the error callback rather than returning an error.
pub trait PlaybackEngine: Send + Sync {
    /// Discard any previous handle (releasing its clip), then decode the
    /// given clip, apply `rate`, and begin playback.
    fn load(&self, clip: AudioClip, rate: f32);

    fn pause(&self);
    fn resume(&self);

    /// Halt playback, reset position to zero, and release the handle and
    /// its decoded clip. Idempotent.
    fn stop(&self);

    fn set_volume(&self, volume: f32);
    fn set_speed(&self, rate: f32);

    /// Elapsed playback time in seconds; 0.0 when no handle exists.
    fn position(&self) -> f32;

    /// Total duration in seconds; 0.0 when no handle exists or the clip's
    /// duration is unknown (compressed formats without metadata).
    fn duration(&self) -> f32;

    /// True when nothing is playing, including when no handle exists.
    fn is_paused(&self) -> bool;

    fn on_end(&self, callback: EngineCallback);
    fn on_error(&self, callback: EngineCallback);
}

// =============================================================================
// Rodio-backed implementation
// =============================================================================

enum Command {
    Load { clip: AudioClip, rate: f32 },
    Pause,
    Resume,
    Stop,
    SetVolume(f32),
    SetSpeed(f32),
}

/// State shared between the handle side and the audio thread.
struct EngineShared {
    position_ms: AtomicU64,
    duration_ms: AtomicU64,
    has_handle: AtomicBool,
    paused: AtomicBool,
    on_end: Mutex<Option<EngineCallback>>,
    on_error: Mutex<Option<EngineCallback>>,
}

impl EngineShared {
    fn new() -> Self {
        Self {
            position_ms: AtomicU64::new(0),
            duration_ms: AtomicU64::new(0),
            has_handle: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            on_end: Mutex::new(None),
            on_error: Mutex::new(None),
        }
    }

    fn fire_end(&self) {
        if let Some(cb) = self.on_end.lock().clone() {
            cb();
        }
    }

    fn fire_error(&self) {
        if let Some(cb) = self.on_error.lock().clone() {
            cb();
        }
    }
}

/// Playback engine backed by a dedicated rodio audio thread.
///
/// Cloning yields another handle to the same engine; the audio thread
/// exits when the last handle is dropped.
#[derive(Clone)]
pub struct SinkEngine {
    tx: mpsc::Sender<Command>,
    shared: Arc<EngineShared>,
}

impl SinkEngine {
    /// Spawn the audio thread on the default output device.
    pub fn new() -> Result<Self, EngineError> {
        let (tx, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let shared = Arc::new(EngineShared::new());
        let thread_shared = Arc::clone(&shared);

        std::thread::Builder::new()
            .name("voxread-audio".to_string())
            .spawn(move || audio_thread(rx, ready_tx, thread_shared))
            .map_err(|e| EngineError::OutputUnavailable(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self { tx, shared }),
            Ok(Err(message)) => Err(EngineError::OutputUnavailable(message)),
            Err(_) => Err(EngineError::OutputUnavailable(
                "audio thread exited before startup".to_string(),
            )),
        }
    }

    fn send(&self, command: Command) {
        if self.tx.send(command).is_err() {
            warn!("Audio thread is gone, dropping playback command");
        }
    }
}

impl PlaybackEngine for SinkEngine {
    fn load(&self, clip: AudioClip, rate: f32) {
        self.send(Command::Load { clip, rate });
    }

    fn pause(&self) {
        self.send(Command::Pause);
    }

    fn resume(&self) {
        self.send(Command::Resume);
    }

    fn stop(&self) {
        self.send(Command::Stop);
    }

    fn set_volume(&self, volume: f32) {
        self.send(Command::SetVolume(volume.clamp(0.0, 1.0)));
    }

    fn set_speed(&self, rate: f32) {
        self.send(Command::SetSpeed(rate.max(0.1)));
    }

    fn position(&self) -> f32 {
        self.shared.position_ms.load(Ordering::Acquire) as f32 / 1000.0
    }

    fn duration(&self) -> f32 {
        self.shared.duration_ms.load(Ordering::Acquire) as f32 / 1000.0
    }

    fn is_paused(&self) -> bool {
        !self.shared.has_handle.load(Ordering::Acquire)
            || self.shared.paused.load(Ordering::Acquire)
    }

    fn on_end(&self, callback: EngineCallback) {
        *self.shared.on_end.lock() = Some(callback);
    }

    fn on_error(&self, callback: EngineCallback) {
        *self.shared.on_error.lock() = Some(callback);
    }
}

/// One live handle on the audio thread: the sink plus the clip it is
/// playing. Both are dropped together on teardown; keeping the clip here
/// makes the release explicit so repeated plays cannot accumulate buffers.
struct ActiveHandle {
    sink: Sink,
    _clip: AudioClip,
}

fn audio_thread(
    rx: mpsc::Receiver<Command>,
    ready_tx: mpsc::Sender<Result<(), String>>,
    shared: Arc<EngineShared>,
) {
    let (stream, stream_handle) = match OutputStream::try_default() {
        Ok(pair) => {
            let _ = ready_tx.send(Ok(()));
            pair
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e.to_string()));
            return;
        }
    };
    // The stream must outlive every sink created from its handle.
    let _stream = stream;

    let mut handle: Option<ActiveHandle> = None;
    let mut volume: f32 = 1.0;

    let teardown = |handle: &mut Option<ActiveHandle>| {
        if let Some(active) = handle.take() {
            active.sink.stop();
        }
        shared.position_ms.store(0, Ordering::Release);
        shared.duration_ms.store(0, Ordering::Release);
        shared.has_handle.store(false, Ordering::Release);
        shared.paused.store(false, Ordering::Release);
    };

    loop {
        match rx.recv_timeout(WATCH_INTERVAL) {
            Ok(Command::Load { clip, rate }) => {
                teardown(&mut handle);

                let sink = match Sink::try_new(&stream_handle) {
                    Ok(sink) => sink,
                    Err(e) => {
                        warn!(error = %e, "Failed to create playback sink");
                        shared.fire_error();
                        continue;
                    }
                };

                let source = match Decoder::new(Cursor::new(clip.bytes.clone())) {
                    Ok(source) => source,
                    Err(e) => {
                        warn!(error = %e, "Failed to decode audio clip");
                        shared.fire_error();
                        continue;
                    }
                };

                let duration_ms = source
                    .total_duration()
                    .map(|d| d.as_millis() as u64)
                    .unwrap_or(0);

                sink.set_speed(rate.max(0.1));
                sink.set_volume(volume);
                sink.append(source);

                debug!(bytes = clip.len(), rate, "Playback started");
                shared.position_ms.store(0, Ordering::Release);
                shared.duration_ms.store(duration_ms, Ordering::Release);
                shared.has_handle.store(true, Ordering::Release);
                shared.paused.store(false, Ordering::Release);
                handle = Some(ActiveHandle { sink, _clip: clip });
            }
            Ok(Command::Pause) => {
                if let Some(active) = &handle {
                    active.sink.pause();
                    shared.paused.store(true, Ordering::Release);
                }
            }
            Ok(Command::Resume) => {
                if let Some(active) = &handle {
                    active.sink.play();
                    shared.paused.store(false, Ordering::Release);
                }
            }
            Ok(Command::Stop) => {
                teardown(&mut handle);
            }
            Ok(Command::SetVolume(v)) => {
                volume = v;
                if let Some(active) = &handle {
                    active.sink.set_volume(v);
                }
            }
            Ok(Command::SetSpeed(rate)) => {
                if let Some(active) = &handle {
                    active.sink.set_speed(rate);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            // All engine handles dropped; shut the thread down.
            Err(RecvTimeoutError::Disconnected) => break,
        }

        // Watcher tick: refresh position, detect completion.
        let finished = if let Some(active) = &handle {
            shared
                .position_ms
                .store(active.sink.get_pos().as_millis() as u64, Ordering::Release);
            active.sink.empty()
        } else {
            false
        };
        if finished {
            debug!("Playback finished");
            teardown(&mut handle);
            shared.fire_end();
        }
    }
}
