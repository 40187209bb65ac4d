//! Realtime playback — look-ahead scheduling against an audio clock.
//!
//! A ticker thread wakes every `TICK_INTERVAL` and queues into the backend
//! every note whose start falls inside the look-ahead window, staying a
//! little ahead of the clock to absorb callback jitter. The stop channel
//! doubles as the tick timer: `recv_timeout` either times out (one tick) or
//! delivers the stop request, so cancellation is immediate and total.
//!
//! The audio backend itself stays behind the `AudioClock`/`NoteSink` traits;
//! this crate never talks to an output device directly.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

use crate::builder::{build_notes, NoteEvent, NoteList};
use crate::config::SonifyOptions;
use crate::dsp::engine::AudioEngine;
use crate::error::SonifyError;
use crate::series::SeriesMap;

/// Scheduler wake-up period.
pub const TICK_INTERVAL: Duration = Duration::from_millis(25);
/// How far past "now" each tick schedules.
pub const LOOKAHEAD_SEC: f64 = 0.15;
/// Offset between start() and the first audible frame, so the first tick
/// never schedules into the past.
pub const START_OFFSET_SEC: f64 = 0.2;

/// A monotonic clock in seconds. Realtime playback follows whatever clock
/// the audio backend exposes.
pub trait AudioClock: Send + 'static {
    fn now(&self) -> f64;
}

/// Wall-clock seconds since construction.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        SystemClock::new()
    }
}

impl AudioClock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// The note-triggering side of the audio backend.
pub trait NoteSink: Send + 'static {
    /// Queue one note to sound at clock time `at` (same clock as the
    /// session's `AudioClock`).
    fn queue_note(&mut self, note: &NoteEvent, at: f64);
    /// Immediately silence every sounding and queued note.
    fn stop_all(&mut self);
}

/// Observable playback state. `Starting` is the transient phase inside
/// `start_realtime` (building notes, checking presets); by the time the
/// call returns the session is either `Playing` or errored back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Starting,
    Playing,
}

struct ActivePlayback {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// An explicit audio session: owns the engine (and with it the
/// loaded-preset registry) plus the active scheduler handle. Passed to
/// start/stop calls instead of living in ambient globals.
pub struct AudioSession {
    engine: AudioEngine,
    active: Option<ActivePlayback>,
}

impl AudioSession {
    /// A session with the builtin voices registered.
    pub fn new(sample_rate: f64) -> Self {
        AudioSession::with_engine(AudioEngine::with_builtins(sample_rate))
    }

    /// A session around a caller-populated engine (e.g. after catalog
    /// presets were resolved and registered).
    pub fn with_engine(engine: AudioEngine) -> Self {
        AudioSession { engine, active: None }
    }

    pub fn engine(&self) -> &AudioEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut AudioEngine {
        &mut self.engine
    }

    pub fn state(&self) -> PlaybackState {
        match &self.active {
            None => PlaybackState::Idle,
            Some(active) if active.handle.is_finished() => PlaybackState::Idle,
            Some(_) => PlaybackState::Playing,
        }
    }

    /// Build the note list and start look-ahead playback through `sink`.
    ///
    /// Any previous pass is fully torn down first — stop ticking, silence
    /// the sink, clear the note index — so schedules can never overlap.
    /// Fails without starting when the configuration is invalid or a
    /// referenced preset is not loaded in this session.
    pub fn start_realtime<C: AudioClock, S: NoteSink>(
        &mut self,
        data: &SeriesMap,
        options: &SonifyOptions,
        clock: C,
        sink: S,
    ) -> Result<(), SonifyError> {
        self.stop();

        let notes = build_notes(data, options)?;
        self.engine.check_presets(&notes)?;

        let (stop_tx, stop_rx) = bounded(1);
        let handle = thread::spawn(move || run_scheduler(notes, clock, sink, stop_rx));
        self.active = Some(ActivePlayback { stop_tx, handle });
        Ok(())
    }

    /// Stop playback. Idempotent: a stop with nothing playing is a no-op.
    /// When this returns, no note is sounding and no further tick fires.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            let _ = active.stop_tx.send(());
            let _ = active.handle.join();
        }
    }

    /// Offline pass: same note list, rendered against this session's
    /// registry into a buffer of exactly `master_length × step_duration`
    /// seconds.
    pub fn render_offline(
        &self,
        data: &SeriesMap,
        options: &SonifyOptions,
    ) -> Result<Vec<f64>, SonifyError> {
        let notes = build_notes(data, options)?;
        self.engine.render(&notes)
    }
}

impl Drop for AudioSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_scheduler<C: AudioClock, S: NoteSink>(
    notes: NoteList,
    clock: C,
    mut sink: S,
    stop_rx: Receiver<()>,
) {
    // The builder orders notes per track, not globally; the look-ahead
    // pointer needs one time-sorted queue.
    let mut queue = notes.notes;
    queue.sort_by(|a, b| a.start_time_sec.total_cmp(&b.start_time_sec));

    let start_time = clock.now() + START_OFFSET_SEC;
    let end_time = start_time + notes.total_duration_sec;
    let mut next_note = 0;

    loop {
        let horizon = clock.now() + LOOKAHEAD_SEC;
        while next_note < queue.len() {
            let note = &queue[next_note];
            let at = start_time + note.start_time_sec;
            if at >= horizon {
                break;
            }
            sink.queue_note(note, at);
            next_note += 1;
        }

        // Natural completion: everything queued and the clock has passed
        // the end of the pass. Queued audio rings out on its own.
        if next_note >= queue.len() && clock.now() >= end_time {
            break;
        }

        match stop_rx.recv_timeout(TICK_INTERVAL) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                sink.stop_all();
                break;
            }
        }
    }
}
