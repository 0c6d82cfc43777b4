//! Asynchronous cursor shape capture.
//!
//! A background notification thread waits on the [`CursorSource`] for
//! shape/visibility events and maintains a double-buffered record pair:
//! the *published* record is what readers see, the *staging* record is
//! where the thread writes the next shape. On a shape change the two are
//! swapped wholesale — readers never observe a partially written record,
//! and a visibility-only event flips the published flag without touching
//! the bitmap buffers.
//!
//! Readers obtain a [`ShapeReader`] handle. Each handle carries its own
//! last-seen generation, so with multiple concurrent readers every one of
//! them reports `has_new = true` exactly once per distinct publish.
//!
//! Construction is two-phase: [`CursorCapture::spawn`] either returns a
//! fully running subsystem or an error — a half-initialized, thread-owning
//! value is never observable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use framecast_core::errors::SourceError;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::source::{CursorEvent, CursorSample, CursorSource, SourceWaker};

/// Upper bound on one source event wait. The notification thread polls
/// its stop flag at this cadence, so a detached thread exits within one
/// slice of teardown even if its waker is a no-op.
const EVENT_WAIT: Duration = Duration::from_millis(100);

/// How long teardown waits for the notification thread before detaching.
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Side of the fallback arrow substituted when the OS denies the cursor
/// query.
const FALLBACK_SIZE: u32 = 16;

#[derive(Error, Debug)]
pub enum CursorError {
    #[error("failed to start cursor notification thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("cursor capture has shut down")]
    Stopped,
}

// ── Records ───────────────────────────────────────────────────────────────────

/// One complete cursor shape: bitmap, mask, hotspot, visibility, and
/// animation position, stamped with the generation that published it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapeRecord {
    /// Color pixels, BGRA.
    pub image: Vec<u8>,
    /// AND-mask for masked cursors; empty otherwise.
    pub mask: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub hotspot_x: u32,
    pub hotspot_y: u32,
    pub visible: bool,
    pub frame_index: u32,
    pub frame_count: u32,
    /// Monotonic publish counter. `0` means nothing has been published.
    pub generation: u64,
}

/// The owned published/staging pair. Publishing swaps the two records;
/// field-by-field copies never happen, so a reader holding a clone of the
/// published record keeps a consistent snapshot across swaps. Buffer
/// capacity in either record only ever grows mid-session.
#[derive(Debug, Default)]
struct ShapeBuffers {
    published: ShapeRecord,
    staging: ShapeRecord,
    next_generation: u64,
    /// Bumped by `release_waiters` to force-wake blocked readers.
    release_epoch: u64,
}

impl ShapeBuffers {
    /// Write `sample` into staging, advance the animation index, then
    /// swap staging and published.
    fn stage_and_publish(&mut self, sample: &CursorSample) {
        let frame_count = sample.frame_count.max(1);
        // Advance only while the same animated cursor keeps ticking; a
        // different shape (or a static cursor) resets to frame zero.
        let frame_index = if frame_count > 1 && frame_count == self.published.frame_count {
            (self.published.frame_index + 1) % frame_count
        } else {
            0
        };

        let staging = &mut self.staging;
        staging.image.clear();
        staging.image.extend_from_slice(&sample.image);
        staging.mask.clear();
        staging.mask.extend_from_slice(&sample.mask);
        staging.width = sample.width;
        staging.height = sample.height;
        staging.hotspot_x = sample.hotspot_x;
        staging.hotspot_y = sample.hotspot_y;
        staging.visible = sample.visible;
        staging.frame_count = frame_count;
        staging.frame_index = frame_index;

        std::mem::swap(&mut self.published, &mut self.staging);
        self.next_generation += 1;
        self.published.generation = self.next_generation;
    }

    /// Visibility-only update: no buffer swap, but it counts as a change
    /// for readers.
    fn set_visible(&mut self, visible: bool) {
        self.published.visible = visible;
        self.staging.visible = visible;
        self.next_generation += 1;
        self.published.generation = self.next_generation;
    }
}

/// What a reader gets back: the published record plus whether it differs
/// from what this reader last saw.
#[derive(Debug, Clone)]
pub struct ShapeSnapshot {
    pub has_new: bool,
    pub record: ShapeRecord,
}

// ── Shared state ──────────────────────────────────────────────────────────────

struct Shared {
    state: Mutex<ShapeBuffers>,
    changed: Condvar,
    stop: AtomicBool,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: Mutex::new(ShapeBuffers::default()),
            changed: Condvar::new(),
            stop: AtomicBool::new(false),
        }
    }
}

// ── Reader ────────────────────────────────────────────────────────────────────

/// Per-consumer read handle with its own change-tracking state.
pub struct ShapeReader {
    shared: Arc<Shared>,
    last_seen: u64,
}

impl ShapeReader {
    /// Fetch the current cursor shape.
    ///
    /// Non-blocking (`blocking = false`): returns immediately with the
    /// published record; `has_new` reports whether it was published after
    /// this reader's previous call.
    ///
    /// Blocking: suspends until a change is published or
    /// [`CursorCapture::release_waiters`] force-wakes the wait. A forced
    /// wake with no intervening publish reports `has_new = false`.
    pub fn get(&mut self, blocking: bool) -> Result<ShapeSnapshot, CursorError> {
        if self.shared.stop.load(Ordering::Acquire) {
            return Err(CursorError::Stopped);
        }

        let mut state = self.shared.state.lock().expect("cursor state lock");

        if blocking {
            let entry_epoch = state.release_epoch;
            while state.published.generation == self.last_seen
                && state.release_epoch == entry_epoch
            {
                if self.shared.stop.load(Ordering::Acquire) {
                    return Err(CursorError::Stopped);
                }
                let (guard, _timeout) = self
                    .shared
                    .changed
                    .wait_timeout(state, EVENT_WAIT)
                    .expect("cursor state lock");
                state = guard;
            }
        }

        let has_new = state.published.generation != self.last_seen;
        self.last_seen = state.published.generation;
        Ok(ShapeSnapshot { has_new, record: state.published.clone() })
    }
}

// ── CursorCapture ─────────────────────────────────────────────────────────────

/// Handle to a running cursor capture subsystem. Dropping it stops the
/// notification thread.
pub struct CursorCapture {
    shared: Arc<Shared>,
    waker: Arc<dyn SourceWaker>,
    join: Option<thread::JoinHandle<()>>,
    done_rx: mpsc::Receiver<()>,
}

impl CursorCapture {
    /// Start the notification thread. Fails — without leaving anything
    /// running — if the thread cannot be spawned.
    pub fn spawn<S: CursorSource>(source: S) -> Result<Self, CursorError> {
        let waker = source.waker();
        let shared = Arc::new(Shared::new());
        let (done_tx, done_rx) = mpsc::channel();

        let thread_shared = Arc::clone(&shared);
        let join = thread::Builder::new()
            .name("framecast-cursor".to_string())
            .spawn(move || {
                notification_loop(source, &thread_shared);
                let _ = done_tx.send(());
            })
            .map_err(CursorError::Spawn)?;

        Ok(Self { shared, waker, join: Some(join), done_rx })
    }

    /// Create a read handle. Each handle tracks change delivery
    /// independently.
    pub fn reader(&self) -> ShapeReader {
        ShapeReader { shared: Arc::clone(&self.shared), last_seen: 0 }
    }

    /// Force-wake every reader blocked in [`ShapeReader::get`] without
    /// requiring an actual cursor change. Used at teardown so a blocking
    /// consumer can never deadlock on shutdown.
    pub fn release_waiters(&self) {
        let mut state = self.shared.state.lock().expect("cursor state lock");
        state.release_epoch += 1;
        drop(state);
        self.shared.changed.notify_all();
    }

    /// Whether the notification thread is still alive.
    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn shutdown(&mut self) {
        let Some(handle) = self.join.take() else { return };

        self.shared.stop.store(true, Ordering::Release);
        self.waker.wake();
        self.release_waiters();

        match self.done_rx.recv_timeout(JOIN_TIMEOUT) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                let _ = handle.join();
                debug!("cursor notification thread joined");
            }
            Err(RecvTimeoutError::Timeout) => {
                // No safe forced kill exists; the detached loop still
                // exits on its stop flag at the next event-wait timeout.
                error!(
                    "cursor notification thread missed the {:?} shutdown deadline; detaching",
                    JOIN_TIMEOUT
                );
            }
        }
    }
}

impl Drop for CursorCapture {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Notification thread ───────────────────────────────────────────────────────

fn notification_loop<S: CursorSource>(mut source: S, shared: &Shared) {
    debug!("cursor notification thread started");

    while !shared.stop.load(Ordering::Acquire) {
        let event = match source.next_event(EVENT_WAIT) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(SourceError::Disconnected) => {
                info!("cursor source disconnected; notification thread exiting");
                // Mark the subsystem stopped so readers fail instead of
                // waiting on a source that will never signal again.
                shared.stop.store(true, Ordering::Release);
                break;
            }
            Err(e) => {
                warn!("cursor event wait failed: {e}");
                thread::sleep(Duration::from_millis(20));
                continue;
            }
        };

        match event {
            CursorEvent::ShapeChanged => {
                // Sample outside the lock; only the stage/swap below
                // runs under it.
                let sample = match source.sample() {
                    Ok(sample) => sample,
                    Err(SourceError::PermissionDenied) => {
                        debug!("cursor query denied; substituting fallback shape");
                        fallback_sample()
                    }
                    Err(e) => {
                        warn!("cursor sample failed: {e}");
                        continue;
                    }
                };
                let mut state = shared.state.lock().expect("cursor state lock");
                state.stage_and_publish(&sample);
                drop(state);
                shared.changed.notify_all();
            }
            CursorEvent::Shown | CursorEvent::Hidden => {
                let visible = matches!(event, CursorEvent::Shown);
                let mut state = shared.state.lock().expect("cursor state lock");
                state.set_visible(visible);
                drop(state);
                shared.changed.notify_all();
            }
        }
    }

    debug!("cursor notification thread exiting");
}

/// Fixed white arrow used when the OS denies the cursor query, so
/// capture continues uninterrupted instead of propagating the failure.
fn fallback_sample() -> CursorSample {
    let side = FALLBACK_SIZE as usize;
    let mut image = vec![0u8; side * side * 4];
    for y in 0..side {
        // Crude arrow glyph: a left-anchored triangle.
        let row_width = (y / 2 + 1).min(side / 2);
        for x in 0..row_width {
            let px = (y * side + x) * 4;
            image[px..px + 4].copy_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF]);
        }
    }
    CursorSample {
        image,
        mask: Vec::new(),
        width: FALLBACK_SIZE,
        height: FALLBACK_SIZE,
        hotspot_x: 0,
        hotspot_y: 0,
        visible: true,
        frame_count: 1,
    }
}
