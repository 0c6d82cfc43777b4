//! Session pipeline — per-frame orchestration of registry, CSC, queue,
//! and encoder.
//!
//! ```text
//! render thread                         consumer
//! ─────────────                         ────────
//! register_render_target ─► registry
//! encode_frame ──► convert (backend) ─► queue ─► encoder
//!                                                  │
//! encoded_frame ◄── encoder.retrieve ◄── queue.drain
//! ```
//!
//! The pipeline itself is not a state machine; it is where the
//! registry's, queue's, and collaborators' contracts must compose. No
//! registry or queue lock is ever held across a collaborator call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use framecast_capture::cursor::{CursorCapture, ShapeReader, ShapeSnapshot};
use framecast_capture::registry::{SlotQuery, TargetRegistry};
use framecast_capture::source::CursorSource;
use framecast_core::config::SessionConfig;
use framecast_core::errors::SessionError;
use framecast_core::types::{EncodedFrame, Resolution, SlotIndex, SurfaceRef};
use tracing::{debug, info, warn};

use crate::collab::{CollabError, EncoderService, GraphicsBackend};
use crate::queue::{SubmitOutcome, SubmitQueue};

/// Kinds of blocking retrieval a consumer can be parked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitKind {
    MouseShape,
    DesktopChange,
}

/// Live session counters, readable from any thread.
#[derive(Debug, Default)]
pub struct SessionStats {
    pub frames_submitted: AtomicU64,
    pub frames_encoded: AtomicU64,
    pub queue_full_rejections: AtomicU64,
}

impl SessionStats {
    pub fn snapshot(&self) -> SessionStatsSnapshot {
        SessionStatsSnapshot {
            frames_submitted: self.frames_submitted.load(Ordering::Relaxed),
            frames_encoded: self.frames_encoded.load(Ordering::Relaxed),
            queue_full_rejections: self.queue_full_rejections.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of session counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionStatsSnapshot {
    pub frames_submitted: u64,
    pub frames_encoded: u64,
    pub queue_full_rejections: u64,
}

/// One capture-and-encode session.
pub struct SessionPipeline {
    config: SessionConfig,
    registry: TargetRegistry,
    queue: SubmitQueue,
    backend: Box<dyn GraphicsBackend>,
    encoder: EncoderService,
    cursor: Option<CursorCapture>,
    cursor_reader: Option<ShapeReader>,
    stats: Arc<SessionStats>,
}

impl SessionPipeline {
    /// Build a session. When `cursor_source` is provided and the config
    /// enables cursor capture, the notification thread is started here —
    /// any spawn failure fails the whole session rather than running it
    /// degraded.
    pub fn new(
        config: SessionConfig,
        backend: Box<dyn GraphicsBackend>,
        encoder: EncoderService,
        cursor_source: Option<Box<dyn CursorSource>>,
    ) -> Result<Self, SessionError> {
        let caps = backend.capabilities();
        let registry = TargetRegistry::new(config.slot_capacity, caps.max_input);
        let queue = SubmitQueue::new(config.effective_queue_depth());

        let cursor = match cursor_source {
            Some(source) if config.capture_cursor => Some(
                CursorCapture::spawn(source)
                    .map_err(|e| SessionError::Startup { reason: e.to_string() })?,
            ),
            _ => None,
        };
        let cursor_reader = cursor.as_ref().map(|c| c.reader());

        info!(
            slots = config.slot_capacity,
            queue_depth = queue.capacity(),
            cursor = cursor.is_some(),
            "session pipeline up ({})",
            config.resolution
        );

        Ok(Self {
            config,
            registry,
            queue,
            backend,
            encoder,
            cursor,
            cursor_reader,
            stats: Arc::new(SessionStats::default()),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn stats(&self) -> &Arc<SessionStats> {
        &self.stats
    }

    /// Frames submitted but not yet retrieved.
    pub fn in_flight(&self) -> usize {
        self.queue.len()
    }

    // ── Render targets ────────────────────────────────────────────────────

    /// Register a render target: validate and record it in the registry,
    /// then bind it to a backend input slot. A backend rejection rolls
    /// the registration back.
    pub fn register_render_target(
        &mut self,
        surface: SurfaceRef,
        size: Resolution,
    ) -> Result<SlotIndex, SessionError> {
        let slot = self.registry.register(surface, size)?;
        if let Err(e) = self.backend.set_input_surface(slot, surface, size) {
            self.registry
                .remove(slot)
                .expect("rollback of a just-registered slot");
            return Err(match e {
                CollabError::Unsupported(feature) => SessionError::Unsupported { feature },
                CollabError::Failed(reason) => SessionError::InvalidSurface { reason },
            });
        }
        debug!(slot, "registered render target {size}");
        Ok(slot)
    }

    /// Remove a registration. Double removal is an invalid-handle error.
    pub fn remove_render_target(&mut self, slot: SlotIndex) -> Result<(), SessionError> {
        self.registry.remove(slot)?;
        self.backend.release_input(slot);
        debug!(slot, "removed render target");
        Ok(())
    }

    /// Non-blocking slot state query.
    pub fn query_state(&self, slot: SlotIndex) -> SlotQuery {
        self.registry.query_state(slot)
    }

    // ── Encode path ───────────────────────────────────────────────────────

    /// Convert and submit one frame for a registered slot.
    ///
    /// Queue-full is a transient status: nothing is enqueued, the slot
    /// stays USED, and the caller retries with the same slot after
    /// draining. Conversion or encoder failure likewise leaves the slot
    /// USED for inspection or retry.
    pub fn encode_frame(&mut self, slot: SlotIndex) -> Result<(), SessionError> {
        // begin_convert fails fast on a FREE or out-of-range slot —
        // encoding stale data for a concurrently removed target is a
        // contract violation, not a silent fallback.
        let (_surface, _size) = self.registry.begin_convert(slot)?;

        let buffer = match self.backend.convert(slot) {
            Ok(buffer) => buffer,
            Err(e) => {
                self.registry
                    .end_convert(slot, None)
                    .expect("convert bracket close");
                return Err(match e {
                    CollabError::Unsupported(feature) => SessionError::Unsupported { feature },
                    CollabError::Failed(reason) => {
                        SessionError::ConversionFailed { slot, reason }
                    }
                });
            }
        };
        self.registry
            .end_convert(slot, Some(buffer))
            .expect("convert bracket close");

        match self.queue.submit(slot) {
            SubmitOutcome::Full => {
                self.stats.queue_full_rejections.fetch_add(1, Ordering::Relaxed);
                // Expected backpressure, not a fault.
                debug!(slot, "submission queue full");
                return Err(SessionError::QueueFull { capacity: self.queue.capacity() });
            }
            SubmitOutcome::Queued => {}
        }

        if let Err(e) = self.encoder.submit(buffer) {
            // The entry never becomes drainable for a frame the encoder
            // refused.
            self.queue.retract(slot);
            return Err(match e {
                CollabError::Unsupported(feature) => SessionError::Unsupported { feature },
                CollabError::Failed(reason) => SessionError::EncoderFailed { reason },
            });
        }

        self.stats.frames_submitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Poll for the next compressed frame. `Ok(None)` means not ready.
    /// A successful retrieve drains the oldest queue entry for reuse
    /// accounting.
    pub fn encoded_frame(&mut self) -> Result<Option<EncodedFrame>, SessionError> {
        let frame = match self.encoder.retrieve() {
            Ok(frame) => frame,
            Err(CollabError::Unsupported(feature)) => {
                return Err(SessionError::Unsupported { feature })
            }
            Err(CollabError::Failed(reason)) => {
                return Err(SessionError::EncoderFailed { reason })
            }
        };

        let Some(frame) = frame else { return Ok(None) };

        if self.queue.drain().is_none() {
            warn!("encoder produced a frame with no queued entry");
        }
        self.stats.frames_encoded.fetch_add(1, Ordering::Relaxed);
        Ok(Some(frame))
    }

    /// Change the session's target dimensions.
    ///
    /// Rejected while frames are still awaiting drain — the consumer
    /// owns the drain cadence, and quiescing here would block the render
    /// thread. Returns the slots the caller must re-register because
    /// their backing surface no longer fits.
    pub fn resize(&mut self, new_size: Resolution) -> Result<Vec<SlotIndex>, SessionError> {
        let pending = self.queue.len();
        if pending > 0 {
            return Err(SessionError::Busy { pending });
        }

        let incompatible = self.registry.resize(new_size)?;
        self.backend
            .resize_buffers(new_size)
            .map_err(|e| SessionError::BackendFailed { reason: e.to_string() })?;

        info!(
            "session resized {} → {new_size} ({} slot(s) need re-registration)",
            self.config.resolution,
            incompatible.len()
        );
        self.config.resolution = new_size;
        Ok(incompatible)
    }

    // ── Cursor ────────────────────────────────────────────────────────────

    /// Fetch the current cursor shape through the session's own reader.
    ///
    /// For a consumer on another thread — where a blocking read must
    /// coexist with `release_event` — take an independent handle via
    /// [`Self::shape_reader`] instead.
    pub fn mouse_shape(&mut self, blocking: bool) -> Result<ShapeSnapshot, SessionError> {
        let Some(reader) = self.cursor_reader.as_mut() else {
            return Err(SessionError::CursorUnavailable {
                reason: "cursor capture not configured".to_string(),
            });
        };
        reader
            .get(blocking)
            .map_err(|e| SessionError::CursorUnavailable { reason: e.to_string() })
    }

    /// Independent cursor read handle with its own change tracking.
    pub fn shape_reader(&self) -> Option<ShapeReader> {
        self.cursor.as_ref().map(|c| c.reader())
    }

    /// Unblock any thread parked in a blocking retrieval of the given
    /// kind, without requiring an actual change. Used at teardown.
    pub fn release_event(&self, kind: WaitKind) {
        match kind {
            WaitKind::MouseShape => {
                if let Some(cursor) = &self.cursor {
                    cursor.release_waiters();
                }
            }
            WaitKind::DesktopChange => {
                // Frame retrieval in this pipeline is poll-based; no
                // thread can be parked on it.
                debug!("release_event(DesktopChange): no blocking waiters exist");
            }
        }
    }
}
