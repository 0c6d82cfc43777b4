//! Run a full session against mock collaborators:
//! register → encode → retrieve → cursor read → teardown.
//!
//! ```text
//! cargo run -p framecast-pipeline --example mock_session
//! ```

use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use anyhow::Result;
use framecast_capture::source::{CursorEvent, CursorSample, CursorSource};
use framecast_core::errors::{SessionError, SourceError};
use framecast_core::types::{BufferId, EncodedFrame, PixelFormat, Resolution, SlotIndex, SurfaceRef};
use framecast_core::SessionConfig;
use framecast_pipeline::{
    BackendCaps, CollabError, Encoder, EncoderService, GraphicsBackend, SessionPipeline,
    WaitKind,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

// ── Mock collaborators ────────────────────────────────────────────────────────

struct DemoBackend {
    next_buffer: u64,
}

impl GraphicsBackend for DemoBackend {
    fn capabilities(&self) -> BackendCaps {
        BackendCaps {
            max_input: Resolution::UHD,
            output_format: PixelFormat::Nv12,
        }
    }

    fn set_input_surface(
        &mut self,
        _slot: SlotIndex,
        _surface: SurfaceRef,
        _size: Resolution,
    ) -> Result<(), CollabError> {
        Ok(())
    }

    fn release_input(&mut self, _slot: SlotIndex) {}

    fn convert(&mut self, _slot: SlotIndex) -> Result<BufferId, CollabError> {
        self.next_buffer += 1;
        Ok(BufferId(self.next_buffer))
    }

    fn resize_buffers(&mut self, _size: Resolution) -> Result<(), CollabError> {
        Ok(())
    }
}

#[derive(Default)]
struct DemoEncoder {
    pending: Vec<BufferId>,
}

impl Encoder for DemoEncoder {
    fn submit(&mut self, buffer: BufferId) -> Result<(), CollabError> {
        self.pending.push(buffer);
        Ok(())
    }

    fn retrieve(&mut self) -> Result<Option<EncodedFrame>, CollabError> {
        if self.pending.is_empty() {
            return Ok(None);
        }
        let buffer = self.pending.remove(0);
        Ok(Some(EncodedFrame {
            data: bytes::Bytes::from(vec![0u8; 1024]),
            pts_ms: buffer.0 * 16,
            is_keyframe: buffer.0 == 1,
        }))
    }
}

struct DemoCursorSource {
    events: mpsc::Receiver<CursorEvent>,
}

impl CursorSource for DemoCursorSource {
    fn next_event(&mut self, timeout: Duration) -> Result<Option<CursorEvent>, SourceError> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(SourceError::Disconnected),
        }
    }

    fn sample(&mut self) -> Result<CursorSample, SourceError> {
        Ok(CursorSample {
            image: vec![0xCC; 24 * 24 * 4],
            mask: Vec::new(),
            width: 24,
            height: 24,
            hotspot_x: 2,
            hotspot_y: 2,
            visible: true,
            frame_count: 1,
        })
    }
}

// ── Demo ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_target(true)
        .init();

    let (cursor_tx, cursor_rx) = mpsc::channel();
    let mut pipeline = SessionPipeline::new(
        SessionConfig { slot_capacity: 2, queue_depth: 2, ..Default::default() },
        Box::new(DemoBackend { next_buffer: 0 }),
        EncoderService::new(Box::<DemoEncoder>::default()),
        Some(Box::new(DemoCursorSource { events: cursor_rx })),
    )?;

    let front = pipeline.register_render_target(SurfaceRef::new(0x1000), Resolution::FHD)?;
    let back = pipeline.register_render_target(SurfaceRef::new(0x2000), Resolution::FHD)?;
    info!("registered slots {front} and {back}");

    // Alternate buffers; ride out backpressure by draining.
    for frame in 0..8u32 {
        let slot = if frame % 2 == 0 { front } else { back };
        loop {
            match pipeline.encode_frame(slot) {
                Ok(()) => break,
                Err(SessionError::QueueFull { .. }) => {
                    if let Some(encoded) = pipeline.encoded_frame()? {
                        info!(
                            "encoded frame pts={}ms ({} bytes, key={})",
                            encoded.pts_ms,
                            encoded.data.len(),
                            encoded.is_keyframe
                        );
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
    while let Some(encoded) = pipeline.encoded_frame()? {
        info!("flushed frame pts={}ms", encoded.pts_ms);
    }

    // Cursor: trigger a change, read it, then force-release any waiter.
    cursor_tx.send(CursorEvent::ShapeChanged)?;
    loop {
        let snap = pipeline.mouse_shape(false)?;
        if snap.has_new {
            info!(
                "cursor shape {}×{} hotspot=({},{})",
                snap.record.width, snap.record.height,
                snap.record.hotspot_x, snap.record.hotspot_y
            );
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    pipeline.release_event(WaitKind::MouseShape);

    let stats = pipeline.stats().snapshot();
    info!(
        "session done: {} submitted, {} encoded, {} backpressure rejections",
        stats.frames_submitted, stats.frames_encoded, stats.queue_full_rejections
    );
    Ok(())
}
