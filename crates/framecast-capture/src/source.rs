//! Cursor source collaborator seam.
//!
//! A [`CursorSource`] is the OS/driver side of cursor capture: it delivers
//! change notifications and answers shape queries. The notification
//! thread owns the source exclusively; teardown reaches it through the
//! [`SourceWaker`] obtained before the thread starts.

use std::sync::Arc;
use std::time::Duration;

use framecast_core::errors::SourceError;

/// A cursor change notification from the OS/driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorEvent {
    /// The cursor bitmap/mask changed (includes animated-cursor ticks).
    ShapeChanged,
    Shown,
    Hidden,
}

/// One sampled cursor image as reported by the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorSample {
    /// Color pixels, BGRA, `width * height * 4` bytes.
    pub image: Vec<u8>,
    /// AND-mask for monochrome/masked cursors; empty for pure color cursors.
    pub mask: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub hotspot_x: u32,
    pub hotspot_y: u32,
    pub visible: bool,
    /// Number of animation frames; `1` for static cursors.
    pub frame_count: u32,
}

/// Force-wakes a source blocked inside [`CursorSource::next_event`].
/// Must be callable from any thread.
pub trait SourceWaker: Send + Sync {
    fn wake(&self);
}

struct NoopWaker;

impl SourceWaker for NoopWaker {
    fn wake(&self) {}
}

/// Driver-facing cursor interface consumed by the notification thread.
pub trait CursorSource: Send + 'static {
    /// Wait up to `timeout` for the next change notification.
    ///
    /// `Ok(None)` means the wait timed out with no event — the loop uses
    /// this to poll its stop flag, so implementations must honor the
    /// timeout rather than blocking indefinitely.
    fn next_event(&mut self, timeout: Duration) -> Result<Option<CursorEvent>, SourceError>;

    /// Query the current cursor shape.
    fn sample(&mut self) -> Result<CursorSample, SourceError>;

    /// Waker handle for interrupting an in-progress `next_event` wait.
    /// Sources whose waits are purely timeout-bounded can keep the
    /// default no-op.
    fn waker(&self) -> Arc<dyn SourceWaker> {
        Arc::new(NoopWaker)
    }
}

impl CursorSource for Box<dyn CursorSource> {
    fn next_event(&mut self, timeout: Duration) -> Result<Option<CursorEvent>, SourceError> {
        (**self).next_event(timeout)
    }

    fn sample(&mut self) -> Result<CursorSample, SourceError> {
        (**self).sample()
    }

    fn waker(&self) -> Arc<dyn SourceWaker> {
        (**self).waker()
    }
}
