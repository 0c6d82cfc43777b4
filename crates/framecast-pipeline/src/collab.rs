//! External collaborator seams: the CSC graphics backend and the
//! hardware encoder.
//!
//! Both are plumbing with no concurrency of their own as far as this
//! crate is concerned; the pipeline only guarantees it never holds a
//! registry or queue lock across a call into them.

use std::sync::{Arc, Mutex};

use framecast_core::types::{BufferId, EncodedFrame, PixelFormat, Resolution, SlotIndex, SurfaceRef};
use thiserror::Error;

/// Failure reported by a collaborator call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollabError {
    #[error("{0}")]
    Failed(String),

    /// The backend lacks an optional hardware capability. Surfaced as an
    /// explicit status rather than a late-bound null call.
    #[error("capability not available: {0}")]
    Unsupported(&'static str),
}

/// Static capabilities reported once at startup.
#[derive(Debug, Clone, Copy)]
pub struct BackendCaps {
    /// Largest input surface the CSC path accepts.
    pub max_input: Resolution,
    /// Pixel layout the CSC pass emits (what the encoder ingests).
    pub output_format: PixelFormat,
}

/// Graphics/compute backend performing color-space conversion.
pub trait GraphicsBackend: Send {
    fn capabilities(&self) -> BackendCaps;

    /// Bind an external surface to a backend input slot.
    fn set_input_surface(
        &mut self,
        slot: SlotIndex,
        surface: SurfaceRef,
        size: Resolution,
    ) -> Result<(), CollabError>;

    /// Unbind a backend input slot.
    fn release_input(&mut self, slot: SlotIndex);

    /// Run the CSC pass for a bound slot, producing an encoder-ready
    /// buffer.
    fn convert(&mut self, slot: SlotIndex) -> Result<BufferId, CollabError>;

    /// Reallocate conversion buffers for a new output dimension.
    fn resize_buffers(&mut self, size: Resolution) -> Result<(), CollabError>;
}

/// Hardware encoder: push converted buffers, pull compressed frames.
pub trait Encoder: Send {
    fn submit(&mut self, buffer: BufferId) -> Result<(), CollabError>;

    /// `Ok(None)` means no frame is ready yet — poll again.
    fn retrieve(&mut self) -> Result<Option<EncodedFrame>, CollabError>;
}

/// Shared, reference-counted encoder handle.
///
/// Sessions clone the service instead of reaching for a process-global
/// driver handle; the underlying encoder is torn down when the last
/// clone drops.
#[derive(Clone)]
pub struct EncoderService {
    inner: Arc<Mutex<Box<dyn Encoder>>>,
}

impl EncoderService {
    pub fn new(encoder: Box<dyn Encoder>) -> Self {
        Self { inner: Arc::new(Mutex::new(encoder)) }
    }

    pub fn submit(&self, buffer: BufferId) -> Result<(), CollabError> {
        self.inner.lock().expect("encoder lock").submit(buffer)
    }

    pub fn retrieve(&self) -> Result<Option<EncodedFrame>, CollabError> {
        self.inner.lock().expect("encoder lock").retrieve()
    }

    /// Number of live handles to the underlying encoder.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullEncoder;

    impl Encoder for NullEncoder {
        fn submit(&mut self, _buffer: BufferId) -> Result<(), CollabError> {
            Ok(())
        }

        fn retrieve(&mut self) -> Result<Option<EncodedFrame>, CollabError> {
            Ok(None)
        }
    }

    #[test]
    fn service_handles_are_reference_counted() {
        let service = EncoderService::new(Box::new(NullEncoder));
        assert_eq!(service.handle_count(), 1);
        let clone = service.clone();
        assert_eq!(service.handle_count(), 2);
        drop(clone);
        assert_eq!(service.handle_count(), 1);
    }
}
