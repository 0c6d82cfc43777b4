//! framecast-pipeline — the capture-and-encode session pipeline.
//!
//! Composes the render-target registry and cursor capture from
//! `framecast-capture` with two collaborator seams:
//!
//! - [`GraphicsBackend`]: binds external surfaces and runs the
//!   color-space conversion pass.
//! - [`Encoder`] (behind the reference-counted [`EncoderService`]):
//!   consumes converted buffers and produces compressed frames.
//!
//! Between conversion and the encoder sits the bounded [`SubmitQueue`];
//! when it fills, `encode_frame` reports queue-full instead of blocking
//! the render thread.

pub mod collab;
pub mod queue;
pub mod session;

pub use collab::{BackendCaps, CollabError, Encoder, EncoderService, GraphicsBackend};
pub use queue::{SubmitOutcome, SubmitQueue};
pub use session::{SessionPipeline, SessionStats, SessionStatsSnapshot, WaitKind};
