use thiserror::Error;

use crate::types::Resolution;

/// Coarse classification used by callers to decide between failing fast,
/// retrying, and tearing the session down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caller broke the API contract (bad handle, bad dimensions, over
    /// capacity). Never retried internally.
    Contract,
    /// Expected steady-state backpressure. Recoverable by caller-side
    /// retry or polling.
    Transient,
    /// An external collaborator (CSC backend, encoder, cursor source)
    /// failed. Session state is left intact for inspection or retry.
    Collaborator,
    /// The operation needs a hardware capability this backend lacks.
    Unsupported,
    /// Construction or teardown failure. The subsystem refuses to run.
    Fatal,
}

// ── Registry ──────────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry capacity exhausted ({capacity} slots)")]
    Capacity { capacity: usize },

    #[error("invalid target dimensions {requested} (backend limit {limit})")]
    InvalidDimensions {
        requested: Resolution,
        limit: Resolution,
    },

    #[error("slot {index} is not a registered render target")]
    InvalidHandle { index: u32 },
}

impl RegistryError {
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Contract
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("submission queue is full ({capacity} entries in flight)")]
    QueueFull { capacity: usize },

    #[error("color-space conversion failed for slot {slot}: {reason}")]
    ConversionFailed { slot: u32, reason: String },

    #[error("encoder rejected buffer: {reason}")]
    EncoderFailed { reason: String },

    #[error("resize rejected: {pending} frame(s) still awaiting drain")]
    Busy { pending: usize },

    #[error("backend does not support {feature}")]
    Unsupported { feature: &'static str },

    #[error("backend rejected surface: {reason}")]
    InvalidSurface { reason: String },

    #[error("backend operation failed: {reason}")]
    BackendFailed { reason: String },

    #[error("cursor capture is unavailable: {reason}")]
    CursorUnavailable { reason: String },

    #[error("session failed to start: {reason}")]
    Startup { reason: String },
}

impl SessionError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Registry(e) => e.class(),
            Self::QueueFull { .. } => ErrorClass::Transient,
            Self::ConversionFailed { .. }
            | Self::EncoderFailed { .. }
            | Self::BackendFailed { .. }
            | Self::CursorUnavailable { .. } => ErrorClass::Collaborator,
            Self::Busy { .. } | Self::InvalidSurface { .. } => ErrorClass::Contract,
            Self::Unsupported { .. } => ErrorClass::Unsupported,
            Self::Startup { .. } => ErrorClass::Fatal,
        }
    }

    /// Whether the documented recovery is simply calling again later.
    pub fn is_transient(&self) -> bool {
        matches!(self.class(), ErrorClass::Transient)
    }
}

// ── Cursor source ─────────────────────────────────────────────────────────────

/// Failures reported by a [`CursorSource`] implementation when sampling
/// the live cursor.
///
/// `PermissionDenied` is special-cased by the capture subsystem: it
/// substitutes a fallback cursor instead of propagating, so capture
/// continues uninterrupted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("cursor query denied by the OS/driver")]
    PermissionDenied,

    #[error("cursor source disconnected")]
    Disconnected,

    #[error("cursor source error: {0}")]
    Backend(String),
}
