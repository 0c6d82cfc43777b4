//! framecast-capture — render-target registry and cursor shape capture.
//!
//! Two independent subsystems live here:
//!
//! - [`TargetRegistry`]: a fixed-capacity table mapping externally owned
//!   render surfaces to stable slot indices, with a per-slot lifecycle
//!   state machine (`FREE → USED → CONVERTING → USED → FREE`).
//! - [`CursorCapture`]: a background notification thread that tracks the
//!   host cursor's shape and visibility in a double-buffered
//!   published/staging record pair, serving both non-blocking and
//!   blocking readers.
//!
//! ```text
//! render thread ──► TargetRegistry (one mutex, linearized transitions)
//!
//! CursorSource events ──► notification thread ──► staging record
//!                                                     │ publish() swap
//!                                                     ▼
//!                           readers ◄── published record (+ condvar)
//! ```

pub mod cursor;
pub mod registry;
pub mod source;

pub use cursor::{CursorCapture, CursorError, ShapeReader, ShapeRecord, ShapeSnapshot};
pub use registry::{SlotQuery, SlotState, TargetRegistry};
pub use source::{CursorEvent, CursorSample, CursorSource, SourceWaker};
