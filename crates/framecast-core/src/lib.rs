pub mod config;
pub mod errors;
pub mod types;

pub use config::SessionConfig;
pub use errors::{ErrorClass, RegistryError, SessionError, SourceError};
pub use types::{BufferId, EncodedFrame, PixelFormat, Resolution, SlotIndex, SurfaceRef};
