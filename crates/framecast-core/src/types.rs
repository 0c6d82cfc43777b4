use serde::{Deserialize, Serialize};

// ── Resolution ────────────────────────────────────────────────────────────────

/// Capture/encode target dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const FHD: Self = Self { width: 1920, height: 1080 };
    pub const QHD: Self = Self { width: 2560, height: 1440 };
    pub const UHD: Self = Self { width: 3840, height: 2160 };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Non-degenerate dimensions (neither axis zero).
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Whether this resolution fits inside `limit` on both axes.
    pub fn fits_within(&self, limit: Resolution) -> bool {
        self.width <= limit.width && self.height <= limit.height
    }

    pub fn total_pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}×{}", self.width, self.height)
    }
}

// ── Handles ───────────────────────────────────────────────────────────────────

/// Index of a registered capture slot. Stable for the slot's lifetime.
pub type SlotIndex = u32;

/// Opaque reference to an externally owned render surface (texture,
/// swapchain image, compositor buffer). The pipeline never dereferences
/// it; it is handed back to the graphics backend verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceRef(u64);

impl SurfaceRef {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Identity of a converted (encoder-ready) buffer produced by the
/// graphics backend's CSC pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u64);

// ── PixelFormat ───────────────────────────────────────────────────────────────

/// Pixel layout of a surface or converted buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 4 bytes per pixel: Blue, Green, Red, Alpha.
    Bgra,
    /// 4 bytes per pixel: Red, Green, Blue, Alpha.
    Rgba,
    /// Planar YUV 4:2:0 — the layout hardware encoders typically expect.
    Nv12,
}

// ── EncodedFrame ──────────────────────────────────────────────────────────────

/// One compressed frame retrieved from the encoder.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub data: bytes::Bytes,
    pub pts_ms: u64,
    pub is_keyframe: bool,
}
