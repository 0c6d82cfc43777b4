use serde::{Deserialize, Serialize};

use crate::types::Resolution;

/// Configuration for one capture-and-encode session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub resolution: Resolution,
    /// Maximum number of render targets registered at once.
    #[serde(alias = "slotCapacity")]
    pub slot_capacity: usize,
    /// Submission queue depth. Size to the host's in-flight frame count
    /// (2–3 for double/triple buffering). Clamped to at least 1.
    #[serde(alias = "queueDepth")]
    pub queue_depth: usize,
    #[serde(alias = "targetFPS")]
    pub target_fps: u32,
    #[serde(alias = "maxBitrateBps")]
    pub max_bitrate_bps: u64,
    /// Whether to run the cursor shape capture subsystem.
    #[serde(alias = "captureCursor")]
    pub capture_cursor: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::FHD,
            slot_capacity: 8,
            queue_depth: 3,
            target_fps: 60,
            max_bitrate_bps: 8_000_000,
            capture_cursor: true,
        }
    }
}

impl SessionConfig {
    /// Queue depth with the ≥ 1 floor applied.
    pub fn effective_queue_depth(&self) -> usize {
        self.queue_depth.max(1)
    }

    pub fn frame_interval_us(&self) -> u64 {
        1_000_000 / self.target_fps.max(1) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::SessionConfig;

    #[test]
    fn deserializes_camel_case_fields() {
        let json = r#"{
            "resolution": {"width": 2560, "height": 1440},
            "slotCapacity": 4,
            "queueDepth": 2,
            "targetFPS": 60,
            "maxBitrateBps": 12000000,
            "captureCursor": false
        }"#;

        let cfg: SessionConfig = serde_json::from_str(json).expect("valid camelCase config");
        assert_eq!(cfg.slot_capacity, 4);
        assert_eq!(cfg.queue_depth, 2);
        assert_eq!(cfg.max_bitrate_bps, 12_000_000);
        assert!(!cfg.capture_cursor);
    }

    #[test]
    fn deserializes_snake_case_fields() {
        let json = r#"{
            "slot_capacity": 16,
            "queue_depth": 3,
            "target_fps": 30
        }"#;

        let cfg: SessionConfig = serde_json::from_str(json).expect("valid snake_case config");
        assert_eq!(cfg.slot_capacity, 16);
        assert_eq!(cfg.target_fps, 30);
        // Unspecified fields come from Default.
        assert!(cfg.capture_cursor);
    }

    #[test]
    fn queue_depth_is_floored_at_one() {
        let cfg = SessionConfig { queue_depth: 0, ..Default::default() };
        assert_eq!(cfg.effective_queue_depth(), 1);
    }
}
