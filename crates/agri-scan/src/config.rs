//! # Scanner Configuration
//!
//! Settings handed to the capture source, plus session timing.
//!
//! ## Defaults
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  facing        environment (rear camera)                               │
//! │  fps           10 decode attempts per second                           │
//! │  scan_box      250 x 250 px region of interest                         │
//! │  aspect_ratio  1.0                                                     │
//! │  settle_delay  100 ms before (re)starting after mount or scan-next     │
//! │  auto_start    true: the camera starts on its own after mount          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default delay between mount (or "scan next") and camera start.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Which camera to prefer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Rear camera, pointed at the bag label.
    #[default]
    Environment,
    /// Front camera.
    User,
}

impl std::fmt::Display for Facing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Facing::Environment => write!(f, "environment"),
            Facing::User => write!(f, "user"),
        }
    }
}

/// Capture parameters passed to [`Camera::start`](crate::Camera::start).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    pub facing: Facing,

    /// Decode attempts per second.
    pub fps: u32,

    /// Side of the square scan region, in pixels.
    pub scan_box: u32,

    pub aspect_ratio: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        CameraSettings {
            facing: Facing::Environment,
            fps: 10,
            scan_box: 250,
            aspect_ratio: 1.0,
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// Wait before auto-start on mount and before re-acquiring on scan-next.
    pub settle_delay: Duration,

    /// Start the camera after mount. Upload-only sessions turn this off.
    pub auto_start: bool,

    pub camera: CameraSettings,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            settle_delay: DEFAULT_SETTLE_DELAY,
            auto_start: true,
            camera: CameraSettings::default(),
        }
    }
}

impl ScanConfig {
    /// Sets the settle delay.
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Sets whether the camera starts on mount.
    pub fn auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    /// Sets the camera settings.
    pub fn camera(mut self, camera: CameraSettings) -> Self {
        self.camera = camera;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.settle_delay, Duration::from_millis(100));
        assert!(config.auto_start);
        assert_eq!(config.camera.facing, Facing::Environment);
        assert_eq!(config.camera.fps, 10);
        assert_eq!(config.camera.scan_box, 250);
    }

    #[test]
    fn test_builder() {
        let config = ScanConfig::default()
            .settle_delay(Duration::ZERO)
            .camera(CameraSettings {
                facing: Facing::User,
                ..Default::default()
            });
        assert_eq!(config.settle_delay, Duration::ZERO);
        assert_eq!(config.camera.facing.to_string(), "user");
    }
}
