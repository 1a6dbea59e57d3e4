use serde::{Deserialize, Serialize};

/// Pose of the colour camera in the tracker's start-of-service frame.
///
/// The tracker's convention is right-handed. Consumers with a different
/// convention apply their own handedness correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Orientation quaternion in (x, y, z, w) order. Expected to be unit-norm.
    pub rotation: [f32; 4],
    /// Position in meters.
    pub translation: [f32; 3],
    /// Seconds since the tracking service started.
    pub timestamp: f64,
}

impl Pose {
    pub fn new(rotation: [f32; 4], translation: [f32; 3]) -> Self {
        Self {
            rotation,
            translation,
            timestamp: 0.0,
        }
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new([0.0, 0.0, 0.0, 1.0], [0.0; 3])
    }
}

/// Pinhole intrinsics of the colour camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Image size in pixels.
    pub width: u32,
    pub height: u32,
    /// Focal length in pixels.
    pub fx: f64,
    pub fy: f64,
    /// Principal point in pixels.
    pub cx: f64,
    pub cy: f64,
}

impl Default for CameraIntrinsics {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fx: 1042.0,
            fy: 1042.0,
            cx: 640.0,
            cy: 360.0,
        }
    }
}
