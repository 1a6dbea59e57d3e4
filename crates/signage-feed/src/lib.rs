use anyhow::Result;

pub mod test_pattern;

pub use test_pattern::TestPatternFeed;

/// One decoded image from the colour camera.
pub struct CameraFrame {
    /// RGBA8 pixel data, row-major, no padding.
    pub data: Vec<u8>,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Capture time in the tracker's clock (seconds), if the source shares
    /// that clock. Poses are matched against it.
    pub timestamp: Option<f64>,
}

/// Source of colour camera images for the background texture.
pub trait FrameSource: Send {
    /// Fetch the next frame. Returns `None` if no new frame is available.
    fn try_frame(&mut self) -> Result<Option<CameraFrame>>;

    /// Size of the frames this source produces.
    fn resolution(&self) -> (u32, u32);
}
