use crate::{CameraFrame, FrameSource};
use anyhow::Result;
use tracing::info;

/// Stand-in camera that produces a checkerboard, used when no colour camera
/// is attached.
pub struct TestPatternFeed {
    width: u32,
    height: u32,
    /// Pre-generated pattern (avoids regenerating every frame).
    cached_frame: Vec<u8>,
    /// The pattern never changes, so it is only sent once.
    sent: bool,
}

impl TestPatternFeed {
    pub fn new(width: u32, height: u32) -> Self {
        info!(width, height, "Test pattern camera feed initialized");

        let (r, g, b) = (60u8, 70u8, 80u8);
        let pixel_count = (width * height) as usize;
        let mut data = Vec::with_capacity(pixel_count * 4);
        let checker_size = 64u32;

        for y in 0..height {
            for x in 0..width {
                let is_light = ((x / checker_size) + (y / checker_size)) % 2 == 0;
                let factor = if is_light { 1.0_f32 } else { 0.6 };
                data.push((r as f32 * factor) as u8);
                data.push((g as f32 * factor) as u8);
                data.push((b as f32 * factor) as u8);
                data.push(255);
            }
        }

        Self {
            width,
            height,
            cached_frame: data,
            sent: false,
        }
    }
}

impl FrameSource for TestPatternFeed {
    fn try_frame(&mut self) -> Result<Option<CameraFrame>> {
        if self.sent {
            return Ok(None);
        }
        self.sent = true;

        Ok(Some(CameraFrame {
            data: self.cached_frame.clone(),
            width: self.width,
            height: self.height,
            timestamp: None,
        }))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_is_sent_once() {
        let mut feed = TestPatternFeed::new(128, 64);
        let frame = feed.try_frame().unwrap().unwrap();
        assert_eq!(frame.data.len(), 128 * 64 * 4);
        assert_eq!((frame.width, frame.height), feed.resolution());
        assert_eq!(frame.timestamp, None);
        assert!(feed.try_frame().unwrap().is_none());
    }

    #[test]
    fn adjacent_cells_differ() {
        let mut feed = TestPatternFeed::new(128, 64);
        let frame = feed.try_frame().unwrap().unwrap();
        let px = |x: usize| &frame.data[x * 4..x * 4 + 4];
        assert_ne!(px(0), px(64));
        assert_eq!(px(0)[3], 255);
    }
}
