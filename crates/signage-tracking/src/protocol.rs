use crate::types::Pose;
use std::collections::VecDeque;
use thiserror::Error;

/// Frame marker emitted by the tracking bridge before every pose.
pub const MAGIC: [u8; 4] = *b"POSE";

/// timestamp (f64) + rotation (4 x f32) + translation (3 x f32).
const BODY_LEN: usize = 8 + 4 * 4 + 3 * 4;
/// Full frame size including the marker.
pub const FRAME_LEN: usize = MAGIC.len() + BODY_LEN;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Discarded {skipped} bytes before the next frame marker")]
    Desync { skipped: usize },
}

/// Streaming parser for the little-endian pose stream.
///
/// Feed raw bytes via `push_data`, then drain poses via `next_pose`.
pub struct PoseStreamParser {
    buffer: VecDeque<u8>,
}

impl PoseStreamParser {
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::with_capacity(FRAME_LEN * 64),
        }
    }

    /// Append received bytes to the internal buffer.
    pub fn push_data(&mut self, data: &[u8]) {
        self.buffer.extend(data);
    }

    /// Try to extract the next complete pose from the buffer.
    /// Returns `None` if no complete frame is available yet.
    pub fn next_pose(&mut self) -> Option<Result<Pose, ProtocolError>> {
        let buf = self.buffer.make_contiguous();

        let start = match find_pattern(buf, &MAGIC) {
            Some(pos) => pos,
            None => {
                // Keep a tail that could still be the start of a marker.
                let keep = MAGIC.len() - 1;
                if buf.len() <= keep {
                    return None;
                }
                let skipped = buf.len() - keep;
                self.buffer.drain(..skipped);
                return Some(Err(ProtocolError::Desync { skipped }));
            }
        };

        if start > 0 {
            self.buffer.drain(..start);
            return Some(Err(ProtocolError::Desync { skipped: start }));
        }

        if buf.len() < FRAME_LEN {
            return None;
        }

        let pose = decode_body(&buf[MAGIC.len()..FRAME_LEN]);
        self.buffer.drain(..FRAME_LEN);
        Some(Ok(pose))
    }
}

impl Default for PoseStreamParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a pose as one frame. Used by the tracking bridge and tests.
pub fn encode_frame(pose: &Pose) -> Vec<u8> {
    let mut frame = Vec::with_capacity(FRAME_LEN);
    frame.extend_from_slice(&MAGIC);
    frame.extend_from_slice(&pose.timestamp.to_le_bytes());
    for v in pose.rotation.iter().chain(pose.translation.iter()) {
        frame.extend_from_slice(&v.to_le_bytes());
    }
    frame
}

fn decode_body(body: &[u8]) -> Pose {
    let mut ts = [0u8; 8];
    ts.copy_from_slice(&body[..8]);

    let f = |index: usize| -> f32 {
        let offset = 8 + index * 4;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&body[offset..offset + 4]);
        f32::from_le_bytes(bytes)
    };

    // Layout: [qx, qy, qz, qw, tx, ty, tz]
    Pose {
        rotation: [f(0), f(1), f(2), f(3)],
        translation: [f(4), f(5), f(6)],
        timestamp: f64::from_le_bytes(ts),
    }
}

/// Find the first occurrence of `pattern` in `data`.
fn find_pattern(data: &[u8], pattern: &[u8]) -> Option<usize> {
    data.windows(pattern.len())
        .position(|window| window == pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pose(x: f32) -> Pose {
        Pose::new([0.0, 0.0, 0.0, 1.0], [x, 2.0, 3.0]).with_timestamp(12.5)
    }

    #[test]
    fn parse_single_frame() {
        let mut parser = PoseStreamParser::new();
        parser.push_data(&encode_frame(&sample_pose(1.0)));

        let pose = parser.next_pose().unwrap().unwrap();
        assert_eq!(pose.rotation, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(pose.translation, [1.0, 2.0, 3.0]);
        assert_eq!(pose.timestamp, 12.5);

        assert!(parser.next_pose().is_none());
    }

    #[test]
    fn parse_fragmented_data() {
        let frame = encode_frame(&sample_pose(0.5));
        let mid = frame.len() / 2;

        let mut parser = PoseStreamParser::new();

        parser.push_data(&frame[..mid]);
        assert!(parser.next_pose().is_none());

        parser.push_data(&frame[mid..]);
        let pose = parser.next_pose().unwrap().unwrap();
        assert_eq!(pose.translation[0], 0.5);
    }

    #[test]
    fn parse_back_to_back_frames() {
        let mut parser = PoseStreamParser::new();
        parser.push_data(&encode_frame(&sample_pose(1.0)));
        parser.push_data(&encode_frame(&sample_pose(2.0)));

        assert_eq!(parser.next_pose().unwrap().unwrap().translation[0], 1.0);
        assert_eq!(parser.next_pose().unwrap().unwrap().translation[0], 2.0);
        assert!(parser.next_pose().is_none());
    }

    #[test]
    fn leading_garbage_is_reported_then_skipped() {
        let mut parser = PoseStreamParser::new();
        parser.push_data(&[0xde, 0xad, 0xbe]);
        parser.push_data(&encode_frame(&sample_pose(4.0)));

        assert_eq!(
            parser.next_pose(),
            Some(Err(ProtocolError::Desync { skipped: 3 }))
        );
        assert_eq!(parser.next_pose().unwrap().unwrap().translation[0], 4.0);
    }

    #[test]
    fn partial_marker_survives_garbage_flush() {
        let frame = encode_frame(&sample_pose(7.0));
        let mut parser = PoseStreamParser::new();

        // Garbage followed by the first half of a marker.
        parser.push_data(&[1, 2, 3, 4, 5]);
        parser.push_data(&frame[..2]);
        assert_eq!(
            parser.next_pose(),
            Some(Err(ProtocolError::Desync { skipped: 4 }))
        );

        parser.push_data(&frame[2..]);
        assert_eq!(
            parser.next_pose(),
            Some(Err(ProtocolError::Desync { skipped: 1 }))
        );
        assert_eq!(parser.next_pose().unwrap().unwrap().translation[0], 7.0);
    }
}
