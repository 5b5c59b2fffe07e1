use tracing::trace;

use super::FLAG;

/// Frames must be longer than this to be emitted; anything shorter cannot hold a checksum.
pub const MIN_FRAME_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq)]
enum State {
    Searching,
    InFrame(Vec<u8>),
}

/// Splits a byte stream on flag bytes.
///
/// A flag both closes the currently open frame and opens the next, so back-to-back frames may
/// share a flag. Frames of [MIN_FRAME_LEN] bytes or less are dropped, as is a frame still open
/// when the input ends.
#[derive(Debug, Clone)]
pub struct FrameExtractor {
    state: State,
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameExtractor {
    #[must_use]
    pub fn new() -> Self {
        FrameExtractor {
            state: State::Searching,
        }
    }

    /// Feed a single byte, returning a frame if this byte closed one.
    pub fn push(&mut self, byte: u8) -> Option<Vec<u8>> {
        if byte == FLAG {
            let prev = std::mem::replace(&mut self.state, State::InFrame(Vec::default()));
            return match prev {
                State::InFrame(frame) if frame.len() > MIN_FRAME_LEN => Some(frame),
                State::InFrame(frame) => {
                    if !frame.is_empty() {
                        trace!(len = frame.len(), "dropping short frame");
                    }
                    None
                }
                State::Searching => None,
            };
        }
        if let State::InFrame(ref mut frame) = self.state {
            frame.push(byte);
        }
        None
    }

    #[must_use]
    pub fn is_in_frame(&self) -> bool {
        matches!(self.state, State::InFrame(_))
    }
}

/// Extract all complete frames from `bytes`.
#[must_use]
pub fn extract_frames(bytes: &[u8]) -> Vec<Vec<u8>> {
    let mut extractor = FrameExtractor::new();
    bytes.iter().filter_map(|b| extractor.push(*b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(&[0x01, 0x02, 0x03], 0; "no flags")]
    #[test_case(&[FLAG, 0x01, 0x02, 0x03, FLAG], 1; "single")]
    #[test_case(&[FLAG, 0x01, 0x02, 0x03, FLAG, 0x04, 0x05, 0x06, FLAG], 2; "shared flag")]
    #[test_case(&[FLAG, 0x01, 0x02, 0x03, FLAG, FLAG, 0x04, 0x05, 0x06, FLAG], 2; "double flag")]
    #[test_case(&[0x09, FLAG, 0x01, 0x02, 0x03, FLAG, 0x09], 1; "garbage outside")]
    #[test_case(&[FLAG, 0x01, 0x02, FLAG], 0; "too short")]
    #[test_case(&[FLAG, 0x01, 0x02, 0x03, 0x04], 0; "unterminated")]
    fn frame_counts(input: &[u8], expected: usize) {
        assert_eq!(extract_frames(input).len(), expected);
    }

    #[test]
    fn frame_content_is_verbatim() {
        let frames = extract_frames(&[0x00, FLAG, 0xaa, 0xbb, 0xcc, FLAG, 0xdd, 0xee, 0xff, FLAG]);
        assert_eq!(frames, vec![vec![0xaa, 0xbb, 0xcc], vec![0xdd, 0xee, 0xff]]);
    }

    #[test]
    fn state_transitions() {
        let mut extractor = FrameExtractor::new();
        assert!(!extractor.is_in_frame());
        assert!(extractor.push(0x01).is_none());
        assert!(!extractor.is_in_frame(), "bytes before a flag are ignored");
        assert!(extractor.push(FLAG).is_none());
        assert!(extractor.is_in_frame());
        for b in [1, 2, 3] {
            assert!(extractor.push(b).is_none());
        }
        assert_eq!(extractor.push(FLAG), Some(vec![1, 2, 3]));
        assert!(extractor.is_in_frame(), "closing flag opens the next frame");
    }
}
