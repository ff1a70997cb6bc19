//! Frame extraction
//!
//! Scans a raw byte buffer for `F0 ... F7` delimited messages.

/// Start-of-exclusive status byte
pub const SYSEX_START: u8 = 0xF0;

/// End-of-exclusive status byte
pub const SYSEX_END: u8 = 0xF7;

/// One delimited message, borrowed from the input buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    offset: usize,
    bytes: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Byte offset of the start delimiter in the input buffer
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The full frame, delimiters included
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// The frame body with both delimiters stripped
    pub fn core(&self) -> &'a [u8] {
        &self.bytes[1..self.bytes.len() - 1]
    }
}

/// Iterator over the frames of a buffer, in buffer order.
///
/// Cloning the iterator restarts the scan from the clone's position.
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    raw: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for Frames<'a> {
    type Item = Frame<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.raw.get(self.pos..)?;
        let start = self.pos + rest.iter().position(|&b| b == SYSEX_START)?;

        // An unterminated start delimiter swallows the rest of the buffer
        let Some(len) = self.raw[start + 1..].iter().position(|&b| b == SYSEX_END) else {
            self.pos = self.raw.len();
            return None;
        };
        let end = start + 1 + len;

        self.pos = end + 1;
        Some(Frame {
            offset: start,
            bytes: &self.raw[start..=end],
        })
    }
}

/// Scan `raw` for delimiter-bounded frames
pub fn frames(raw: &[u8]) -> Frames<'_> {
    Frames { raw, pos: 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_frames_in_order() {
        let raw = [0x00, 0xF0, 0x01, 0x02, 0xF7, 0x55, 0xF0, 0x03, 0xF7];
        let found: Vec<Frame> = frames(&raw).collect();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].offset(), 1);
        assert_eq!(found[0].bytes(), &[0xF0, 0x01, 0x02, 0xF7]);
        assert_eq!(found[0].core(), &[0x01, 0x02]);
        assert_eq!(found[1].offset(), 6);
        assert_eq!(found[1].core(), &[0x03]);
    }

    #[test]
    fn test_unterminated_frame_is_dropped() {
        let raw = [0xF0, 0x01, 0xF7, 0xF0, 0x02, 0x03];
        let found: Vec<Frame> = frames(&raw).collect();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].core(), &[0x01]);
    }

    #[test]
    fn test_empty_core_frame() {
        let raw = [0xF0, 0xF7];
        let found: Vec<Frame> = frames(&raw).collect();

        assert_eq!(found.len(), 1);
        assert!(found[0].core().is_empty());
        assert_eq!(found[0].bytes(), &[0xF0, 0xF7]);
    }

    #[test]
    fn test_no_frames_in_plain_data() {
        assert_eq!(frames(&[0x01, 0x02, 0xF7]).count(), 0);
        assert_eq!(frames(&[]).count(), 0);
    }

    #[test]
    fn test_iterator_is_restartable() {
        let raw = [0xF0, 0x01, 0xF7, 0xF0, 0x02, 0xF7];
        let mut iter = frames(&raw);
        iter.next();

        let snapshot = iter.clone();
        assert_eq!(iter.count(), 1);
        assert_eq!(snapshot.count(), 1);
        assert_eq!(frames(&raw).count(), 2);
    }
}
