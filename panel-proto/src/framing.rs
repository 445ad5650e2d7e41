//! Line framing: accumulate inbound bytes until LF.
//!
//! The transport hands the runtime whatever bytes are buffered; this
//! accumulator assembles them into complete lines. A line longer than
//! [`MAX_FRAME_LENGTH`] is discarded through its terminating newline so one
//! oversized frame cannot cascade into parse errors on the frames behind it.

use heapless::Vec;

/// Maximum frame length in bytes, matching the panel's JSON working area.
pub const MAX_FRAME_LENGTH: usize = 2048;

/// Outcome of feeding one byte to the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Framed {
    /// Byte stored; no complete line yet.
    Pending,
    /// A complete line is available via [`LineAccumulator::line`].
    Line,
    /// An oversized line just ended and was discarded.
    Discarded,
}

/// Accumulates bytes into newline-terminated frames.
#[derive(Debug, Default)]
pub struct LineAccumulator {
    buf: Vec<u8, MAX_FRAME_LENGTH>,
    overflow: bool,
}

impl LineAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            overflow: false,
        }
    }

    /// Feed one byte.
    ///
    /// On [`Framed::Line`] the caller reads [`line`](Self::line) and then
    /// calls [`clear`](Self::clear) before feeding further bytes.
    pub fn push(&mut self, byte: u8) -> Framed {
        if byte == b'\n' {
            if self.overflow {
                self.overflow = false;
                return Framed::Discarded;
            }
            return Framed::Line;
        }
        if self.overflow {
            return Framed::Pending;
        }
        if self.buf.push(byte).is_err() {
            // Oversized line: drop what we have and skip to the next newline.
            self.buf.clear();
            self.overflow = true;
        }
        Framed::Pending
    }

    /// The accumulated line, without its terminating newline.
    #[inline]
    #[must_use]
    pub fn line(&self) -> &[u8] {
        &self.buf
    }

    /// Discard the accumulated line.
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    fn feed(acc: &mut LineAccumulator, bytes: &[u8]) -> std::vec::Vec<std::vec::Vec<u8>> {
        let mut lines = std::vec::Vec::new();
        for &b in bytes {
            match acc.push(b) {
                Framed::Line => {
                    lines.push(acc.line().to_vec());
                    acc.clear();
                }
                Framed::Pending | Framed::Discarded => {}
            }
        }
        lines
    }

    #[test]
    fn test_single_line() {
        let mut acc = LineAccumulator::new();
        let lines = feed(&mut acc, b"{\"type\":\"panel_heartbeat\"}\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], b"{\"type\":\"panel_heartbeat\"}");
    }

    #[test]
    fn test_split_across_feeds() {
        let mut acc = LineAccumulator::new();
        assert!(feed(&mut acc, b"{\"type\":").is_empty());
        let lines = feed(&mut acc, b"\"panel_heartbeat\"}\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], b"{\"type\":\"panel_heartbeat\"}");
    }

    #[test]
    fn test_multiple_lines_in_one_feed() {
        let mut acc = LineAccumulator::new();
        let lines = feed(&mut acc, b"one\ntwo\nthree\n");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], b"two");
    }

    #[test]
    fn test_empty_line() {
        let mut acc = LineAccumulator::new();
        let lines = feed(&mut acc, b"\n");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].is_empty());
    }

    #[test]
    fn test_oversized_line_discarded() {
        let mut acc = LineAccumulator::new();
        for _ in 0..MAX_FRAME_LENGTH + 100 {
            let _ = acc.push(b'x');
        }
        // The terminating newline ends the discard, not a line.
        assert_eq!(acc.push(b'\n'), Framed::Discarded);

        // The next frame parses normally.
        let lines = feed(&mut acc, b"ok\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], b"ok");
    }

    #[test]
    fn test_line_at_exact_capacity() {
        let mut acc = LineAccumulator::new();
        for _ in 0..MAX_FRAME_LENGTH {
            assert_eq!(acc.push(b'x'), Framed::Pending);
        }
        assert_eq!(acc.push(b'\n'), Framed::Line);
        assert_eq!(acc.line().len(), MAX_FRAME_LENGTH);
    }
}
