//! Fixed-capacity line buffer.
//!
//! Bytes accumulate at the back. The cursor marks where the newest,
//! unterminated line starts; everything before it has already been reported as
//! a completed line. Matches are removed with [`LineBuffer::strip`], which
//! shifts the remaining bytes down and keeps the cursor on the same line.
//!
//! A line longer than the whole buffer is discarded, and the rest of it is
//! skipped up to and including its terminator, so no fragment of it is ever
//! reported as a line.

use std::ops::Range;

/// A byte range inside a [`LineBuffer`], valid until the buffer next compacts.
///
/// Stripping a span whose buffer has since been compacted does nothing, which
/// makes a repeated strip of the same match harmless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    range: Range<usize>,
    generation: u64,
}

impl Span {
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }
}

/// What [`LineBuffer::make_room`] had to throw away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Room {
    /// Already-reported lines were dropped.
    Compacted(usize),
    /// The unterminated line filled the whole buffer and was dropped. Input is
    /// skipped until that line's terminator.
    Discarded(usize),
}

#[derive(Debug)]
pub struct LineBuffer {
    data: Vec<u8>,
    capacity: usize,
    cursor: usize,
    terminator: u8,
    generation: u64,
    overflows: u64,
    skipping: bool,
}

impl LineBuffer {
    pub fn new(capacity: usize, terminator: u8) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
            terminator,
            generation: 0,
            overflows: 0,
            skipping: false,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    /// Offset where the newest line starts.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The newest line: everything from the cursor on, not yet terminated.
    pub fn latest_line(&self) -> &[u8] {
        &self.data[self.cursor..]
    }

    /// How many times an unterminated line had to be discarded.
    pub fn overflows(&self) -> u64 {
        self.overflows
    }

    /// Whether the rest of a discarded line is still being dropped.
    pub fn is_skipping(&self) -> bool {
        self.skipping
    }

    /// Append one byte. Returns the range of the line it completed, terminator
    /// included, if `byte` is the terminator.
    ///
    /// The caller must [`make_room`](Self::make_room) first when the buffer is
    /// full; a byte pushed into a full buffer is dropped, as is every byte up
    /// to the terminator of a discarded line.
    pub fn push(&mut self, byte: u8) -> Option<Range<usize>> {
        if self.skipping {
            self.skipping = byte != self.terminator;
            return None;
        }
        if self.is_full() {
            return None;
        }
        self.data.push(byte);
        if byte != self.terminator {
            return None;
        }
        let line = self.cursor..self.data.len();
        self.cursor = self.data.len();
        Some(line)
    }

    /// Free space in a full buffer, oldest data first.
    pub fn make_room(&mut self) -> Room {
        if self.cursor > 0 {
            Room::Compacted(self.discard_observed())
        } else {
            let dropped = self.data.len();
            self.clear();
            self.skipping = true;
            self.overflows += 1;
            Room::Discarded(dropped)
        }
    }

    /// Drop every completed line, keeping the unterminated tail.
    pub fn discard_observed(&mut self) -> usize {
        let dropped = self.cursor;
        if dropped > 0 {
            self.data.drain(..dropped);
            self.cursor = 0;
            self.generation += 1;
        }
        dropped
    }

    /// A span over `range`, for a later [`strip`](Self::strip).
    pub fn span(&self, range: Range<usize>) -> Span {
        Span {
            range,
            generation: self.generation,
        }
    }

    /// Remove exactly the bytes covered by `span` and shift the rest down.
    ///
    /// Returns the number of bytes removed; a stale or out-of-range span
    /// removes nothing.
    pub fn strip(&mut self, span: &Span) -> usize {
        let Range { start, end } = span.range;
        if span.generation != self.generation || start > end || end > self.data.len() {
            return 0;
        }
        self.data.drain(start..end);
        let removed = end - start;
        if self.cursor >= end {
            self.cursor -= removed;
        } else if self.cursor > start {
            self.cursor = start;
        }
        self.generation += 1;
        removed
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.cursor = 0;
        self.skipping = false;
        self.generation += 1;
    }
}

/// `line` without its terminator and a trailing carriage return.
pub(crate) fn trim_line_end(line: &[u8], terminator: u8) -> &[u8] {
    let line = line.strip_suffix(&[terminator]).unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(buffer: &mut LineBuffer, bytes: &[u8]) -> Vec<Range<usize>> {
        bytes.iter().filter_map(|&b| buffer.push(b)).collect()
    }

    #[test]
    fn test_lines_detected_at_terminator() {
        let mut buffer = LineBuffer::new(64, b'\n');
        let lines = fill(&mut buffer, b"AT\r\nOK\r\npart");
        assert_eq!(lines, vec![0..4, 4..8]);
        assert_eq!(buffer.latest_line(), b"part");
        assert_eq!(buffer.cursor(), 8);
    }

    #[test]
    fn test_strip_removes_exact_range() {
        let mut buffer = LineBuffer::new(64, b'\n');
        fill(&mut buffer, b"AT\r\nOK\r\nnext");
        let span = buffer.span(4..6);
        assert_eq!(buffer.strip(&span), 2);
        assert_eq!(buffer.as_bytes(), b"AT\r\n\r\nnext");
        assert_eq!(buffer.latest_line(), b"next");
    }

    #[test]
    fn test_strip_twice_is_noop() {
        let mut buffer = LineBuffer::new(64, b'\n');
        fill(&mut buffer, b"+CREG: 1\r\nOK");
        let span = buffer.span(0..8);
        assert_eq!(buffer.strip(&span), 8);
        let after = buffer.as_bytes().to_vec();
        assert_eq!(buffer.strip(&span), 0);
        assert_eq!(buffer.as_bytes(), after.as_slice());
    }

    #[test]
    fn test_strip_inside_partial_line_moves_cursor() {
        let mut buffer = LineBuffer::new(64, b'\n');
        fill(&mut buffer, b"done\n> ");
        let span = buffer.span(5..7);
        buffer.strip(&span);
        assert_eq!(buffer.as_bytes(), b"done\n");
        assert_eq!(buffer.cursor(), 5);
        assert!(buffer.latest_line().is_empty());
    }

    #[test]
    fn test_out_of_range_span_ignored() {
        let mut buffer = LineBuffer::new(8, b'\n');
        fill(&mut buffer, b"abc");
        let span = buffer.span(2..9);
        assert_eq!(buffer.strip(&span), 0);
        assert_eq!(buffer.as_bytes(), b"abc");
    }

    #[test]
    fn test_make_room_drops_observed_lines_first() {
        let mut buffer = LineBuffer::new(8, b'\n');
        fill(&mut buffer, b"ab\ncdefg");
        assert!(buffer.is_full());
        assert_eq!(buffer.make_room(), Room::Compacted(3));
        assert_eq!(buffer.as_bytes(), b"cdefg");
        assert_eq!(buffer.overflows(), 0);
    }

    #[test]
    fn test_make_room_discards_oversized_line() {
        let mut buffer = LineBuffer::new(4, b'\n');
        fill(&mut buffer, b"abcd");
        assert_eq!(buffer.make_room(), Room::Discarded(4));
        assert!(buffer.is_empty());
        assert_eq!(buffer.overflows(), 1);
    }

    #[test]
    fn test_discarded_line_skipped_to_terminator() {
        let mut buffer = LineBuffer::new(4, b'\n');
        fill(&mut buffer, b"abcd");
        buffer.make_room();
        assert!(buffer.is_skipping());
        assert!(fill(&mut buffer, b"ef\n").is_empty());
        assert!(buffer.is_empty());
        assert!(!buffer.is_skipping());
        assert_eq!(fill(&mut buffer, b"OK\n"), vec![0..3]);
    }

    #[test]
    fn test_clear_stops_skipping() {
        let mut buffer = LineBuffer::new(2, b'\n');
        fill(&mut buffer, b"ab");
        buffer.make_room();
        buffer.clear();
        assert!(!buffer.is_skipping());
        assert_eq!(buffer.latest_line(), b"");
        fill(&mut buffer, b"x");
        assert_eq!(buffer.latest_line(), b"x");
    }

    #[test]
    fn test_push_into_full_buffer_is_dropped() {
        let mut buffer = LineBuffer::new(2, b'\n');
        fill(&mut buffer, b"ab");
        assert_eq!(buffer.push(b'\n'), None);
        assert_eq!(buffer.as_bytes(), b"ab");
    }

    #[test]
    fn test_discard_observed_keeps_tail() {
        let mut buffer = LineBuffer::new(32, b'\n');
        fill(&mut buffer, b"old\nnew");
        assert_eq!(buffer.discard_observed(), 4);
        assert_eq!(buffer.as_bytes(), b"new");
        assert_eq!(buffer.cursor(), 0);
    }

    #[test]
    fn test_trim_line_end() {
        assert_eq!(trim_line_end(b"OK\r\n", b'\n'), b"OK");
        assert_eq!(trim_line_end(b"OK\n", b'\n'), b"OK");
        assert_eq!(trim_line_end(b"OK", b'\n'), b"OK");
        assert_eq!(trim_line_end(b"\r\n", b'\n'), b"");
    }
}
