//! Phase 1: Line scanner
//!
//! The scanner reads one line at a time from a byte stream, returning
//! the byte offset where each line began. Everything downstream builds
//! on these offsets: the parser records payload positions relative to
//! them, and the retrieval layer seeks back to them long after the scan.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use log::trace;

/// Reads lines from a stream while tracking byte offsets, line numbers,
/// and end-of-stream.
///
/// Lines of arbitrary length are supported; buffering is delegated to
/// the underlying reader. The scanner owns all position bookkeeping, so
/// one scanner instance must stay attached to a stream for the whole
/// scan.
pub struct LineScanner<R> {
    inner: R,
    offset: u64,
    line_number: u64,
    eof: bool,
}

impl LineScanner<BufReader<File>> {
    /// Open a file and wrap it in a scanner.
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> LineScanner<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            line_number: 0,
            eof: false,
        }
    }

    /// Read the next line, returning `(line_start_offset, text)` with
    /// the trailing newline stripped.
    ///
    /// At end-of-stream with nothing read this returns the terminal
    /// offset and an empty string; callers distinguish true EOF from an
    /// empty line via [`at_eof`](Self::at_eof), never via the text.
    pub fn read_line(&mut self) -> io::Result<(u64, String)> {
        let start = self.offset;
        let mut buf = Vec::new();
        let consumed = self.inner.read_until(b'\n', &mut buf)?;
        if consumed == 0 {
            self.eof = true;
            return Ok((start, String::new()));
        }
        self.offset += consumed as u64;
        self.line_number += 1;
        if buf.last() == Some(&b'\n') {
            buf.pop();
        } else {
            // Final line without a terminator.
            self.eof = true;
        }
        let text = String::from_utf8_lossy(&buf).into_owned();
        trace!("line {} at offset {}: {:?}", self.line_number, start, text);
        Ok((start, text))
    }

    /// Position after the last read, one past the consumed terminator.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of lines consumed so far; the last line returned by
    /// [`read_line`](Self::read_line) carries this 1-based number.
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Whether the stream is exhausted.
    pub fn at_eof(&self) -> bool {
        self.eof
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_offsets_advance_per_line() {
        let mut scanner = LineScanner::new(Cursor::new("ab\ncd\n"));
        assert_eq!(scanner.read_line().unwrap(), (0, "ab".to_string()));
        assert_eq!(scanner.offset(), 3);
        assert_eq!(scanner.read_line().unwrap(), (3, "cd".to_string()));
        assert_eq!(scanner.offset(), 6);
        assert!(!scanner.at_eof());
    }

    #[test]
    fn test_terminal_read_flags_eof() {
        let mut scanner = LineScanner::new(Cursor::new("x\n"));
        scanner.read_line().unwrap();
        let (offset, text) = scanner.read_line().unwrap();
        assert_eq!(offset, 2);
        assert!(text.is_empty());
        assert!(scanner.at_eof());
    }

    #[test]
    fn test_final_line_without_terminator() {
        let mut scanner = LineScanner::new(Cursor::new("abc"));
        assert_eq!(scanner.read_line().unwrap(), (0, "abc".to_string()));
        assert!(scanner.at_eof());
        assert_eq!(scanner.offset(), 3);
    }

    #[test]
    fn test_empty_lines_are_not_eof() {
        let mut scanner = LineScanner::new(Cursor::new("\n\nz\n"));
        assert_eq!(scanner.read_line().unwrap(), (0, String::new()));
        assert!(!scanner.at_eof());
        assert_eq!(scanner.read_line().unwrap(), (1, String::new()));
        assert_eq!(scanner.read_line().unwrap(), (2, "z".to_string()));
        assert_eq!(scanner.line_number(), 3);
    }
}
