//! Phase 5: On-demand retrieval
//!
//! The scan phases record only `(start, end)` byte ranges per tag and
//! locale. Actual payloads are materialized here, by seeking back into
//! the source stream. Retrieval never assumes the stream is still
//! positioned where the scan left it; it may run long after the scan,
//! on an independently reopened handle.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::RetrieveError;

/// Sentinel for "no position recorded".
pub const NOPOS: u64 = u64::MAX;

/// A half-open `[start, end)` byte range into a specific stream.
///
/// Immutable once set. A range with `end == NOPOS` is unset; a range
/// with `start == end` is a valid, positioned empty payload (the two
/// are distinct: an unset range fails retrieval, an empty one yields
/// empty output).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    start: u64,
    end: u64,
}

impl ByteRange {
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// The "no position" sentinel value.
    pub const fn unset() -> Self {
        Self {
            start: NOPOS,
            end: NOPOS,
        }
    }

    pub fn is_unset(&self) -> bool {
        self.end == NOPOS
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn len(&self) -> u64 {
        if self.is_unset() {
            0
        } else {
            self.end - self.start
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn read_range<S: Read + Seek>(stream: &mut S, range: ByteRange) -> Result<Vec<u8>, RetrieveError> {
    if range.is_unset() {
        return Err(RetrieveError::NoPosition);
    }
    stream.seek(SeekFrom::Start(range.start))?;
    let mut buf = vec![0u8; range.len() as usize];
    stream.read_exact(&mut buf)?;
    Ok(buf)
}

/// Materialize a single-line tag payload.
pub fn retrieve_string<S: Read + Seek>(
    stream: &mut S,
    range: ByteRange,
) -> Result<String, RetrieveError> {
    let bytes = read_range(stream, range)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Materialize a multi-line tag payload, one entry per physical line.
///
/// The final terminator does not produce a trailing empty entry.
pub fn retrieve_lines<S: Read + Seek>(
    stream: &mut S,
    range: ByteRange,
) -> Result<Vec<String>, RetrieveError> {
    let bytes = read_range(stream, range)?;
    let mut lines: Vec<String> = bytes
        .split(|&b| b == b'\n')
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect();
    if bytes.last() == Some(&b'\n') {
        lines.pop();
    }
    if bytes.is_empty() {
        lines.clear();
    }
    Ok(lines)
}

/// Owns one open handle onto a catalog file for on-demand reads.
///
/// The handle is held for the lifetime of the instance and released on
/// drop, on all exit paths. Independent instances may hold independent
/// handles onto the same file, each with its own position.
pub struct TagRetrieval {
    path: PathBuf,
    reader: BufReader<File>,
}

impl TagRetrieval {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let reader = BufReader::new(File::open(&path)?);
        Ok(Self { path, reader })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Single-line payload at `range`.
    pub fn string_at(&mut self, range: ByteRange) -> Result<String, RetrieveError> {
        retrieve_string(&mut self.reader, range)
    }

    /// Multi-line payload at `range`, one entry per physical line.
    pub fn lines_at(&mut self, range: ByteRange) -> Result<Vec<String>, RetrieveError> {
        retrieve_lines(&mut self.reader, range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn test_unset_range_is_not_found() {
        let mut stream = Cursor::new(b"data".to_vec());
        assert!(matches!(
            retrieve_string(&mut stream, ByteRange::unset()),
            Err(RetrieveError::NoPosition)
        ));
    }

    #[test]
    fn test_positioned_empty_range_yields_empty_output() {
        let mut stream = Cursor::new(b"data".to_vec());
        assert_eq!(retrieve_string(&mut stream, ByteRange::new(2, 2)).unwrap(), "");
        assert!(retrieve_lines(&mut stream, ByteRange::new(2, 2))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_retrieval_ignores_current_position() {
        let mut stream = Cursor::new(b"abcdef".to_vec());
        stream.set_position(5);
        assert_eq!(retrieve_string(&mut stream, ByteRange::new(1, 4)).unwrap(), "bcd");
        // A second read from a different spot must reposition again.
        assert_eq!(retrieve_string(&mut stream, ByteRange::new(0, 2)).unwrap(), "ab");
    }

    #[test]
    fn test_lines_split_without_trailing_entry() {
        let mut stream = Cursor::new(b"one\ntwo\nrest".to_vec());
        let lines = retrieve_lines(&mut stream, ByteRange::new(0, 8)).unwrap();
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn test_reopened_file_handle() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"=Nam: Widget\n").unwrap();

        let mut retrieval = TagRetrieval::open(file.path()).unwrap();
        assert_eq!(
            retrieval.string_at(ByteRange::new(6, 12)).unwrap(),
            "Widget"
        );

        // A second independent handle onto the same file.
        let mut other = TagRetrieval::open(file.path()).unwrap();
        assert_eq!(other.string_at(ByteRange::new(1, 4)).unwrap(), "Nam");
        assert_eq!(retrieval.path(), file.path());
    }
}
