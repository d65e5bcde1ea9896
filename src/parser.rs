//! Phase 3: Tagged parser
//!
//! A stateful, single-pass state machine over the scanner and the
//! classifier. `lookup_tag` locates the next matching tag occurrence in
//! the stream and records the payload's byte positions; for multi-line
//! tags, `lookup_end_tag` then scans forward for the closing marker.
//! Matching is strictly first-occurrence-in-stream; there is no
//! backtracking or lookahead beyond the current scan position.

use std::io::BufRead;

use log::{debug, trace};

use crate::classify::{classify, LineKind};
use crate::error::Result;
use crate::retrieve::{ByteRange, NOPOS};
use crate::scanner::LineScanner;

/// Mode flags for a parser instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Recognize legacy oldstyle tags (uppercase-led `NAME:` lines).
    pub oldstyle: bool,
}

const BLANKS: &[char] = &[' ', '\t'];

/// Where the parser currently is: the last matched tag occurrence and
/// its payload byte positions. Overwritten by every successful lookup.
#[derive(Debug, Clone)]
pub struct ParseCursor {
    pub kind: LineKind,
    pub tag: String,
    pub locale: String,
    /// Offset of the tag line's first byte.
    pub tag_start: u64,
    /// Offset of the payload's first byte.
    pub data_start: u64,
    /// Offset one past the payload's last byte.
    pub data_end: u64,
    /// 1-based line number of the tag line, for diagnostics.
    pub line: u64,
}

impl ParseCursor {
    fn new() -> Self {
        Self {
            kind: LineKind::None,
            tag: String::new(),
            locale: String::new(),
            tag_start: NOPOS,
            data_start: NOPOS,
            data_end: NOPOS,
            line: 0,
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    /// The recorded payload range, unset if no data position was taken.
    pub fn data_range(&self) -> ByteRange {
        if self.data_end == NOPOS {
            ByteRange::unset()
        } else {
            ByteRange::new(self.data_start, self.data_end)
        }
    }
}

/// The tag lookup state machine.
pub struct TaggedParser {
    options: ParseOptions,
    cursor: ParseCursor,
    data_text: Option<String>,
}

impl TaggedParser {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            cursor: ParseCursor::new(),
            data_text: None,
        }
    }

    /// The last matched occurrence.
    pub fn cursor(&self) -> &ParseCursor {
        &self.cursor
    }

    /// Trimmed same-line data of the last matched tag line, if any.
    /// This is what single-line tags capture immediately.
    pub fn same_line_data(&self) -> Option<&str> {
        self.data_text.as_deref()
    }

    /// Scan forward for the next tag occurrence.
    ///
    /// When `wanted_tag` (and `wanted_locale`) are non-empty, only
    /// occurrences matching them are considered; other tag lines are
    /// passed over. On a match the cursor records the tag position and
    /// the payload range: same-line data spans from the first
    /// non-blank byte after the separator through the last non-blank
    /// byte; with no same-line data the range is empty, positioned past
    /// the end of the line (a multi-line body follows there).
    ///
    /// Returns the matched [`LineKind`], or [`LineKind::None`] once the
    /// stream is exhausted.
    pub fn lookup_tag<R: BufRead>(
        &mut self,
        scanner: &mut LineScanner<R>,
        wanted_tag: &str,
        wanted_locale: &str,
    ) -> Result<LineKind> {
        self.cursor.reset();
        self.data_text = None;

        while !scanner.at_eof() {
            let (start, line) = scanner.read_line()?;
            if line.is_empty() && scanner.at_eof() {
                break;
            }
            let tag_line = classify(&line, self.options.oldstyle);
            if tag_line.kind == LineKind::None {
                continue;
            }
            if !wanted_tag.is_empty() && tag_line.name != wanted_tag {
                trace!("passing over tag {:?}", tag_line.name);
                continue;
            }
            if !wanted_locale.is_empty() && tag_line.locale != wanted_locale {
                continue;
            }

            debug!(
                "tag {:?} locale {:?} at offset {} line {}",
                tag_line.name,
                tag_line.locale,
                start,
                scanner.line_number()
            );
            self.cursor.kind = tag_line.kind;
            self.cursor.tag = tag_line.name;
            self.cursor.locale = tag_line.locale;
            self.cursor.tag_start = start;
            self.cursor.line = scanner.line_number();

            let rest = &line[tag_line.data_offset..];
            match rest.find(|c| c != ' ' && c != '\t') {
                Some(skip) => {
                    let from = tag_line.data_offset + skip;
                    let to = line.trim_end_matches(BLANKS).len();
                    self.cursor.data_start = start + from as u64;
                    self.cursor.data_end = start + to as u64;
                    self.data_text = Some(line[from..to].to_string());
                }
                None => {
                    // No same-line data: empty range past the line end,
                    // where a multi-line body would begin.
                    self.cursor.data_start = scanner.offset();
                    self.cursor.data_end = scanner.offset();
                }
            }
            return Ok(self.cursor.kind);
        }
        Ok(LineKind::None)
    }

    /// Scan forward for the end tag closing a multi-line payload.
    ///
    /// Resets only the payload end position; the start recorded by
    /// [`lookup_tag`](Self::lookup_tag) stays. On a match the payload
    /// end becomes the start offset of the end-tag line, so the payload
    /// excludes the end-tag line itself.
    ///
    /// Returns [`LineKind::None`] if the stream runs out first; the
    /// caller must treat that as a missing end tag, after which the
    /// stream position is unreliable.
    pub fn lookup_end_tag<R: BufRead>(
        &mut self,
        scanner: &mut LineScanner<R>,
        end_tag: &str,
        end_locale: &str,
    ) -> Result<LineKind> {
        self.cursor.data_end = NOPOS;

        while !scanner.at_eof() {
            let (start, line) = scanner.read_line()?;
            if line.is_empty() && scanner.at_eof() {
                break;
            }
            let tag_line = classify(&line, self.options.oldstyle);
            if tag_line.kind != LineKind::End || tag_line.name != end_tag {
                continue;
            }
            if !end_locale.is_empty() && tag_line.locale != end_locale {
                continue;
            }
            self.cursor.data_end = start;
            return Ok(LineKind::End);
        }
        debug!("end tag {:?} not found before end of stream", end_tag);
        Ok(LineKind::None)
    }
}
