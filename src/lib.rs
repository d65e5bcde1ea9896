//! Streaming parser for line-oriented tagged package catalogs.
//!
//! The tagged format interleaves single-line tags (`=Ver: 1.0`),
//! multi-line tags bracketed by start and end markers (`+Des:` ...
//! `-Des:`), optional per-tag locale suffixes (`=Sum.de: ...`), and
//! `#` comments. Catalogs can be large, so the parser records
//! byte-accurate positions instead of materializing tag payloads while
//! scanning; values are fetched on demand by seeking back into the
//! source stream.
//!
//! # Parsing pipeline
//!
//! 1. **Line scanner**: reads one line at a time from a stream,
//!    recording the byte offset where each line began.
//!
//! 2. **Tag line classifier**: decides whether a line opens, starts,
//!    or ends a tag, and extracts the tag name and locale suffix.
//!
//! 3. **Tagged parser**: a stateful single-pass machine locating tag
//!    occurrences and their payload byte ranges.
//!
//! 4. **Tag sets**: match declared schema tags against encountered
//!    tags, apply locale preference and duplicate rules, and assemble
//!    whole records.
//!
//! 5. **Retrieval**: re-opens byte ranges against the source stream to
//!    materialize tag values lazily.

mod classify;
mod error;
mod locale;
mod parser;
mod retrieve;
mod scanner;
mod tag;
mod tagset;

pub use classify::{classify, LineKind, TagLine};
pub use error::{ParseError, Result, RetrieveError};
pub use locale::Locale;
pub use parser::{ParseCursor, ParseOptions, TaggedParser};
pub use retrieve::{retrieve_lines, retrieve_string, ByteRange, TagRetrieval, NOPOS};
pub use scanner::LineScanner;
pub use tag::{AcceptPolicy, AssignStatus, EndTagRule, LocalePolicy, Tag, TagDefinition, TagKind};
pub use tagset::TagSet;
