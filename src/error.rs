//! Error types for catalog parsing and retrieval.

use thiserror::Error;

/// Result type for parsing operations.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Hard errors while scanning a tagged stream.
///
/// Schema-level problems (unknown tags, locale policy violations,
/// duplicate data, missing end tags) are not errors; they are reported
/// as [`AssignStatus`](crate::AssignStatus) codes so that callers can
/// decide per record whether to skip or abort.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The underlying stream failed. Ordinary end-of-stream is not an
    /// error; only I/O-level failures surface here.
    #[error("tag stream I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// A tag name was declared twice within one tag set.
    #[error("duplicate tag \"{0}\" in tag set")]
    DuplicateTag(String),
}

/// Errors from the on-demand retrieval layer.
#[derive(Error, Debug)]
pub enum RetrieveError {
    /// The byte range was never recorded (unset sentinel).
    #[error("no position recorded for tag data")]
    NoPosition,

    /// Seek or read on the reopened stream failed. Not retried.
    #[error("retrieval I/O failure: {0}")]
    Io(#[from] std::io::Error),
}
