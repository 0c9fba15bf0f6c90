//! Error types for property bin encoding and decoding.
//!
//! Binary decode errors carry the byte offset where the problem was detected.
//! Text decode errors carry the dotted node path instead. Every error returned
//! by this crate is fatal for the call that produced it: a misframed offset
//! invalidates everything that follows, so nothing is partially recovered.

use crate::kind::BinKind;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BinError>;

#[derive(Error, Debug)]
pub enum BinError {
    /// Writing to the in-memory buffer failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid magic {found:?} at offset {offset}")]
    InvalidMagic { offset: u64, found: [u8; 4] },

    #[error("unknown type tag 0x{tag:02x} at offset {offset}")]
    UnknownKind { offset: u64, tag: u8 },

    /// A length-prefixed structure did not consume exactly its declared size.
    #[error("length mismatch at offset {offset}: declared {declared} bytes, consumed {actual}")]
    LengthMismatch {
        offset: u64,
        declared: u64,
        actual: u64,
    },

    #[error("unexpected end of data at offset {offset}")]
    UnexpectedEof { offset: u64 },

    #[error("invalid UTF-8 string at offset {offset}")]
    InvalidUtf8 { offset: u64 },

    /// Containers nest deeper than the decoder follows.
    #[error("nesting deeper than {limit} levels at offset {offset}")]
    TooDeep { offset: u64, limit: usize },

    #[error("invalid option item count {count} at offset {offset}")]
    InvalidOptionCount { offset: u64, count: u8 },

    /// A container holds a child whose kind differs from the declared element kind.
    #[error("kind mismatch at {at}: expected {expected:?}, found {found:?}")]
    KindMismatch {
        at: String,
        expected: BinKind,
        found: BinKind,
    },

    /// A pointer with a zero class hash must not carry fields.
    #[error("null pointer with {count} field(s) at {at}")]
    NullPointerWithFields { at: String, count: usize },

    #[error("missing section '{0}'")]
    MissingSection(&'static str),

    #[error("invalid section '{name}': {reason}")]
    InvalidSection { name: String, reason: String },

    /// A value is too large to fit in its length or count field.
    #[error("{what} too large at {at}: {size}")]
    TooLarge {
        what: &'static str,
        at: String,
        size: usize,
    },

    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// Malformed textual tree.
    #[error("text error at {path}: {message}")]
    Text { path: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BinError {
    pub(crate) fn text(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Text {
            path: path.into(),
            message: message.into(),
        }
    }
}
