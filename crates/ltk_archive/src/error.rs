//! Error types for archive operations.
//!
//! All fallible functions in this crate return [`Result<T>`]. Scanning several
//! sources never fails as a whole: per-source and per-entry problems are
//! collected as [`SourceOmission`](crate::SourceOmission)s instead.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from `binrw` while reading or writing the header or TOC.
    #[error("binary layout error: {0}")]
    Binary(#[from] binrw::Error),

    #[error("not a WAD archive (bad magic)")]
    InvalidMagic,

    #[error("unsupported WAD version {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },

    /// The file is shorter than a structure that must be present.
    #[error("archive truncated: {len} bytes, need at least {needed}")]
    Truncated { len: u64, needed: u64 },

    /// An entry's data range runs past the end of the file.
    #[error("entry {path_hash:016x} out of bounds: offset {offset} + size {size} > {len}")]
    EntryOutOfBounds {
        path_hash: u64,
        offset: u64,
        size: u64,
        len: u64,
    },

    #[error("failed to decompress entry {path_hash:016x}: {reason}")]
    Decompression { path_hash: u64, reason: String },

    #[error("compression failed: {0}")]
    Compression(String),

    /// Paths packed into an archive must be valid UTF-8.
    #[error("invalid path: {0}")]
    InvalidPath(PathBuf),

    /// The archive does not fit the 32-bit offsets and sizes of the TOC.
    #[error("archive too large: {0}")]
    TooLarge(String),
}
