//! Error types for reference resolution.
//!
//! Unmatched references are not errors; they are reported in
//! [`ResolveReport::unresolved`](crate::ResolveReport::unresolved).

use camino::Utf8PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RepathError>;

#[derive(Error, Debug)]
pub enum RepathError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("property bin error: {0}")]
    Bin(#[from] ltk_bin::BinError),

    #[error("archive error: {0}")]
    Archive(#[from] ltk_archive::ArchiveError),

    /// A hash listing (path corpus or shader table) could not be read.
    #[error("listing not found: {0}")]
    ListingNotFound(Utf8PathBuf),

    #[error("invalid path: {0}")]
    InvalidPath(String),
}
