//! WAD (`RW` v3.4) archive support.
//!
//! - [`Archive`] mounts an archive and reads entries by path hash.
//! - [`scan_sources`] runs batched lookups over an ordered list of archives,
//!   skipping sources that are missing or not archives at all.
//! - [`ArchiveWriter`] packs a directory into a sorted, deduplicated and
//!   checksummed archive.

pub mod archive;
pub mod decompress;
pub mod error;
pub mod pack;
pub mod scan;
pub mod toc;

pub use archive::Archive;
pub use decompress::decompress;
pub use error::{ArchiveError, Result};
pub use pack::{pack_directory, ArchiveWriter, PackOptions, PackSummary, PreparedChunk};
pub use scan::{extract, scan_sources, MatchSlot, MatchTable, ScanMatch, ScanMode, ScanReport, SourceOmission};
pub use toc::{ArchiveCompression, ArchiveHeader, TocEntry};
