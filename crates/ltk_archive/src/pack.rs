//! Packing a directory into a WAD archive.
//!
//! Files are read and compressed in parallel. Everything after that (sorting,
//! deduplication, checksumming and writing) is sequential so the output is
//! byte-identical for identical input.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::{Path, PathBuf};

use binrw::BinWrite;
use rayon::prelude::*;
use walkdir::WalkDir;
use xxhash_rust::xxh3::{xxh3_64, Xxh3};

use crate::decompress::{compress_zstd, is_audio};
use crate::error::{ArchiveError, Result};
use crate::toc::{
    ArchiveCompression, ArchiveHeader, TocEntry, HEADER_SIZE, TOC_ENTRY_SIZE, VERSION_MAJOR,
    VERSION_MINOR,
};

#[derive(Debug, Clone)]
pub struct PackOptions {
    /// Zstd-compress payloads. When `false` everything is stored raw.
    pub compress: bool,
    pub zstd_level: i32,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            compress: true,
            zstd_level: 3,
        }
    }
}

/// A file ready to be written: final bytes plus its TOC metadata.
#[derive(Debug, Clone)]
pub struct PreparedChunk {
    /// Normalized archive-relative path.
    pub path: String,
    pub path_hash: u64,
    pub data: Vec<u8>,
    pub uncompressed_size: u32,
    pub compression: ArchiveCompression,
    pub checksum: u64,
}

/// Statistics from writing an archive.
#[derive(Debug, Clone, Default)]
pub struct PackSummary {
    pub entries: usize,
    pub unique_payloads: usize,
    pub deduplicated: usize,
    pub bytes_written: u64,
}

#[derive(Debug, Default)]
pub struct ArchiveWriter {
    chunks: Vec<PreparedChunk>,
}

/// Uses a root file name made of exactly 16 hex digits as the path hash.
pub fn resolve_path_hash(rel_path: &str) -> u64 {
    if !rel_path.contains('/') {
        let stem = rel_path.split('.').next().unwrap_or("");
        if stem.len() == 16 && stem.chars().all(|c| c.is_ascii_hexdigit()) {
            if let Ok(hash) = u64::from_str_radix(stem, 16) {
                return hash;
            }
        }
    }
    ltk_bin::xxh64_path(rel_path)
}

/// TOC sizes are 32-bit.
fn size_field(path: &str, len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| ArchiveError::TooLarge(format!("{path}: {len} bytes")))
}

fn prepare_chunk(path: String, data: Vec<u8>, options: &PackOptions) -> Result<PreparedChunk> {
    let uncompressed_size = size_field(&path, data.len())?;
    let path_hash = resolve_path_hash(&path);

    let (data, compression) = if !options.compress || is_audio(&path, &data) {
        (data, ArchiveCompression::None)
    } else {
        (compress_zstd(&data, options.zstd_level)?, ArchiveCompression::Zstd)
    };
    let checksum = xxh3_64(&data);

    Ok(PreparedChunk {
        path,
        path_hash,
        data,
        uncompressed_size,
        compression,
        checksum,
    })
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gathers and compresses every file under `dir`.
    pub fn from_directory(dir: impl AsRef<Path>, options: &PackOptions) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files: Vec<(String, PathBuf)> = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(dir)
                .ok()
                .and_then(Path::to_str)
                .ok_or_else(|| ArchiveError::InvalidPath(entry.path().to_path_buf()))?;
            files.push((ltk_bin::normalize_path(rel), entry.path().to_path_buf()));
        }

        let chunks = files
            .into_par_iter()
            .map(|(rel, full)| -> Result<PreparedChunk> {
                let data = std::fs::read(&full)?;
                prepare_chunk(rel, data, options)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut writer = Self::new();
        for chunk in chunks {
            writer.push(chunk);
        }
        Ok(writer)
    }

    /// Adds one in-memory file.
    pub fn add(&mut self, path: &str, data: Vec<u8>, options: &PackOptions) -> Result<()> {
        let chunk = prepare_chunk(ltk_bin::normalize_path(path), data, options)?;
        self.push(chunk);
        Ok(())
    }

    fn push(&mut self, chunk: PreparedChunk) {
        self.chunks.push(chunk);
    }

    pub fn chunks(&self) -> &[PreparedChunk] {
        &self.chunks
    }

    /// Archive-relative paths of everything queued so far.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().map(|c| c.path.as_str())
    }

    /// Sorts by path hash and drops repeated hashes, keeping the first.
    fn sorted_chunks(&self) -> Vec<&PreparedChunk> {
        let mut sorted: Vec<&PreparedChunk> = self.chunks.iter().collect();
        sorted.sort_by_key(|c| c.path_hash);
        let before = sorted.len();
        sorted.dedup_by(|later, first| {
            let duplicate = later.path_hash == first.path_hash;
            if duplicate {
                tracing::warn!(
                    "Dropping duplicate path hash path={} kept={} path_hash={:016x}",
                    later.path,
                    first.path,
                    later.path_hash
                );
            }
            duplicate
        });
        if sorted.len() != before {
            tracing::debug!("Removed duplicate entries count={}", before - sorted.len());
        }
        sorted
    }

    /// Writes header, TOC and deduplicated payloads.
    pub fn write_to<W: Write + Seek>(&self, writer: &mut W) -> Result<PackSummary> {
        let sorted = self.sorted_chunks();

        let mut hasher = Xxh3::new();
        hasher.update(&[b'R', b'W', VERSION_MAJOR, VERSION_MINOR]);
        for chunk in &sorted {
            hasher.update(&chunk.path_hash.to_le_bytes());
            hasher.update(&chunk.checksum.to_le_bytes());
        }

        let entry_count = u32::try_from(sorted.len())
            .map_err(|_| ArchiveError::TooLarge(format!("{} entries", sorted.len())))?;
        let header = ArchiveHeader {
            checksum: hasher.digest(),
            entry_count,
            ..Default::default()
        };

        // Payloads with the same checksum and bytes share one offset.
        let mut offset = HEADER_SIZE + TOC_ENTRY_SIZE * sorted.len() as u64;
        let mut seen: HashMap<u64, (usize, u32)> = HashMap::new();
        let mut entries = Vec::with_capacity(sorted.len());
        let mut payloads: Vec<&[u8]> = Vec::new();
        let mut deduplicated = 0usize;

        for (index, chunk) in sorted.iter().enumerate() {
            let shared = seen
                .get(&chunk.checksum)
                .filter(|(first, _)| sorted[*first].data == chunk.data)
                .map(|(_, offset)| *offset);
            let data_offset = match shared {
                Some(existing) => {
                    deduplicated += 1;
                    existing
                }
                None => {
                    let this_offset = u32::try_from(offset)
                        .map_err(|_| ArchiveError::TooLarge(format!("offset {offset}")))?;
                    seen.entry(chunk.checksum).or_insert((index, this_offset));
                    payloads.push(&chunk.data);
                    offset += chunk.data.len() as u64;
                    this_offset
                }
            };

            entries.push(TocEntry {
                path_hash: chunk.path_hash,
                data_offset,
                compressed_size: size_field(&chunk.path, chunk.data.len())?,
                uncompressed_size: chunk.uncompressed_size,
                type_flags: chunk.compression.into(),
                subchunk: [0; 3],
                checksum: chunk.checksum,
            });
        }

        header.write(writer)?;
        for entry in &entries {
            entry.write(writer)?;
        }
        for payload in &payloads {
            writer.write_all(payload)?;
        }
        writer.flush()?;

        let summary = PackSummary {
            entries: entries.len(),
            unique_payloads: payloads.len(),
            deduplicated,
            bytes_written: offset,
        };
        tracing::info!(
            "Packed archive entries={} unique={} deduplicated={} bytes={}",
            summary.entries,
            summary.unique_payloads,
            summary.deduplicated,
            summary.bytes_written
        );
        Ok(summary)
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<PackSummary> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(path)?);
        self.write_to(&mut out)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_to(&mut cursor)?;
        Ok(cursor.into_inner())
    }
}

/// Packs a directory into archive bytes.
pub fn pack_directory(dir: impl AsRef<Path>, options: &PackOptions) -> Result<Vec<u8>> {
    ArchiveWriter::from_directory(dir, options)?.to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::Archive;
    use std::fs;

    #[test]
    fn test_size_field_rejects_oversized_payloads() {
        assert_eq!(size_field("a.bin", 4096).unwrap(), 4096);
        assert_eq!(size_field("a.bin", u32::MAX as usize).unwrap(), u32::MAX);
        #[cfg(target_pointer_width = "64")]
        assert!(matches!(
            size_field("a.bin", u32::MAX as usize + 1),
            Err(ArchiveError::TooLarge(_))
        ));
    }

    fn source_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("ASSETS/Characters/Ahri")).unwrap();
        fs::write(dir.path().join("ASSETS/Characters/Ahri/skin.dds"), vec![7u8; 4096]).unwrap();
        fs::write(dir.path().join("ASSETS/Characters/Ahri/copy.dds"), vec![7u8; 4096]).unwrap();
        fs::write(dir.path().join("ASSETS/Characters/Ahri/vo.bnk"), b"BKHD bank data").unwrap();
        fs::write(dir.path().join("0123456789abcdef.bin"), b"hash named").unwrap();
        dir
    }

    #[test]
    fn test_pack_is_deterministic() {
        let dir = source_dir();
        let first = pack_directory(dir.path(), &PackOptions::default()).unwrap();
        let second = pack_directory(dir.path(), &PackOptions::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_identical_payloads_share_offset() {
        let dir = source_dir();
        let writer = ArchiveWriter::from_directory(dir.path(), &PackOptions::default()).unwrap();
        let bytes = writer.to_bytes().unwrap();
        let archive = Archive::mount(Cursor::new(bytes)).unwrap();

        let skin = *archive.find_path("assets/characters/ahri/skin.dds").unwrap();
        let copy = *archive.find_path("assets/characters/ahri/copy.dds").unwrap();
        assert_eq!(skin.data_offset, copy.data_offset);
        assert_eq!(skin.checksum, copy.checksum);
        assert_eq!(skin.compression(), ArchiveCompression::Zstd);

        let summary = writer.write_to(&mut Cursor::new(Vec::new())).unwrap();
        assert_eq!(summary.entries, 4);
        assert_eq!(summary.unique_payloads, 3);
        assert_eq!(summary.deduplicated, 1);
    }

    #[test]
    fn test_toc_sorted_and_checksummed() {
        let dir = source_dir();
        let bytes = pack_directory(dir.path(), &PackOptions::default()).unwrap();
        let mut archive = Archive::mount(Cursor::new(bytes)).unwrap();
        let entries = archive.entries().to_vec();
        assert!(entries.windows(2).all(|w| w[0].path_hash < w[1].path_hash));

        let mut hasher = Xxh3::new();
        hasher.update(&[b'R', b'W', 3, 4]);
        for entry in &entries {
            hasher.update(&entry.path_hash.to_le_bytes());
            hasher.update(&entry.checksum.to_le_bytes());
        }
        assert_eq!(archive.header().checksum, hasher.digest());

        for entry in &entries {
            let raw = archive.read_raw(entry).unwrap();
            assert_eq!(xxh3_64(&raw), entry.checksum);
        }
    }

    #[test]
    fn test_audio_raw_and_hash_named_root_file() {
        let dir = source_dir();
        let bytes = pack_directory(dir.path(), &PackOptions::default()).unwrap();
        let mut archive = Archive::mount(Cursor::new(bytes)).unwrap();

        let bank = *archive.find_path("assets/characters/ahri/vo.bnk").unwrap();
        assert_eq!(bank.compression(), ArchiveCompression::None);
        assert_eq!(archive.read_raw(&bank).unwrap(), b"BKHD bank data");

        let hashed = *archive.find(0x0123456789abcdef).unwrap();
        assert_eq!(archive.read_decompressed(&hashed).unwrap(), b"hash named");
    }

    #[test]
    fn test_uncompressed_mode() {
        let dir = source_dir();
        let options = PackOptions {
            compress: false,
            ..Default::default()
        };
        let bytes = pack_directory(dir.path(), &options).unwrap();
        let archive = Archive::mount(Cursor::new(bytes)).unwrap();
        assert!(archive
            .entries()
            .iter()
            .all(|e| e.compression() == ArchiveCompression::None
                && e.compressed_size == e.uncompressed_size));
    }

    #[test]
    fn test_resolve_path_hash() {
        assert_eq!(resolve_path_hash("0123456789abcdef.bin"), 0x0123456789abcdef);
        assert_eq!(resolve_path_hash("0123456789abcdef"), 0x0123456789abcdef);
        assert_eq!(
            resolve_path_hash("assets/0123456789abcdef.bin"),
            ltk_bin::xxh64_path("assets/0123456789abcdef.bin")
        );
        assert_eq!(resolve_path_hash("short.bin"), ltk_bin::xxh64_path("short.bin"));
    }
}
