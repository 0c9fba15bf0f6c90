//! Read access to a mounted archive.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use binrw::BinRead;

use crate::decompress::decompress;
use crate::error::{ArchiveError, Result};
use crate::toc::{ArchiveHeader, TocEntry, HEADER_SIZE, TOC_ENTRY_SIZE, VERSION_MAJOR};

/// A mounted WAD archive: header, TOC and the underlying reader.
#[derive(Debug)]
pub struct Archive<R> {
    reader: R,
    header: ArchiveHeader,
    entries: Vec<TocEntry>,
    len: u64,
}

impl Archive<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::mount(BufReader::new(file))
    }
}

impl<R: Read + Seek> Archive<R> {
    /// Reads the header and TOC.
    ///
    /// A TOC that ends early keeps the complete entries read so far.
    pub fn mount(mut reader: R) -> Result<Self> {
        let len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        if len < HEADER_SIZE {
            return Err(ArchiveError::Truncated {
                len,
                needed: HEADER_SIZE,
            });
        }

        let header = ArchiveHeader::read(&mut reader).map_err(|err| match err {
            binrw::Error::BadMagic { .. } => ArchiveError::InvalidMagic,
            other => ArchiveError::Binary(other),
        })?;
        if header.major != VERSION_MAJOR {
            return Err(ArchiveError::UnsupportedVersion {
                major: header.major,
                minor: header.minor,
            });
        }

        let available = ((len - HEADER_SIZE) / TOC_ENTRY_SIZE) as usize;
        let declared = header.entry_count as usize;
        let mut entries = Vec::with_capacity(declared.min(available));
        for _ in 0..declared {
            match TocEntry::read(&mut reader) {
                Ok(entry) => entries.push(entry),
                Err(_) => break,
            }
        }
        if entries.len() < declared {
            tracing::warn!(
                "Short archive TOC, keeping complete entries declared={} read={}",
                declared,
                entries.len()
            );
        }

        Ok(Self {
            reader,
            header,
            entries,
            len,
        })
    }

    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }

    /// Looks up an entry by path hash. Relies on the TOC being sorted.
    pub fn find(&self, path_hash: u64) -> Option<&TocEntry> {
        self.entries
            .binary_search_by_key(&path_hash, |e| e.path_hash)
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn find_path(&self, path: &str) -> Option<&TocEntry> {
        self.find(ltk_bin::xxh64_path(path))
    }

    /// Reads the on-disk bytes of an entry.
    pub fn read_raw(&mut self, entry: &TocEntry) -> Result<Vec<u8>> {
        let (start, end) = entry.data_range();
        if end > self.len {
            return Err(ArchiveError::EntryOutOfBounds {
                path_hash: entry.path_hash,
                offset: start,
                size: entry.compressed_size as u64,
                len: self.len,
            });
        }
        self.reader.seek(SeekFrom::Start(start))?;
        let mut data = vec![0u8; entry.compressed_size as usize];
        self.reader.read_exact(&mut data)?;
        Ok(data)
    }

    pub fn read_decompressed(&mut self, entry: &TocEntry) -> Result<Vec<u8>> {
        let raw = self.read_raw(entry)?;
        decompress(&raw, entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::{pack_directory, PackOptions};
    use std::io::Cursor;

    fn sample_archive() -> Vec<u8> {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/one.txt"), b"first file").unwrap();
        std::fs::write(dir.path().join("assets/two.txt"), b"second file").unwrap();
        pack_directory(dir.path(), &PackOptions::default()).unwrap()
    }

    #[test]
    fn test_mount_and_read() {
        let bytes = sample_archive();
        let mut archive = Archive::mount(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.entries().len(), 2);
        assert_eq!(archive.header().minor, 4);

        let entry = *archive.find_path("ASSETS/One.txt").unwrap();
        assert_eq!(archive.read_decompressed(&entry).unwrap(), b"first file");
        assert!(archive.find_path("assets/three.txt").is_none());
    }

    #[test]
    fn test_short_toc_keeps_complete_entries() {
        let mut bytes = sample_archive();
        bytes.truncate((HEADER_SIZE + TOC_ENTRY_SIZE + 10) as usize);
        let archive = Archive::mount(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.entries().len(), 1);
    }

    #[test]
    fn test_entry_out_of_bounds() {
        let mut bytes = sample_archive();
        let mut archive = Archive::mount(Cursor::new(bytes.clone())).unwrap();
        let mut entry = archive.entries()[0];
        entry.compressed_size = u32::MAX;
        assert!(matches!(
            archive.read_raw(&entry),
            Err(ArchiveError::EntryOutOfBounds { .. })
        ));

        bytes[0] = b'X';
        assert!(matches!(
            Archive::mount(Cursor::new(bytes)),
            Err(ArchiveError::InvalidMagic)
        ));
    }

    #[test]
    fn test_too_short_for_header() {
        assert!(matches!(
            Archive::mount(Cursor::new(vec![b'R', b'W', 3, 4])),
            Err(ArchiveError::Truncated { .. })
        ));
    }
}
