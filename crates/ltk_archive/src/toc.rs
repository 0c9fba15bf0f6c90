//! WAD v3 header and table of contents.

use binrw::binrw;

pub const HEADER_SIZE: u64 = 272;
pub const TOC_ENTRY_SIZE: u64 = 32;
pub const VERSION_MAJOR: u8 = 3;
pub const VERSION_MINOR: u8 = 4;

#[binrw]
#[brw(little, magic = b"RW")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveHeader {
    pub major: u8,
    pub minor: u8,
    /// Written as zeroes; never verified.
    pub signature: [u8; 256],
    /// XXH3-64 over the version tag and every `(path_hash, checksum)` pair.
    pub checksum: u64,
    pub entry_count: u32,
}

impl Default for ArchiveHeader {
    fn default() -> Self {
        Self {
            major: VERSION_MAJOR,
            minor: VERSION_MINOR,
            signature: [0u8; 256],
            checksum: 0,
            entry_count: 0,
        }
    }
}

/// A 32-byte TOC record.
#[binrw]
#[brw(little)]
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocEntry {
    pub path_hash: u64,
    pub data_offset: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    /// Low nibble: [`ArchiveCompression`]. High nibble: sub-chunk count.
    pub type_flags: u8,
    pub subchunk: [u8; 3],
    /// XXH3-64 of the on-disk bytes.
    pub checksum: u64,
}

impl TocEntry {
    pub fn compression(&self) -> ArchiveCompression {
        ArchiveCompression::from(self.type_flags & 0x0f)
    }

    pub fn subchunk_count(&self) -> u8 {
        self.type_flags >> 4
    }

    pub fn data_range(&self) -> (u64, u64) {
        let start = self.data_offset as u64;
        (start, start + self.compressed_size as u64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveCompression {
    None,
    Gzip,
    /// Reference to another file; carries no payload we can use.
    Satellite,
    Zstd,
    /// Raw prefix followed by zstd frames.
    ZstdMulti,
    Unknown(u8),
}

impl From<u8> for ArchiveCompression {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::None,
            1 => Self::Gzip,
            2 => Self::Satellite,
            3 => Self::Zstd,
            4 => Self::ZstdMulti,
            other => Self::Unknown(other),
        }
    }
}

impl From<ArchiveCompression> for u8 {
    fn from(value: ArchiveCompression) -> Self {
        match value {
            ArchiveCompression::None => 0,
            ArchiveCompression::Gzip => 1,
            ArchiveCompression::Satellite => 2,
            ArchiveCompression::Zstd => 3,
            ArchiveCompression::ZstdMulti => 4,
            ArchiveCompression::Unknown(other) => other & 0x0f,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binrw::{BinRead, BinWrite};
    use std::io::Cursor;

    #[test]
    fn test_record_sizes() {
        let mut cursor = Cursor::new(Vec::new());
        ArchiveHeader::default().write(&mut cursor).unwrap();
        assert_eq!(cursor.get_ref().len() as u64, HEADER_SIZE);
        assert_eq!(&cursor.get_ref()[..4], &[b'R', b'W', 3, 4]);

        let mut cursor = Cursor::new(Vec::new());
        TocEntry::default().write(&mut cursor).unwrap();
        assert_eq!(cursor.get_ref().len() as u64, TOC_ENTRY_SIZE);
    }

    #[test]
    fn test_entry_layout() {
        let entry = TocEntry {
            path_hash: 0x0102030405060708,
            data_offset: 0x11,
            compressed_size: 0x22,
            uncompressed_size: 0x33,
            type_flags: 0x13,
            subchunk: [0, 0, 0],
            checksum: 0xaabb,
        };
        let mut cursor = Cursor::new(Vec::new());
        entry.write(&mut cursor).unwrap();
        let bytes = cursor.into_inner();
        assert_eq!(bytes[0], 0x08);
        assert_eq!(bytes[8], 0x11);
        assert_eq!(bytes[20], 0x13);
        assert_eq!(bytes[24], 0xbb);

        let read = TocEntry::read(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(read, entry);
        assert_eq!(read.compression(), ArchiveCompression::Zstd);
        assert_eq!(read.subchunk_count(), 1);
    }

    #[test]
    fn test_compression_nibble() {
        for value in 0u8..5 {
            assert_eq!(u8::from(ArchiveCompression::from(value)), value);
        }
        assert_eq!(ArchiveCompression::from(9), ArchiveCompression::Unknown(9));
    }
}
