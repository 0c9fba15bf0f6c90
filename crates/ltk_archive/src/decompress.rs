//! Payload decompression and compression helpers.

use std::io::{Read, Write};

use flate2::read::GzDecoder;

use crate::error::{ArchiveError, Result};
use crate::toc::{ArchiveCompression, TocEntry};

pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];
pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Audio bank and package magics (`.bnk` / `.wpk`).
const WWISE_BANK_MAGIC: &[u8; 4] = b"BKHD";
const WWISE_PACKAGE_MAGIC: &[u8; 4] = b"r3d2";

pub(crate) fn find_zstd_magic_offset(raw: &[u8]) -> Option<usize> {
    raw.windows(ZSTD_MAGIC.len()).position(|w| w == ZSTD_MAGIC)
}

/// Decompresses an entry's on-disk bytes.
///
/// Magic bytes win over the declared compression kind. A zstd payload that
/// fails to decode is returned as-is.
pub fn decompress(raw: &[u8], entry: &TocEntry) -> Result<Vec<u8>> {
    let declared = entry.compression();

    if declared == ArchiveCompression::ZstdMulti {
        return Ok(decompress_zstd_multi(raw));
    }

    if raw.starts_with(&ZSTD_MAGIC) || declared == ArchiveCompression::Zstd {
        return Ok(match zstd::stream::decode_all(raw) {
            Ok(data) => data,
            Err(err) => {
                tracing::debug!(
                    "zstd decode failed, keeping raw bytes path_hash={:016x} error={}",
                    entry.path_hash,
                    err
                );
                raw.to_vec()
            }
        });
    }

    if raw.starts_with(&GZIP_MAGIC) || declared == ArchiveCompression::Gzip {
        let mut out = Vec::with_capacity(entry.uncompressed_size as usize);
        GzDecoder::new(raw)
            .read_to_end(&mut out)
            .map_err(|err| ArchiveError::Decompression {
                path_hash: entry.path_hash,
                reason: err.to_string(),
            })?;
        return Ok(out);
    }

    Ok(raw.to_vec())
}

/// Uncompressed prefix followed by zstd data.
fn decompress_zstd_multi(raw: &[u8]) -> Vec<u8> {
    let Some(prefix_len) = find_zstd_magic_offset(raw) else {
        return raw.to_vec();
    };
    match zstd::stream::decode_all(&raw[prefix_len..]) {
        Ok(rest) => {
            let mut out = Vec::with_capacity(prefix_len + rest.len());
            out.extend_from_slice(&raw[..prefix_len]);
            out.extend_from_slice(&rest);
            out
        }
        Err(_) => raw.to_vec(),
    }
}

/// Compress data using Zstd compression.
pub fn compress_zstd(data: &[u8], level: i32) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut encoder = zstd::Encoder::new(&mut out, level)?;
    encoder.write_all(data)?;
    encoder.finish()?;
    Ok(out)
}

/// Audio containers are stored uncompressed.
pub fn is_audio(path: &str, data: &[u8]) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".bnk")
        || lower.ends_with(".wpk")
        || data.starts_with(WWISE_BANK_MAGIC)
        || data.starts_with(WWISE_PACKAGE_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(compression: ArchiveCompression) -> TocEntry {
        TocEntry {
            type_flags: compression.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_find_zstd_magic() {
        let data = vec![0x00, 0x01, 0x28, 0xB5, 0x2F, 0xFD, 0x02];
        assert_eq!(find_zstd_magic_offset(&data), Some(2));
        assert_eq!(find_zstd_magic_offset(&[0x00, 0x01]), None);
    }

    #[test]
    fn test_zstd_is_sniffed_regardless_of_declared_kind() {
        let compressed = compress_zstd(b"hello world", 3).unwrap();
        let out = decompress(&compressed, &entry(ArchiveCompression::None)).unwrap();
        assert_eq!(out, b"hello world");
    }

    #[test]
    fn test_broken_zstd_falls_back_to_raw() {
        let raw = b"definitely not zstd";
        let out = decompress(raw, &entry(ArchiveCompression::Zstd)).unwrap();
        assert_eq!(out, raw);
    }

    #[test]
    fn test_gzip() {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"gzip payload").unwrap();
        let compressed = encoder.finish().unwrap();
        let out = decompress(&compressed, &entry(ArchiveCompression::None)).unwrap();
        assert_eq!(out, b"gzip payload");
    }

    #[test]
    fn test_zstd_multi_keeps_prefix() {
        let mut raw = b"PREFIX".to_vec();
        raw.extend(compress_zstd(b"body", 3).unwrap());
        let out = decompress(&raw, &entry(ArchiveCompression::ZstdMulti)).unwrap();
        assert_eq!(out, b"PREFIXbody");
    }

    #[test]
    fn test_raw_passthrough() {
        let out = decompress(b"plain", &entry(ArchiveCompression::None)).unwrap();
        assert_eq!(out, b"plain");
    }

    #[test]
    fn test_audio_detection() {
        assert!(is_audio("assets/sounds/vo.BNK", b""));
        assert!(is_audio("x", b"r3d2...."));
        assert!(!is_audio("assets/a.dds", b"DDS "));
    }
}
