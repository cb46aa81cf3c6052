//! Folder codec — decrypt and decompress the page-chain-reassembled folder
//! blob into a ready-to-use payload.
//!
//! # On-disk layout
//! ```text
//! tag:u8  declaredSize:u32(BE)
//! [ decompressedSize:u32(BE) ]        -- only when tag != 0
//! payload[.. declaredSize]            -- optionally XTEA-enciphered
//! [ trailing two bytes ]              -- an undocumented version field
//! ```
//! When `tag` is non-zero the enciphered region additionally covers the
//! 4-byte `decompressedSize` prefix, so the region handed to XTEA is
//! `declaredSize + 4` bytes rather than `declaredSize`.
//!
//! BZIP2 streams on disk are missing their `BZh9` magic — it has to be
//! re-prepended before handing the stream to a standard decoder.

use byteorder::{BigEndian, ByteOrder};
use std::io::Read;
use thiserror::Error;

use crate::crypto::{self, KeySet};

pub const HEADER_SIZE: usize = 5;
pub const MAX_DECOMPRESSED_SIZE: u32 = 20_000_000;
const BZIP2_MAGIC: &[u8; 4] = b"BZh9";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Bzip2,
    Gzip,
}

impl Compression {
    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Compression::None),
            1 => Some(Compression::Bzip2),
            2 => Some(Compression::Gzip),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum FolderError {
    #[error("archive {archive_id} folder {folder_id}: blob is {len} bytes, shorter than the {HEADER_SIZE}-byte header")]
    TooShort { archive_id: u32, folder_id: u32, len: usize },
    #[error(
        "archive {archive_id} folder {folder_id}: declared size {declared} leaves only \
         {available} bytes available"
    )]
    DeclaredSizeExceedsAvailable {
        archive_id: u32,
        folder_id: u32,
        declared: u32,
        available: usize,
    },
    #[error("archive {archive_id} folder {folder_id}: unsupported compression tag {tag}")]
    UnsupportedCompression { archive_id: u32, folder_id: u32, tag: u8 },
    #[error(
        "archive {archive_id} folder {folder_id}: declared decompressed size {size} is out of \
         range (must be < {MAX_DECOMPRESSED_SIZE})"
    )]
    DecompressedSizeOutOfRange { archive_id: u32, folder_id: u32, size: u32 },
    #[error(
        "archive {archive_id} folder {folder_id}: decompressed size mismatch: header says \
         {expected}, decoder produced {actual}"
    )]
    DecompressionSizeMismatch {
        archive_id: u32,
        folder_id: u32,
        expected: u32,
        actual: usize,
    },
    #[error("archive {archive_id} folder {folder_id}: decompression failed: {source}")]
    DecompressionFailure {
        archive_id: u32,
        folder_id: u32,
        source: String,
    },
}

#[derive(Debug, Clone)]
pub struct DecodedFolder {
    pub compression: Compression,
    pub payload: Vec<u8>,
    /// Two bytes immediately following the folder payload, present
    /// whenever the underlying blob has room for them. The format of
    /// this field is not otherwise documented; see `DESIGN.md`.
    pub trailing_version: Option<[u8; 2]>,
}

/// Decode a raw, page-chain-reassembled folder blob.
///
/// `archive_id`/`folder_id` are carried only to give errors enough context
/// to locate the fault; `key` is the XTEA key, pass [`crypto::ZERO_KEY`] for
/// folders that are not encrypted (archive-manifest folders never are).
pub fn decode(archive_id: u32, folder_id: u32, raw: &[u8], key: &KeySet) -> Result<DecodedFolder, FolderError> {
    if raw.len() < HEADER_SIZE {
        return Err(FolderError::TooShort { archive_id, folder_id, len: raw.len() });
    }

    let tag = raw[0];
    let declared_size = BigEndian::read_u32(&raw[1..5]);
    let compression =
        Compression::from_tag(tag).ok_or(FolderError::UnsupportedCompression { archive_id, folder_id, tag })?;

    let enciphered_len = match compression {
        Compression::None => declared_size as usize,
        _ => declared_size as usize + 4,
    };
    if HEADER_SIZE + enciphered_len > raw.len() {
        return Err(FolderError::DeclaredSizeExceedsAvailable {
            archive_id,
            folder_id,
            declared: declared_size,
            available: raw.len().saturating_sub(HEADER_SIZE),
        });
    }

    let mut region = raw[HEADER_SIZE..HEADER_SIZE + enciphered_len].to_vec();
    if !crypto::key_is_zero(key) {
        crypto::decipher(&mut region, key);
    }

    let (payload, trailer_start) = match compression {
        Compression::None => (region, HEADER_SIZE + declared_size as usize),
        _ => {
            let decompressed_size = BigEndian::read_u32(&region[0..4]);
            if decompressed_size >= MAX_DECOMPRESSED_SIZE {
                return Err(FolderError::DecompressedSizeOutOfRange {
                    archive_id,
                    folder_id,
                    size: decompressed_size,
                });
            }
            let compressed = &region[4..4 + declared_size as usize];
            let decompressed = decompress(archive_id, folder_id, compression, compressed)?;
            if decompressed.len() != decompressed_size as usize {
                return Err(FolderError::DecompressionSizeMismatch {
                    archive_id,
                    folder_id,
                    expected: decompressed_size,
                    actual: decompressed.len(),
                });
            }
            (decompressed, HEADER_SIZE + enciphered_len)
        }
    };

    let trailing_version = if trailer_start + 2 <= raw.len() {
        Some([raw[trailer_start], raw[trailer_start + 1]])
    } else {
        None
    };

    log::debug!(
        "archive {archive_id} folder {folder_id}: decoded compression={:?} declared_size={declared_size} payload_len={}",
        compression,
        payload.len()
    );

    Ok(DecodedFolder { compression, payload, trailing_version })
}

fn decompress(archive_id: u32, folder_id: u32, compression: Compression, data: &[u8]) -> Result<Vec<u8>, FolderError> {
    match compression {
        Compression::Bzip2 => {
            use bzip2::read::BzDecoder;
            let mut prefixed = Vec::with_capacity(BZIP2_MAGIC.len() + data.len());
            prefixed.extend_from_slice(BZIP2_MAGIC);
            prefixed.extend_from_slice(data);
            let mut out = Vec::new();
            BzDecoder::new(&prefixed[..])
                .read_to_end(&mut out)
                .map_err(|e| FolderError::DecompressionFailure { archive_id, folder_id, source: e.to_string() })?;
            Ok(out)
        }
        Compression::Gzip => {
            use flate2::read::GzDecoder;
            let mut out = Vec::new();
            GzDecoder::new(data)
                .read_to_end(&mut out)
                .map_err(|e| FolderError::DecompressionFailure { archive_id, folder_id, source: e.to_string() })?;
            Ok(out)
        }
        Compression::None => unreachable!("decompress is never called for Compression::None"),
    }
}
