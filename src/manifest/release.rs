//! Release manifest — the crate-wide summary of every archive's version and
//! checksum, and its compact wire serialization for client transmission.
//!
//! The checksum is a CRC-32 (the standard reflected IEEE 802.3 polynomial,
//! `0xEDB88320`) computed over the *raw*, undecoded page-chain bytes of
//! each archive's manifest folder — not over the decoded `ArchiveManifest`.
//! Building one therefore needs both the index table and the page-chain
//! reader; see [`crate::cache::Cache::get_release_manifest`].

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReleaseManifestError {
    #[error(transparent)]
    Index(#[from] crate::index::IndexError),
    #[error(transparent)]
    Chain(#[from] crate::page_chain::ChainError),
}

/// Per-archive version + checksum pairs, indexed by archive id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseManifest {
    pub versions: Vec<u32>,
    pub checksums: Vec<u32>,
}

impl ReleaseManifest {
    pub fn archive_count(&self) -> usize {
        self.versions.len()
    }

    /// Serialize as `[0x00][len:u32(BE)][ (checksum:u32, version:u32) per archive, BE ]`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(5 + self.versions.len() * 8);
        out.write_u8(0).unwrap();
        out.write_u32::<BigEndian>((self.versions.len() * 8) as u32).unwrap();
        for i in 0..self.versions.len() {
            out.write_u32::<BigEndian>(self.checksums[i]).unwrap();
            out.write_u32::<BigEndian>(self.versions[i]).unwrap();
        }
        out
    }

    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let mut cur = std::io::Cursor::new(data);
        if cur.read_u8().ok()? != 0 {
            return None;
        }
        let len = cur.read_u32::<BigEndian>().ok()?;
        let count = (len / 8) as usize;
        let mut versions = Vec::with_capacity(count);
        let mut checksums = Vec::with_capacity(count);
        for _ in 0..count {
            checksums.push(cur.read_u32::<BigEndian>().ok()?);
            versions.push(cur.read_u32::<BigEndian>().ok()?);
        }
        Some(Self { versions, checksums })
    }
}

/// CRC-32 with the reflected IEEE 802.3 polynomial (`crc32fast`'s default),
/// matching the checksum stored per archive in the release manifest.
pub fn crc32(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}
