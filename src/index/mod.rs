//! Index table — the flat per-archive record tables that map a folder id to
//! its location in the main data file.
//!
//! Each `.idxN` resource (and the `.idx255` manifest index) is a flat array
//! of 6-byte records with no header; this module only turns those raw
//! bytes into addressable [`IndexRecord`]s, keyed by archive id.

use std::collections::HashMap;
use thiserror::Error;

use crate::bundle::Bundle;
use crate::page::PAGE_SIZE;

pub const RECORD_SIZE: usize = 6;

/// Why an index resource failed to parse — both of spec.md §7's
/// `MalformedIndex` cases, kept as one error variant with enough context
/// to locate the fault.
#[derive(Debug)]
pub enum MalformedIndexReason {
    /// Resource length is not a multiple of [`RECORD_SIZE`].
    BadLength { len: usize },
    /// A record's `offset + size` extends past the main data file.
    RecordOutOfBounds { folder_id: u32, end: u64, main_len: u64 },
}

impl std::fmt::Display for MalformedIndexReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MalformedIndexReason::BadLength { len } => {
                write!(f, "length {len} is not a multiple of {RECORD_SIZE}")
            }
            MalformedIndexReason::RecordOutOfBounds { folder_id, end, main_len } => {
                write!(
                    f,
                    "folder {folder_id} extends to byte {end}, past the end of the main data \
                     file ({main_len} bytes)"
                )
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("index resource for archive {archive_id} is malformed: {reason}")]
    MalformedIndex { archive_id: u32, reason: MalformedIndexReason },
    #[error("unknown archive {archive_id}")]
    UnknownArchive { archive_id: u32 },
    #[error("archive {archive_id} has no folder {folder_id}")]
    UnknownFolder { archive_id: u32, folder_id: u32 },
}

/// One 6-byte index record: a 24-bit folder size and a 24-bit first page
/// number. `offset()` turns the latter into a byte address in the main
/// data file.
#[derive(Debug, Clone, Copy)]
pub struct IndexRecord {
    pub size: u32,
    pub first_page: u32,
}

impl IndexRecord {
    pub fn offset(&self) -> u64 {
        self.first_page as u64 * PAGE_SIZE as u64
    }
}

fn read_u24(b: &[u8]) -> u32 {
    (b[0] as u32) << 16 | (b[1] as u32) << 8 | b[2] as u32
}

fn parse_records(archive_id: u32, data: &[u8], main_len: u64) -> Result<Vec<IndexRecord>, IndexError> {
    if data.len() % RECORD_SIZE != 0 {
        return Err(IndexError::MalformedIndex {
            archive_id,
            reason: MalformedIndexReason::BadLength { len: data.len() },
        });
    }

    let mut records = Vec::with_capacity(data.len() / RECORD_SIZE);
    for (folder_id, chunk) in data.chunks_exact(RECORD_SIZE).enumerate() {
        let record = IndexRecord {
            size: read_u24(&chunk[0..3]),
            first_page: read_u24(&chunk[3..6]),
        };
        let end = record.offset() + record.size as u64;
        if end > main_len {
            return Err(IndexError::MalformedIndex {
                archive_id,
                reason: MalformedIndexReason::RecordOutOfBounds { folder_id: folder_id as u32, end, main_len },
            });
        }
        records.push(record);
    }
    Ok(records)
}

/// Flat table of per-archive folder records, including the manifest
/// index (archive id [`crate::RELEASE_MANIFEST_ARCHIVE`]).
#[derive(Debug)]
pub struct IndexTable {
    archives: HashMap<u32, Vec<IndexRecord>>,
}

impl IndexTable {
    /// Build the table from a loaded bundle. An empty index resource is
    /// legal — it parses to zero records rather than an error, and
    /// represents an archive id that is reserved but currently empty.
    pub fn build(bundle: &Bundle) -> Result<Self, IndexError> {
        let main_len = bundle.main.len() as u64;
        let mut archives = HashMap::with_capacity(bundle.index_resources.len() + 1);

        for (archive_id, resource) in bundle.index_resources.iter().enumerate() {
            let records = parse_records(archive_id as u32, resource, main_len)?;
            archives.insert(archive_id as u32, records);
        }

        let manifest_records = parse_records(crate::RELEASE_MANIFEST_ARCHIVE, &bundle.manifest_resource, main_len)?;
        archives.insert(crate::RELEASE_MANIFEST_ARCHIVE, manifest_records);

        Ok(Self { archives })
    }

    pub fn lookup(&self, archive_id: u32, folder_id: u32) -> Result<IndexRecord, IndexError> {
        let records = self
            .archives
            .get(&archive_id)
            .ok_or(IndexError::UnknownArchive { archive_id })?;
        records
            .get(folder_id as usize)
            .copied()
            .ok_or(IndexError::UnknownFolder { archive_id, folder_id })
    }

    pub fn folder_count(&self, archive_id: u32) -> Option<usize> {
        self.archives.get(&archive_id).map(Vec::len)
    }

    pub fn archive_ids(&self) -> impl Iterator<Item = &u32> {
        self.archives.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_bytes(size: u32, first_page: u32) -> [u8; 6] {
        [
            (size >> 16) as u8,
            (size >> 8) as u8,
            size as u8,
            (first_page >> 16) as u8,
            (first_page >> 8) as u8,
            first_page as u8,
        ]
    }

    #[test]
    fn parses_single_record_within_bounds() {
        let data = record_bytes(100, 0);
        let records = parse_records(0, &data, PAGE_SIZE as u64).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].size, 100);
        assert_eq!(records[0].offset(), 0);
    }

    #[test]
    fn rejects_misaligned_length() {
        let data = vec![0u8; 5];
        let err = parse_records(0, &data, 1000).unwrap_err();
        assert!(matches!(
            err,
            IndexError::MalformedIndex { archive_id: 0, reason: MalformedIndexReason::BadLength { len: 5 } }
        ));
    }

    #[test]
    fn rejects_record_past_main_data() {
        let data = record_bytes(10, 100);
        let err = parse_records(3, &data, 100).unwrap_err();
        assert!(matches!(
            err,
            IndexError::MalformedIndex { archive_id: 3, reason: MalformedIndexReason::RecordOutOfBounds { .. } }
        ));
    }

    #[test]
    fn empty_resource_is_legal() {
        let records = parse_records(1, &[], 0).unwrap();
        assert!(records.is_empty());
    }
}
