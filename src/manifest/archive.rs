//! Archive manifest codec — sequential big-endian decode of one archive's
//! folder metadata. Stored itself as a folder inside archive 255, one per
//! real archive.
//!
//! # On-disk layout (big-endian)
//! ```text
//! format:u8                                   -- 5, 6 or 7
//! [ version:u32 ]                             -- only when format >= 6
//! directive:u8
//! folderCount:u16
//! folderCount * delta:u16                     -- folder ids, delta-coded
//! [ folderCount * labelHash:u32 ]             -- only when directive & 1
//! folderCount * crc:u32
//! folderCount * version:u32
//! folderCount * packCount:u16
//! ```
//! Folder ids are reconstructed as a running sum of the deltas and stored
//! densely: the table is sized to `max(folderIds) + 1`, with `None` at any
//! id that does not appear.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;
use thiserror::Error;

use crate::crypto::djb2;

pub const MIN_FORMAT: u8 = 5;
pub const MAX_FORMAT: u8 = 7;
pub const VERSIONED_FORMAT: u8 = 6;
pub const DIRECTIVE_HAS_LABELS: u8 = 0x01;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("archive {archive_id} manifest format {format} is out of range [{MIN_FORMAT}, {MAX_FORMAT}]")]
    FormatOutOfRange { archive_id: u32, format: u8 },
    #[error("archive {archive_id} manifest is truncated")]
    Truncated {
        archive_id: u32,
        #[source]
        source: std::io::Error,
    },
    #[error("no folder named {name:?} in archive {archive_id}")]
    UnknownLabel { archive_id: u32, name: String },
}

#[derive(Debug, Clone)]
pub struct FolderManifest {
    pub id: u32,
    /// Position of this folder within the delta-coded id list, i.e. the
    /// order it was declared on the wire.
    pub index: usize,
    pub label_hash: Option<u32>,
    pub version: u32,
    pub crc: u32,
    pub pack_count: u16,
}

#[derive(Debug, Clone)]
pub struct ArchiveManifest {
    pub id: u32,
    pub format: u8,
    pub version: u32,
    pub directive: u8,
    folders: Vec<Option<FolderManifest>>,
}

impl ArchiveManifest {
    pub fn has_labels(&self) -> bool {
        self.directive & DIRECTIVE_HAS_LABELS != 0
    }

    pub fn folder(&self, folder_id: u32) -> Option<&FolderManifest> {
        self.folders.get(folder_id as usize).and_then(Option::as_ref)
    }

    pub fn folder_by_name(&self, name: &str) -> Result<&FolderManifest, ManifestError> {
        let target = djb2(name) as u32;
        self.folders
            .iter()
            .flatten()
            .find(|f| f.label_hash == Some(target))
            .ok_or_else(|| ManifestError::UnknownLabel { archive_id: self.id, name: name.to_owned() })
    }

    pub fn folder_count(&self) -> usize {
        self.folders.iter().filter(|f| f.is_some()).count()
    }

    pub fn iter_folders(&self) -> impl Iterator<Item = &FolderManifest> {
        self.folders.iter().flatten()
    }
}

pub fn decode(archive_id: u32, data: &[u8]) -> Result<ArchiveManifest, ManifestError> {
    let mut cur = Cursor::new(data);
    let wrap = |source: std::io::Error| ManifestError::Truncated { archive_id, source };

    let format = cur.read_u8().map_err(wrap)?;
    if !(MIN_FORMAT..=MAX_FORMAT).contains(&format) {
        return Err(ManifestError::FormatOutOfRange { archive_id, format });
    }
    let version = if format >= VERSIONED_FORMAT {
        cur.read_u32::<BigEndian>().map_err(wrap)?
    } else {
        0
    };
    let directive = cur.read_u8().map_err(wrap)?;
    let folder_count = cur.read_u16::<BigEndian>().map_err(wrap)? as usize;

    let mut folder_ids = Vec::with_capacity(folder_count);
    let mut accumulator: u32 = 0;
    let mut max_id: i64 = -1;
    for _ in 0..folder_count {
        let delta = cur.read_u16::<BigEndian>().map_err(wrap)? as u32;
        accumulator = accumulator.wrapping_add(delta);
        folder_ids.push(accumulator);
        max_id = max_id.max(accumulator as i64);
    }

    let capacity = (max_id + 1).max(0) as usize;
    let mut folders: Vec<Option<FolderManifest>> = (0..capacity).map(|_| None).collect();
    for (index, &id) in folder_ids.iter().enumerate() {
        folders[id as usize] = Some(FolderManifest { id, index, label_hash: None, version: 0, crc: 0, pack_count: 0 });
    }

    if directive & DIRECTIVE_HAS_LABELS != 0 {
        for &id in &folder_ids {
            let hash = cur.read_u32::<BigEndian>().map_err(wrap)?;
            folders[id as usize].as_mut().unwrap().label_hash = Some(hash);
        }
    }
    for &id in &folder_ids {
        let crc = cur.read_u32::<BigEndian>().map_err(wrap)?;
        folders[id as usize].as_mut().unwrap().crc = crc;
    }
    for &id in &folder_ids {
        let version = cur.read_u32::<BigEndian>().map_err(wrap)?;
        folders[id as usize].as_mut().unwrap().version = version;
    }
    for &id in &folder_ids {
        let pack_count = cur.read_u16::<BigEndian>().map_err(wrap)?;
        folders[id as usize].as_mut().unwrap().pack_count = pack_count;
    }

    Ok(ArchiveManifest { id: archive_id, format, version, directive, folders })
}
