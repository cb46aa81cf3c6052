//! Cache — the public query surface binding the bundle, index table,
//! page-chain reader, folder codec, pack splitter and manifest codecs into
//! a single read-only handle.
//!
//! This is the primary embedding surface for callers; everything below it
//! is an implementation detail reachable only for advanced use (raw page
//! bytes, individual module errors).

use std::sync::Arc;
use thiserror::Error;

use crate::bundle::{load_bundle, Bundle, BundleError};
use crate::crypto::{KeySet, ZERO_KEY};
use crate::folder::{self, DecodedFolder, FolderError};
use crate::index::{IndexError, IndexTable};
use crate::manifest::{self, ArchiveManifest, FolderManifest, ManifestError, ReleaseManifest};
use crate::pack::{self, PackError};
use crate::page_chain::{self, ChainError};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error(transparent)]
    Bundle(#[from] BundleError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Folder(#[from] FolderError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Pack(#[from] PackError),
}

/// Read-only handle over a fully-loaded cache bundle.
///
/// `Cache` is a cheap handle: the bundle and index table are both behind
/// an `Arc`, so cloning a `Cache` to share across threads only bumps
/// reference counts — nothing is copied or re-read.
#[derive(Clone)]
pub struct Cache {
    bundle: Arc<Bundle>,
    index: Arc<IndexTable>,
}

impl Cache {
    /// Build a cache over an already-loaded [`Bundle`].
    pub fn open(bundle: Bundle) -> Result<Self, CacheError> {
        let index = IndexTable::build(&bundle)?;
        Ok(Self { bundle: Arc::new(bundle), index: Arc::new(index) })
    }

    /// Load the four on-disk artifacts from `root` and build a cache over
    /// them in one step.
    pub fn open_dir(root: impl AsRef<std::path::Path>, index_count: u32) -> Result<Self, CacheError> {
        let bundle = load_bundle(root, index_count)?;
        Self::open(bundle)
    }

    /// Number of real archives (excludes the manifest index, archive 255).
    pub fn archive_count(&self) -> u32 {
        self.bundle.index_resources.len() as u32
    }

    /// Number of index files including the manifest index.
    pub fn index_count(&self) -> u32 {
        self.archive_count() + 1
    }

    /// Raw, undecoded page-chain bytes for one folder — used internally to
    /// compute release-manifest checksums, and exposed for callers that
    /// need bytes before decryption/decompression.
    pub fn get_folder_pages_raw(&self, archive_id: u32, folder_id: u32) -> Result<Vec<u8>, CacheError> {
        let record = self.index.lookup(archive_id, folder_id)?;
        let bytes = page_chain::read_chain(&self.bundle.main, archive_id, folder_id, record.offset(), record.size)?;
        Ok(bytes)
    }

    /// Decode one folder, deciphering with `key` if it is non-zero.
    pub fn get_folder(&self, archive_id: u32, folder_id: u32, key: &KeySet) -> Result<DecodedFolder, CacheError> {
        let raw = self.get_folder_pages_raw(archive_id, folder_id)?;
        Ok(folder::decode(archive_id, folder_id, &raw, key)?)
    }

    /// Convenience for folders known not to be encrypted (manifest folders,
    /// most notably).
    pub fn get_folder_unencrypted(&self, archive_id: u32, folder_id: u32) -> Result<DecodedFolder, CacheError> {
        self.get_folder(archive_id, folder_id, &ZERO_KEY)
    }

    /// Decode the `ArchiveManifest` for `archive_id`, stored unencrypted as
    /// folder `archive_id` inside archive 255.
    pub fn get_archive_manifest(&self, archive_id: u32) -> Result<ArchiveManifest, CacheError> {
        let folder = self.get_folder_unencrypted(crate::RELEASE_MANIFEST_ARCHIVE, archive_id)?;
        Ok(manifest::decode_archive_manifest(archive_id, &folder.payload)?)
    }

    pub fn get_folder_manifest(&self, archive_id: u32, folder_id: u32) -> Result<FolderManifest, CacheError> {
        let archive_manifest = self.get_archive_manifest(archive_id)?;
        archive_manifest
            .folder(folder_id)
            .cloned()
            .ok_or(CacheError::Index(IndexError::UnknownFolder { archive_id, folder_id }))
    }

    pub fn get_folder_manifest_by_name(&self, archive_id: u32, name: &str) -> Result<FolderManifest, CacheError> {
        let archive_manifest = self.get_archive_manifest(archive_id)?;
        Ok(archive_manifest.folder_by_name(name)?.clone())
    }

    /// Decode a folder and split its payload into packs, using the pack
    /// count recorded in that folder's manifest entry.
    pub fn get_packs(&self, archive_id: u32, folder_id: u32, key: &KeySet) -> Result<Vec<Vec<u8>>, CacheError> {
        let folder_manifest = self.get_folder_manifest(archive_id, folder_id)?;
        let decoded = self.get_folder(archive_id, folder_id, key)?;
        Ok(pack::split(archive_id, folder_id, &decoded.payload, folder_manifest.pack_count as usize)?)
    }

    /// Build the release manifest: per-archive version (from its
    /// `ArchiveManifest`) and CRC-32 (over the raw page-chain bytes of its
    /// manifest folder inside archive 255).
    pub fn get_release_manifest(&self) -> Result<ReleaseManifest, CacheError> {
        let count = self.archive_count();
        let mut versions = Vec::with_capacity(count as usize);
        let mut checksums = Vec::with_capacity(count as usize);

        for archive_id in 0..count {
            let archive_manifest = self.get_archive_manifest(archive_id)?;
            let raw = self.get_folder_pages_raw(crate::RELEASE_MANIFEST_ARCHIVE, archive_id)?;
            versions.push(archive_manifest.version);
            checksums.push(manifest::release::crc32(&raw));
        }

        log::info!("built release manifest over {count} archives");
        Ok(ReleaseManifest { versions, checksums })
    }
}
