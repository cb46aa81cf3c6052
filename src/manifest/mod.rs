//! Archive and release manifests — metadata about every archive's folders
//! (format, version, directive flags, label hashes, per-folder checksums)
//! and the crate-wide summary built from them.

pub mod archive;
pub mod release;

pub use archive::{decode as decode_archive_manifest, ArchiveManifest, FolderManifest, ManifestError};
pub use release::{ReleaseManifest, ReleaseManifestError};
