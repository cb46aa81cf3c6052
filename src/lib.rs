//! # assetcache — read-side engine for a legacy game-asset cache
//!
//! Format guarantees:
//! - A bundle is three on-disk artifacts: one bulk data file, N per-archive
//!   index files, and one manifest index (archive 255) — see [`bundle`].
//! - Every folder is reassembled from a chain of self-linking 520-byte
//!   pages — see [`page`] and [`page_chain`].
//! - A folder blob is optionally XTEA-enciphered, then optionally BZIP2 or
//!   GZIP compressed — see [`folder`] and [`crypto`].
//! - Multi-pack folders are chunk-interleaved on disk; [`pack`] reverses
//!   the transpose.
//! - Archive 255 holds one manifest per archive, itself stored as a folder
//!   and requiring no key to decode; [`manifest`] decodes it and builds the
//!   compact release-manifest summary.
//! - [`cache`] binds all of the above into the public query surface. This
//!   crate only reads caches — it never builds or mutates one.

pub mod bundle;
pub mod cache;
pub mod crypto;
pub mod folder;
pub mod index;
pub mod manifest;
pub mod pack;
pub mod page;
pub mod page_chain;

/// Archive id reserved for the manifest index (`.idx255`).
pub const RELEASE_MANIFEST_ARCHIVE: u32 = 255;

pub use bundle::{load_bundle, Bundle, BundleError};
pub use cache::{Cache, CacheError};
pub use crypto::KeySet;
pub use folder::DecodedFolder;
pub use manifest::{ArchiveManifest, FolderManifest, ReleaseManifest};
