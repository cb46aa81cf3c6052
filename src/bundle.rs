//! Bundle — the fully-resident in-memory image of the on-disk cache
//! artifacts: the main data file, the per-archive index files, and the
//! manifest index (archive 255).
//!
//! Loading is a one-shot, whole-file read; nothing here is re-read once
//! [`load_bundle`] returns. [`crate::cache::Cache`] builds its query
//! surface on top of a loaded bundle.

use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("failed to read required cache file {path}")]
    Required {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Bundle {
    pub main: Vec<u8>,
    pub index_resources: Vec<Vec<u8>>,
    pub manifest_resource: Vec<u8>,
}

impl Bundle {
    pub fn new(main: Vec<u8>, index_resources: Vec<Vec<u8>>, manifest_resource: Vec<u8>) -> Self {
        Self { main, index_resources, manifest_resource }
    }
}

/// Load a bundle from `root`, reading `main_file_cache.dat2`, up to
/// `index_count` `main_file_cache.idxN` files, and `main_file_cache.idx255`.
///
/// Per-archive index files are read in order; the first one that cannot be
/// read (missing, permission denied, or otherwise) ends enumeration — the
/// remaining index ids are simply absent from the bundle rather than
/// causing a hard failure, matching the reference loader's behavior of
/// treating any read failure as "no more archives". A warning is logged
/// when this happens.
pub fn load_bundle(root: impl AsRef<Path>, index_count: u32) -> Result<Bundle, BundleError> {
    let root = root.as_ref();

    let main_path = root.join("main_file_cache.dat2");
    let main = fs::read(&main_path)
        .map_err(|source| BundleError::Required { path: main_path.display().to_string(), source })?;
    log::debug!("loaded main data file: {} bytes", main.len());

    let mut index_resources = Vec::new();
    for idx in 0..index_count {
        let path = root.join(format!("main_file_cache.idx{idx}"));
        match fs::read(&path) {
            Ok(bytes) => {
                log::debug!("loaded index file idx{idx}: {} bytes", bytes.len());
                index_resources.push(bytes);
            }
            Err(e) => {
                log::warn!("stopped archive enumeration at idx{idx} ({}): {e}", path.display());
                break;
            }
        }
    }
    log::info!("loaded {} of {index_count} requested archive indexes", index_resources.len());

    let manifest_path = root.join("main_file_cache.idx255");
    let manifest_resource = fs::read(&manifest_path)
        .map_err(|source| BundleError::Required { path: manifest_path.display().to_string(), source })?;
    log::debug!("loaded manifest index: {} bytes", manifest_resource.len());

    Ok(Bundle::new(main, index_resources, manifest_resource))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &[u8]) {
        let mut f = File::create(dir.join(name)).unwrap();
        f.write_all(contents).unwrap();
    }

    #[test]
    fn loads_full_bundle() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "main_file_cache.dat2", b"main-bytes");
        write_file(dir.path(), "main_file_cache.idx0", b"idx0-bytes");
        write_file(dir.path(), "main_file_cache.idx1", b"idx1-bytes");
        write_file(dir.path(), "main_file_cache.idx255", b"manifest-bytes");

        let bundle = load_bundle(dir.path(), 2).unwrap();
        assert_eq!(bundle.main, b"main-bytes");
        assert_eq!(bundle.index_resources.len(), 2);
        assert_eq!(bundle.manifest_resource, b"manifest-bytes");
    }

    #[test]
    fn stops_enumeration_at_first_missing_index() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "main_file_cache.dat2", b"main-bytes");
        write_file(dir.path(), "main_file_cache.idx0", b"idx0-bytes");
        // idx1 intentionally missing
        write_file(dir.path(), "main_file_cache.idx2", b"idx2-bytes");
        write_file(dir.path(), "main_file_cache.idx255", b"manifest-bytes");

        let bundle = load_bundle(dir.path(), 3).unwrap();
        assert_eq!(bundle.index_resources.len(), 1);
    }

    #[test]
    fn missing_main_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "main_file_cache.idx255", b"manifest-bytes");
        let err = load_bundle(dir.path(), 0).unwrap_err();
        assert!(matches!(err, BundleError::Required { .. }));
    }
}
