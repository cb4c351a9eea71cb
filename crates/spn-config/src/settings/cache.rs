//! Cache directory layout and inspection

use camino::{Utf8Path, Utf8PathBuf};
use walkdir::WalkDir;

/// Name of the zero-byte marker written after a successful build
pub const STAMP_FILE: &str = "spn.stamp";

/// Name of the per-build log capturing hook output
pub const LOG_FILE: &str = "spn.log";

/// Paths under the cache root:
/// `source/<name>`, `work/<name>/<build-id>`, `store/<name>/<build-id>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    root: Utf8PathBuf,
}

/// Summary for `spn cache`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of store entries (one per built name + build id)
    pub entries: usize,
    /// Total bytes under the cache root
    pub bytes: u64,
}

impl CacheLayout {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Working copy of a package's repository
    pub fn source_dir(&self, name: &str) -> Utf8PathBuf {
        self.root.join("source").join(name)
    }

    pub fn work_dir(&self, name: &str, build_id: &str) -> Utf8PathBuf {
        self.root.join("work").join(name).join(build_id)
    }

    pub fn store_dir(&self, name: &str, build_id: &str) -> Utf8PathBuf {
        self.root.join("store").join(name).join(build_id)
    }

    pub fn stamp_file(&self, name: &str, build_id: &str) -> Utf8PathBuf {
        self.store_dir(name, build_id).join(STAMP_FILE)
    }

    pub fn log_file(&self, name: &str, build_id: &str) -> Utf8PathBuf {
        self.work_dir(name, build_id).join(LOG_FILE)
    }

    /// Count store entries and total size; a missing cache is empty
    pub fn stats(&self) -> CacheStats {
        let store = self.root.join("store");
        let entries = WalkDir::new(&store)
            .min_depth(2)
            .max_depth(2)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_dir())
            .count();

        let bytes = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| entry.metadata().ok())
            .map(|metadata| metadata.len())
            .sum();

        CacheStats { entries, bytes }
    }
}
