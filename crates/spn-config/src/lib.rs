//! Configuration parsing for spn
//!
//! This crate handles the project manifest (`spn.toml`), package source
//! indexes, the `spn.lock` file and the layered global settings, turning
//! them into the core types the resolver and build engine work on.

pub mod index;
pub mod lock;
pub mod manifest;
pub mod settings;

// Re-export main types
pub use index::{load_catalog, load_package_file, IndexPackage, RECIPE_FILE};
pub use lock::{LockFile, LockHeader, LOCK_FILE};
pub use manifest::{DependencySpec, PackageSection, SpnToml, MANIFEST_FILE};
pub use settings::{CacheLayout, CacheStats, ConfigLayering, ConfigLoader, GlobalConfig, SpnConfig};

use spn_core::error::SpnError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, SpnError>;
