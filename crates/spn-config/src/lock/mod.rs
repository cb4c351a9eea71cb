//! spn.lock reading and atomic writing

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::io::Write;
use tracing::debug;

use spn_core::error::SpnError;
use spn_core::types::LockEntry;

use crate::ConfigResult;

/// File name of the lock file, next to spn.toml
pub const LOCK_FILE: &str = "spn.lock";

/// Tool identity recorded at the top of every lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHeader {
    pub spn_version: String,
    pub spn_build: String,
}

/// The durable record of the last successful resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockFile {
    pub header: LockHeader,

    #[serde(default, rename = "package")]
    pub packages: Vec<LockEntry>,
}

impl LockFile {
    /// Create a lock with entries sorted by name
    pub fn new(header: LockHeader, mut packages: Vec<LockEntry>) -> Self {
        packages.sort_by(|a, b| a.name.cmp(&b.name));
        Self { header, packages }
    }

    /// Parse lock text; malformed version text is a fatal parse error
    pub fn parse(content: &str, file: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| SpnError::TomlParse {
            file: file.to_string(),
            message: e.to_string(),
        })
    }

    /// Read a lock file if one exists
    pub fn read(path: &Utf8Path) -> ConfigResult<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content, path.as_str()).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SpnError::io(format!("Failed to read {}", path), e)),
        }
    }

    /// Serialize to TOML text
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| SpnError::TomlParse {
            file: LOCK_FILE.to_string(),
            message: e.to_string(),
        })
    }

    /// Write through a temporary file in the same directory, then rename over `path`
    pub fn write(&self, path: &Utf8Path) -> ConfigResult<()> {
        let content = self.to_toml()?;
        let dir = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));

        let mut temp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| SpnError::io(format!("Failed to create temporary lock in {}", dir), e))?;
        temp.write_all(content.as_bytes())
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| SpnError::io(format!("Failed to write {}", path), e))?;
        temp.persist(path)
            .map_err(|e| SpnError::io(format!("Failed to replace {}", path), e.error))?;

        debug!("Wrote {} packages to {}", self.packages.len(), path);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&LockEntry> {
        self.packages.iter().find(|entry| entry.name == name)
    }
}
