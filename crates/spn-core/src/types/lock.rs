//! Lock entries: the durable snapshot of one resolved package.

use serde::{Deserialize, Serialize};

use super::Version;

/// One resolved package as recorded in spn.lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    pub name: String,
    pub version: Version,
    pub commit: String,
    /// Direct dependency names
    #[serde(default)]
    pub deps: Vec<String>,
    /// Packages that directly depend on this one
    #[serde(default)]
    pub dependents: Vec<String>,
}

impl LockEntry {
    pub fn new(name: impl Into<String>, version: Version, commit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version,
            commit: commit.into(),
            deps: Vec::new(),
            dependents: Vec::new(),
        }
    }
}
