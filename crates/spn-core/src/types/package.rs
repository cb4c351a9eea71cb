//! Package records as loaded from package sources.
//!
//! A record is loaded once per package name and shared read-only by every
//! resolution that references it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{BuildKind, DependencyRequest, OptionSet, Version};

/// Where a package's source tree comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSource {
    /// A remote repository cloned into the source cache
    Remote { url: String },
    /// A local directory used in place
    Local { dir: String },
}

/// Library/build configuration declared by a package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryConfig {
    #[serde(default)]
    pub kind: BuildKind,
    /// Library names consumers link against (`-l<name>`)
    #[serde(default)]
    pub libs: Vec<String>,
    /// Extra include directories relative to the store's include dir
    #[serde(default)]
    pub include: Vec<String>,
    /// Default option values
    #[serde(default)]
    pub options: OptionSet,
}

/// Everything known about one package name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub name: String,
    pub source: PackageSource,
    /// Known versions, ascending and deduplicated
    versions: Vec<Version>,
    commits: BTreeMap<Version, String>,
    pub dependencies: Vec<DependencyRequest>,
    pub lib: LibraryConfig,
    /// Build recipe script, when the package has one
    pub recipe: Option<String>,
}

impl PackageRecord {
    /// Create a record for a remote package with no versions yet
    pub fn new(name: impl Into<String>, source: PackageSource) -> Self {
        Self {
            name: name.into(),
            source,
            versions: Vec::new(),
            commits: BTreeMap::new(),
            dependencies: Vec::new(),
            lib: LibraryConfig::default(),
            recipe: None,
        }
    }

    /// Record a version and the commit it was released at
    pub fn add_version(&mut self, version: Version, commit: impl Into<String>) {
        if let Err(position) = self.versions.binary_search(&version) {
            self.versions.insert(position, version);
        }
        self.commits.insert(version, commit.into());
    }

    pub fn with_version(mut self, version: Version, commit: impl Into<String>) -> Self {
        self.add_version(version, commit);
        self
    }

    pub fn with_dependency(mut self, request: DependencyRequest) -> Self {
        self.dependencies.push(request);
        self
    }

    /// Known versions in ascending order
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn commit_for(&self, version: &Version) -> Option<&str> {
        self.commits.get(version).map(String::as_str)
    }

    pub fn latest(&self) -> Option<&Version> {
        self.versions.last()
    }

    pub fn is_local(&self) -> bool {
        matches!(self.source, PackageSource::Local { .. })
    }

    /// Build kind and options after applying a requester's overrides
    pub fn effective_build(&self, request: Option<&DependencyRequest>) -> (BuildKind, OptionSet) {
        let mut options = self.lib.options.clone();
        let mut kind = self.lib.kind;
        if let Some(request) = request {
            options.extend(request.options.clone());
            kind = request.build_kind.unwrap_or(kind);
        }
        (kind, options)
    }
}

impl PackageSource {
    /// Repository URL or local directory, for display and cloning
    pub fn locator(&self) -> &str {
        match self {
            PackageSource::Remote { url } => url,
            PackageSource::Local { dir } => dir,
        }
    }
}
