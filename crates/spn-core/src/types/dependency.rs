//! Dependency requests as declared by manifests and package records.

use super::{BuildKind, OptionSet, OptionValue, VersionRange};

/// What a request resolves against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// A catalog package, resolved by range
    Range(VersionRange),
    /// A local package directory, resolved to its single version
    Path(String),
}

/// Kind of dependency request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    Package,
    Path,
}

/// A dependency declared by a manifest; immutable once loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRequest {
    pub name: String,
    pub requirement: Requirement,
    /// Overrides the package's default build kind
    pub build_kind: Option<BuildKind>,
    /// Overrides the package's default options
    pub options: OptionSet,
}

impl DependencyRequest {
    /// Request a catalog package by range
    pub fn package(name: impl Into<String>, range: VersionRange) -> Self {
        Self {
            name: name.into(),
            requirement: Requirement::Range(range),
            build_kind: None,
            options: OptionSet::new(),
        }
    }

    /// Request a local package by directory
    pub fn path(name: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requirement: Requirement::Path(locator.into()),
            build_kind: None,
            options: OptionSet::new(),
        }
    }

    pub fn with_kind(mut self, kind: BuildKind) -> Self {
        self.build_kind = Some(kind);
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    pub fn kind(&self) -> DependencyKind {
        match self.requirement {
            Requirement::Range(_) => DependencyKind::Package,
            Requirement::Path(_) => DependencyKind::Path,
        }
    }

    /// The range, for catalog requests
    pub fn range(&self) -> Option<&VersionRange> {
        match &self.requirement {
            Requirement::Range(range) => Some(range),
            Requirement::Path(_) => None,
        }
    }

    /// Literal text of the requirement, as quoted in conflict reports
    pub fn requirement_text(&self) -> String {
        match &self.requirement {
            Requirement::Range(range) => range.text().to_string(),
            Requirement::Path(locator) => format!("path:{}", locator),
        }
    }
}
