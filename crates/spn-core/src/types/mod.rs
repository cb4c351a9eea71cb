//! Core data types for spn package management.
//!
//! This module provides the fundamental types used throughout spn:
//! - Version and range types for semantic versioning
//! - Package records as loaded from package sources
//! - Dependency requests declared by manifests
//! - Lock entries persisted after a successful build

pub mod dependency;
pub mod lock;
pub mod options;
pub mod package;
pub mod version;

// Re-export all public types
pub use dependency::{DependencyKind, DependencyRequest, Requirement};
pub use lock::LockEntry;
pub use options::{BuildKind, OptionSet, OptionValue};
pub use package::{LibraryConfig, PackageRecord, PackageSource};
pub use version::{
    compare, parse_version, satisfies, Bound, Modifier, Op, ParsedVersion, Version, VersionRange,
};
