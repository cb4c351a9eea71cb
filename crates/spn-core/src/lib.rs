//! # spn-core
//!
//! Core types and utilities shared across all spn crates.
//!
//! This crate provides:
//! - `Version` and `VersionRange`, the semantic-version range algebra
//! - `DependencyRequest` and `PackageRecord` for catalog packages
//! - `LockEntry`, the durable snapshot of one resolved package
//! - `SpnError` for unified error handling
//! - Build identifier hashing
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (Version, PackageRecord, etc.)
//! - `error`: Error types and result aliases
//! - `utils`: Hashing and display helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{SpnError, SpnResult};
pub use types::{
    BuildKind, DependencyKind, DependencyRequest, LibraryConfig, LockEntry, Op, OptionSet,
    OptionValue, PackageRecord, PackageSource, ParsedVersion, Requirement, Version, VersionRange,
};
pub use utils::{fit_width, BuildId};
