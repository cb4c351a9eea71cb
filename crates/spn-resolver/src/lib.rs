//! Dependency resolution engine for spn
//!
//! This crate turns a root manifest plus the package catalog into exactly one
//! chosen version per transitive dependency, either by solving version ranges
//! from scratch or by trusting a previously written lock.

pub mod catalog;
pub mod graph;
pub mod lock;
pub mod solver;

// Re-export main types
pub use catalog::Catalog;
pub use graph::{DependencyGraph, GraphNode};
pub use lock::lock_covers;
pub use solver::{Resolution, ResolvedPackage, Resolver, LOCK_REQUESTER};

use spn_core::error::SpnError;

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, SpnError>;
