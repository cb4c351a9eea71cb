//! # spn-build
//!
//! Builds resolved dependencies from source, one worker thread per
//! dependency, and aggregates the outcome.
//!
//! ## Architecture
//!
//! - `vcs`: Source-control collaborator (`SourceControl`, git CLI adapter)
//! - `hooks`: Build/package hook capability (`BuildHooks`, recipe adapter)
//! - `context`: Per-dependency build context and its synchronized status cell
//! - `machine`: The per-dependency state machine
//! - `plan`: Turns a resolution into build contexts
//! - `coordinator`: Spawns workers, polls progress, handles cancellation,
//!   persists the lock on success

pub mod context;
pub mod coordinator;
pub mod hooks;
pub mod machine;
pub mod plan;
pub mod vcs;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types
pub use context::{BuildState, DependencyBuildContext, DependencyPaths, Status, StatusHandle, StatusSnapshot};
pub use coordinator::{BuildReport, CancellationToken, Coordinator, Failure, LockTarget, ProgressObserver};
pub use hooks::{BuildHooks, HookContext, NoHooks, ScriptHooks};
pub use machine::BuildMachine;
pub use plan::BuildPlan;
pub use vcs::{GitCli, SourceControl};

use spn_core::error::SpnError;

/// Result type for build operations
pub type BuildResult<T> = Result<T, SpnError>;
