//! Per-dependency build contexts.
//!
//! Everything in a `DependencyBuildContext` is owned by its worker except the
//! `StatusHandle`, which the coordinator also holds. Each handle has its own
//! lock so unrelated dependencies never contend.

use camino::Utf8PathBuf;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

use spn_config::CacheLayout;
use spn_core::types::{BuildKind, OptionSet, PackageSource, Version};
use spn_core::utils::{fit_width, BuildId};

use crate::hooks::BuildHooks;

/// Width of the name column shown to progress observers
pub const NAME_WIDTH: usize = 16;

/// Characters of the commit id shown to progress observers
pub const COMMIT_WIDTH: usize = 8;

/// Lifecycle of one dependency build, in forward order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuildState {
    Idle,
    Cloning,
    Fetching,
    ResolvingCommit,
    CheckingOut,
    Building,
    Packaging,
    Stamping,
    Done,
    Canceled,
    Failed,
}

impl BuildState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildState::Done | BuildState::Canceled | BuildState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildState::Idle => "idle",
            BuildState::Cloning => "cloning",
            BuildState::Fetching => "fetching",
            BuildState::ResolvingCommit => "resolving-commit",
            BuildState::CheckingOut => "checking-out",
            BuildState::Building => "building",
            BuildState::Packaging => "packaging",
            BuildState::Stamping => "stamping",
            BuildState::Done => "done",
            BuildState::Canceled => "canceled",
            BuildState::Failed => "failed",
        }
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The concurrently read part of a context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub state: BuildState,
    pub message: String,
    pub error: Option<String>,
}

impl Default for Status {
    fn default() -> Self {
        Self {
            state: BuildState::Idle,
            message: String::new(),
            error: None,
        }
    }
}

/// Shared, synchronized status cell for one dependency
#[derive(Debug, Clone, Default)]
pub struct StatusHandle {
    inner: Arc<Mutex<Status>>,
}

impl StatusHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Status {
        self.inner.lock().clone()
    }

    pub fn state(&self) -> BuildState {
        self.inner.lock().state
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// Move forward to `state`. Terminal states absorb every later write;
    /// returns whether the transition happened.
    pub fn transition(&self, state: BuildState) -> bool {
        let mut status = self.inner.lock();
        if status.state.is_terminal() || state < status.state {
            return false;
        }
        status.state = state;
        true
    }

    /// Update the human-readable message unless already terminal
    pub fn set_message(&self, message: impl Into<String>) {
        let mut status = self.inner.lock();
        if !status.state.is_terminal() {
            status.message = message.into();
        }
    }

    /// Move to `failed` with an error, unless already terminal
    pub fn fail(&self, error: impl Into<String>) -> bool {
        let mut status = self.inner.lock();
        if status.state.is_terminal() {
            return false;
        }
        status.state = BuildState::Failed;
        status.error = Some(error.into());
        true
    }
}

/// Filesystem locations for one dependency build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyPaths {
    /// Working copy (or the package directory itself for local packages)
    pub source: Utf8PathBuf,
    pub work: Utf8PathBuf,
    pub store: Utf8PathBuf,
    pub include: Utf8PathBuf,
    pub lib: Utf8PathBuf,
    pub vendor: Utf8PathBuf,
    pub stamp: Utf8PathBuf,
    pub log: Utf8PathBuf,
}

impl DependencyPaths {
    pub fn new(cache: &CacheLayout, name: &str, build_id: &BuildId, source: &PackageSource) -> Self {
        let id = build_id.as_str();
        let store = cache.store_dir(name, id);
        Self {
            source: match source {
                PackageSource::Remote { .. } => cache.source_dir(name),
                PackageSource::Local { dir } => Utf8PathBuf::from(dir),
            },
            work: cache.work_dir(name, id),
            include: store.join("include"),
            lib: store.join("lib"),
            vendor: store.join("vendor"),
            stamp: cache.stamp_file(name, id),
            log: cache.log_file(name, id),
            store,
        }
    }
}

/// What a progress observer sees for one dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub name: String,
    /// Name padded or truncated to `NAME_WIDTH`
    pub display_name: String,
    /// Commit id truncated to `COMMIT_WIDTH`
    pub commit: String,
    pub state: BuildState,
    pub message: String,
    pub error: Option<String>,
}

/// The mutable per-build unit driven by one worker
pub struct DependencyBuildContext {
    pub name: String,
    pub version: Version,
    pub commit: String,
    pub source: PackageSource,
    pub kind: BuildKind,
    pub options: OptionSet,
    pub build_id: BuildId,
    pub paths: DependencyPaths,
    pub hooks: Arc<dyn BuildHooks>,
    pub status: StatusHandle,
}

impl DependencyBuildContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cache: &CacheLayout,
        name: impl Into<String>,
        version: Version,
        commit: impl Into<String>,
        source: PackageSource,
        kind: BuildKind,
        options: OptionSet,
        hooks: Arc<dyn BuildHooks>,
    ) -> Self {
        let name = name.into();
        let commit = commit.into();
        let build_id = BuildId::compute(&commit, &version, &options);
        let paths = DependencyPaths::new(cache, &name, &build_id, &source);
        Self {
            name,
            version,
            commit,
            source,
            kind,
            options,
            build_id,
            paths,
            hooks,
            status: StatusHandle::new(),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.source, PackageSource::Local { .. })
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        snapshot_of(&self.name, &self.commit, &self.status)
    }
}

impl fmt::Debug for DependencyBuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyBuildContext")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("commit", &self.commit)
            .field("kind", &self.kind)
            .field("build_id", &self.build_id)
            .field("status", &self.status.snapshot())
            .finish()
    }
}

/// Observer view built from a status handle plus the fixed identity fields
pub fn snapshot_of(name: &str, commit: &str, status: &StatusHandle) -> StatusSnapshot {
    let Status {
        state,
        message,
        error,
    } = status.snapshot();
    StatusSnapshot {
        name: name.to_string(),
        display_name: fit_width(name, NAME_WIDTH),
        commit: commit.chars().take(COMMIT_WIDTH).collect(),
        state,
        message,
        error,
    }
}
