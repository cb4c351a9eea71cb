//! In-memory fakes for the build machine and coordinator tests.

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use spn_config::CacheLayout;
use spn_core::error::SpnError;
use spn_core::types::{BuildKind, OptionSet, PackageSource, Version};

use crate::context::DependencyBuildContext;
use crate::hooks::{BuildHooks, HookContext};
use crate::vcs::SourceControl;
use crate::BuildResult;

pub struct Fixture {
    _temp: TempDir,
    pub root: Utf8PathBuf,
    pub cache: CacheLayout,
}

pub fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
    Fixture {
        cache: CacheLayout::new(root.join("cache")),
        root,
        _temp: temp,
    }
}

pub fn remote_context(
    fixture: &Fixture,
    name: &str,
    commit: &str,
    hooks: Arc<dyn BuildHooks>,
) -> DependencyBuildContext {
    DependencyBuildContext::new(
        &fixture.cache,
        name,
        Version::new(1, 0, 0),
        commit,
        PackageSource::Remote {
            url: format!("https://example.com/{}.git", name),
        },
        BuildKind::Static,
        OptionSet::new(),
        hooks,
    )
}

/// Records calls; "clones" by creating the destination directory
#[derive(Default)]
pub struct FakeVcs {
    calls: Mutex<Vec<String>>,
    head: Mutex<Option<String>>,
    fail_on: Option<&'static str>,
}

impl FakeVcs {
    pub fn failing(operation: &'static str) -> Self {
        Self {
            fail_on: Some(operation),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, operation: &str, repo: &Utf8Path) -> BuildResult<()> {
        self.calls.lock().push(operation.to_string());
        if self.fail_on == Some(operation) {
            return Err(SpnError::vcs(operation, repo, "simulated failure"));
        }
        Ok(())
    }
}

impl SourceControl for FakeVcs {
    fn clone_repo(&self, _url: &str, dest: &Utf8Path) -> BuildResult<()> {
        self.record("clone", dest)?;
        std::fs::create_dir_all(dest).map_err(|e| SpnError::io("fake clone", e))
    }

    fn fetch(&self, repo: &Utf8Path) -> BuildResult<()> {
        self.record("fetch", repo)
    }

    fn checkout(&self, repo: &Utf8Path, commit: &str) -> BuildResult<()> {
        self.record("checkout", repo)?;
        *self.head.lock() = Some(commit.to_string());
        Ok(())
    }

    fn commit_message(&self, repo: &Utf8Path, commit: &str) -> BuildResult<String> {
        self.record("log", repo)?;
        Ok(format!("Release {}", commit))
    }

    fn head_commit(&self, repo: &Utf8Path) -> BuildResult<String> {
        self.record("rev-parse", repo)?;
        self.head
            .lock()
            .clone()
            .ok_or_else(|| SpnError::vcs("rev-parse", repo, "no HEAD"))
    }

    fn remote_url(&self, repo: &Utf8Path) -> BuildResult<String> {
        self.record("remote", repo)?;
        Ok(String::new())
    }

    fn count_commits_between(&self, repo: &Utf8Path, _from: &str, _to: &str) -> BuildResult<u64> {
        self.record("rev-list", repo)?;
        Ok(3)
    }
}

/// Counts hook invocations; optionally slow or failing
#[derive(Default)]
pub struct CountingHooks {
    builds: AtomicUsize,
    packages: AtomicUsize,
    fail_build: bool,
    delay: Duration,
}

impl CountingHooks {
    pub fn failing_build() -> Self {
        Self {
            fail_build: true,
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn packages(&self) -> usize {
        self.packages.load(Ordering::SeqCst)
    }
}

impl BuildHooks for CountingHooks {
    fn has_build(&self) -> bool {
        true
    }

    fn run_build(&self, ctx: &HookContext<'_>) -> BuildResult<()> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        if self.fail_build {
            use std::io::Write;
            let mut log = ctx.log;
            let _ = writeln!(log, "cc: error: missing zconf.h");
            return Err(SpnError::hook("build", ctx.name, "exit status: 1"));
        }
        Ok(())
    }

    fn has_package(&self) -> bool {
        true
    }

    fn run_package(&self, _ctx: &HookContext<'_>) -> BuildResult<()> {
        self.packages.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
