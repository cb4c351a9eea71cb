//! The per-dependency build state machine.
//!
//! `idle → cloning|fetching → resolving-commit → checking-out → building →
//! packaging → stamping → done`, with `failed` and `canceled` reachable from
//! any non-terminal state. Local packages skip straight from `idle` to
//! `building` since they are built in place.
//!
//! The stamp check applies to remote packages only. A local package has no
//! commit, so its build id covers version and options but not the files in
//! its directory; a stamp would hide every edit made there.
//!
//! Cancellation is checked between phases only; a phase already running its
//! external command finishes first.

use std::fs::File;
use std::sync::Arc;
use tracing::{debug, warn};

use spn_core::error::SpnError;
use spn_core::types::PackageSource;
use spn_core::utils::fit_width;

use crate::context::{BuildState, DependencyBuildContext};
use crate::coordinator::CancellationToken;
use crate::hooks::HookContext;
use crate::vcs::SourceControl;
use crate::BuildResult;

/// Width the commit summary is fitted to in status messages
pub const SUMMARY_WIDTH: usize = 40;

/// Drives one context through its phases
#[derive(Clone)]
pub struct BuildMachine {
    vcs: Arc<dyn SourceControl>,
    cancel: CancellationToken,
    force: bool,
}

impl BuildMachine {
    pub fn new(vcs: Arc<dyn SourceControl>, cancel: CancellationToken, force: bool) -> Self {
        Self { vcs, cancel, force }
    }

    /// Run to a terminal state; failures are recorded on the context's status
    pub fn run(&self, ctx: &DependencyBuildContext) {
        if let Err(e) = self.drive(ctx) {
            warn!("{} failed: {}", ctx.name, e);
            ctx.status.fail(e.to_string());
        }
    }

    fn drive(&self, ctx: &DependencyBuildContext) -> BuildResult<()> {
        if !ctx.is_local() {
            if !self.proceed(ctx) {
                return Ok(());
            }
            let previous = self.sync_source(ctx)?;

            if !self.proceed(ctx) {
                return Ok(());
            }
            self.resolve_commit(ctx, previous.as_deref());

            if !self.proceed(ctx) {
                return Ok(());
            }
            self.checkout(ctx)?;

            if !self.force && ctx.paths.stamp.exists() {
                debug!("{} already built as {}", ctx.name, ctx.build_id);
                ctx.status.set_message(format!("up to date ({})", ctx.build_id));
                ctx.status.transition(BuildState::Done);
                return Ok(());
            }
        } else {
            ctx.status.set_message(format!("local {}", ctx.paths.source));
        }

        if !self.proceed(ctx) {
            return Ok(());
        }
        let log = self.build(ctx)?;

        if !self.proceed(ctx) {
            return Ok(());
        }
        self.package(ctx, &log)?;

        if !self.proceed(ctx) {
            return Ok(());
        }
        self.stamp(ctx)?;

        ctx.status.transition(BuildState::Done);
        debug!("{} done", ctx.name);
        Ok(())
    }

    /// False (after moving to `canceled`) once cancellation was requested
    fn proceed(&self, ctx: &DependencyBuildContext) -> bool {
        if self.cancel.is_cancelled() {
            ctx.status.transition(BuildState::Canceled);
            return false;
        }
        true
    }

    /// Clone or fetch; returns the previously checked-out commit when fetching
    fn sync_source(&self, ctx: &DependencyBuildContext) -> BuildResult<Option<String>> {
        let PackageSource::Remote { url } = &ctx.source else {
            return Ok(None);
        };
        let repo = &ctx.paths.source;

        if repo.exists() {
            ctx.status.transition(BuildState::Fetching);
            ctx.status.set_message(format!("fetching {}", url));

            if let Ok(origin) = self.vcs.remote_url(repo) {
                if &origin != url {
                    warn!("{} working copy points at {}, expected {}", ctx.name, origin, url);
                }
            }
            let previous = self.vcs.head_commit(repo).ok();
            self.vcs.fetch(repo)?;
            Ok(previous)
        } else {
            ctx.status.transition(BuildState::Cloning);
            ctx.status.set_message(format!("cloning {}", url));

            if let Some(parent) = repo.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| SpnError::io(format!("Failed to create {}", parent), e))?;
            }
            self.vcs.clone_repo(url, repo)?;
            Ok(None)
        }
    }

    /// Cosmetic: commit summary and distance from the previous checkout
    fn resolve_commit(&self, ctx: &DependencyBuildContext, previous: Option<&str>) {
        ctx.status.transition(BuildState::ResolvingCommit);

        let summary = self
            .vcs
            .commit_message(&ctx.paths.source, &ctx.commit)
            .unwrap_or_else(|_| ctx.commit.clone());
        let mut message = fit_width(&summary, SUMMARY_WIDTH).trim_end().to_string();

        if let Some(previous) = previous.filter(|previous| *previous != ctx.commit) {
            if let Ok(count) = self
                .vcs
                .count_commits_between(&ctx.paths.source, previous, &ctx.commit)
            {
                message.push_str(&format!(" (+{} commits)", count));
            }
        }
        ctx.status.set_message(message);
    }

    fn checkout(&self, ctx: &DependencyBuildContext) -> BuildResult<()> {
        ctx.status.transition(BuildState::CheckingOut);

        if ctx.commit.is_empty() {
            return Err(SpnError::vcs(
                "checkout",
                &ctx.name,
                format!("no commit recorded for version {}", ctx.version),
            ));
        }
        if !ctx.paths.source.exists() {
            return Err(SpnError::vcs(
                "checkout",
                &ctx.name,
                format!("working copy {} is missing", ctx.paths.source),
            ));
        }
        self.vcs.checkout(&ctx.paths.source, &ctx.commit)
    }

    /// Create the build directories, open the log and run the build hook
    fn build(&self, ctx: &DependencyBuildContext) -> BuildResult<File> {
        ctx.status.transition(BuildState::Building);

        let paths = &ctx.paths;
        for dir in [&paths.work, &paths.store, &paths.include, &paths.lib, &paths.vendor] {
            std::fs::create_dir_all(dir)
                .map_err(|e| SpnError::io(format!("Failed to create {}", dir), e))?;
        }
        let log = File::create(&paths.log)
            .map_err(|e| SpnError::io(format!("Failed to open {}", paths.log), e))?;

        if ctx.hooks.has_build() {
            ctx.status.set_message(format!("building {} ({})", ctx.version, ctx.kind));
            ctx.hooks.run_build(&hook_context(ctx, &log))?;
        }
        Ok(log)
    }

    fn package(&self, ctx: &DependencyBuildContext, log: &File) -> BuildResult<()> {
        ctx.status.transition(BuildState::Packaging);

        if ctx.hooks.has_package() {
            ctx.status.set_message("packaging");
            ctx.hooks.run_package(&hook_context(ctx, log))?;
        }
        Ok(())
    }

    fn stamp(&self, ctx: &DependencyBuildContext) -> BuildResult<()> {
        ctx.status.transition(BuildState::Stamping);
        File::create(&ctx.paths.stamp)
            .map(|_| ())
            .map_err(|e| SpnError::io(format!("Failed to write {}", ctx.paths.stamp), e))
    }
}

fn hook_context<'a>(ctx: &'a DependencyBuildContext, log: &'a File) -> HookContext<'a> {
    HookContext {
        name: &ctx.name,
        version: ctx.version,
        kind: ctx.kind,
        options: &ctx.options,
        paths: &ctx.paths,
        log,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture, remote_context, CountingHooks, FakeVcs};
    use spn_core::types::{BuildKind, OptionSet, Version};

    #[test]
    fn test_fresh_build_runs_every_phase() {
        let fixture = fixture();
        let vcs = Arc::new(FakeVcs::default());
        let hooks = Arc::new(CountingHooks::default());
        let ctx = remote_context(&fixture, "zlib", "c0ffee00", hooks.clone());

        BuildMachine::new(vcs.clone(), CancellationToken::new(), false).run(&ctx);

        let status = ctx.status.snapshot();
        assert_eq!(status.state, BuildState::Done, "{:?}", status.error);
        assert_eq!(hooks.builds(), 1);
        assert_eq!(hooks.packages(), 1);
        assert!(ctx.paths.stamp.exists());
        assert!(ctx.paths.log.exists());
        assert_eq!(vcs.calls(), vec!["clone", "log", "checkout"]);
    }

    #[test]
    fn test_stamped_build_is_skipped() {
        let fixture = fixture();
        let vcs = Arc::new(FakeVcs::default());
        let hooks = Arc::new(CountingHooks::default());

        let first = remote_context(&fixture, "zlib", "c0ffee00", hooks.clone());
        BuildMachine::new(vcs.clone(), CancellationToken::new(), false).run(&first);
        assert_eq!(first.status.state(), BuildState::Done);

        let second = remote_context(&fixture, "zlib", "c0ffee00", hooks.clone());
        BuildMachine::new(vcs.clone(), CancellationToken::new(), false).run(&second);
        assert_eq!(second.status.state(), BuildState::Done);
        assert_eq!(hooks.builds(), 1);
        assert_eq!(hooks.packages(), 1);
        assert!(second.status.snapshot().message.starts_with("up to date"));
    }

    #[test]
    fn test_force_rebuilds_stamped_build() {
        let fixture = fixture();
        let vcs = Arc::new(FakeVcs::default());
        let hooks = Arc::new(CountingHooks::default());

        for _ in 0..2 {
            let ctx = remote_context(&fixture, "zlib", "c0ffee00", hooks.clone());
            BuildMachine::new(vcs.clone(), CancellationToken::new(), true).run(&ctx);
            assert_eq!(ctx.status.state(), BuildState::Done);
        }
        assert_eq!(hooks.builds(), 2);
    }

    #[test]
    fn test_second_sync_fetches_and_counts_commits() {
        let fixture = fixture();
        let vcs = Arc::new(FakeVcs::default());
        let hooks = Arc::new(CountingHooks::default());

        let first = remote_context(&fixture, "zlib", "c0ffee00", hooks.clone());
        BuildMachine::new(vcs.clone(), CancellationToken::new(), false).run(&first);

        let second = remote_context(&fixture, "zlib", "deadbeef", hooks.clone());
        BuildMachine::new(vcs.clone(), CancellationToken::new(), false).run(&second);

        assert_eq!(second.status.state(), BuildState::Done);
        assert!(vcs.calls().contains(&"fetch".to_string()));
        assert_eq!(hooks.builds(), 2);
    }

    #[test]
    fn test_resolved_commit_reports_distance_from_previous_checkout() {
        let fixture = fixture();
        let vcs = Arc::new(FakeVcs::default());
        let hooks = Arc::new(CountingHooks::default());
        let machine = BuildMachine::new(vcs.clone(), CancellationToken::new(), false);

        let first = remote_context(&fixture, "zlib", "c0ffee00", hooks.clone());
        machine.run(&first);

        let moved = remote_context(&fixture, "zlib", "deadbeef", hooks.clone());
        let previous = machine.sync_source(&moved).unwrap();
        assert_eq!(previous.as_deref(), Some("c0ffee00"));
        machine.resolve_commit(&moved, previous.as_deref());
        assert_eq!(moved.status.snapshot().message, "Release deadbeef (+3 commits)");

        let counted = || vcs.calls().iter().filter(|call| *call == "rev-list").count();
        assert_eq!(counted(), 1);

        let same = remote_context(&fixture, "zlib", "c0ffee00", hooks.clone());
        machine.resolve_commit(&same, Some("c0ffee00"));
        assert_eq!(same.status.snapshot().message, "Release c0ffee00");
        assert_eq!(counted(), 1);
    }

    #[test]
    fn test_clone_failure_is_local() {
        let fixture = fixture();
        let vcs = Arc::new(FakeVcs::failing("clone"));
        let hooks = Arc::new(CountingHooks::default());
        let ctx = remote_context(&fixture, "zlib", "c0ffee00", hooks.clone());

        BuildMachine::new(vcs, CancellationToken::new(), false).run(&ctx);

        let status = ctx.status.snapshot();
        assert_eq!(status.state, BuildState::Failed);
        assert!(status.error.unwrap().contains("clone failed"));
        assert_eq!(hooks.builds(), 0);
    }

    #[test]
    fn test_empty_commit_fails_checkout() {
        let fixture = fixture();
        let vcs = Arc::new(FakeVcs::default());
        let ctx = remote_context(&fixture, "zlib", "", Arc::new(CountingHooks::default()));

        BuildMachine::new(vcs, CancellationToken::new(), false).run(&ctx);
        let status = ctx.status.snapshot();
        assert_eq!(status.state, BuildState::Failed);
        assert!(status.error.unwrap().contains("no commit recorded"));
    }

    #[test]
    fn test_hook_failure_marks_failed() {
        let fixture = fixture();
        let vcs = Arc::new(FakeVcs::default());
        let hooks = Arc::new(CountingHooks::failing_build());
        let ctx = remote_context(&fixture, "zlib", "c0ffee00", hooks.clone());

        BuildMachine::new(vcs, CancellationToken::new(), false).run(&ctx);
        assert_eq!(ctx.status.state(), BuildState::Failed);
        assert!(!ctx.paths.stamp.exists());
        assert_eq!(hooks.packages(), 0);
    }

    #[test]
    fn test_cancel_before_start() {
        let fixture = fixture();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let hooks = Arc::new(CountingHooks::default());
        let ctx = remote_context(&fixture, "zlib", "c0ffee00", hooks.clone());

        BuildMachine::new(Arc::new(FakeVcs::default()), cancel, false).run(&ctx);
        assert_eq!(ctx.status.state(), BuildState::Canceled);
        assert_eq!(hooks.builds(), 0);
    }

    #[test]
    fn test_local_package_skips_source_control() {
        let fixture = fixture();
        let dir = fixture.root.join("mylib");
        std::fs::create_dir_all(&dir).unwrap();
        let vcs = Arc::new(FakeVcs::default());
        let hooks = Arc::new(CountingHooks::default());
        let ctx = DependencyBuildContext::new(
            &fixture.cache,
            "mylib",
            Version::new(0, 3, 0),
            "",
            PackageSource::Local { dir: dir.to_string() },
            BuildKind::Shared,
            OptionSet::new(),
            hooks.clone(),
        );

        BuildMachine::new(vcs.clone(), CancellationToken::new(), false).run(&ctx);
        assert_eq!(ctx.status.state(), BuildState::Done);
        assert!(vcs.calls().is_empty());

        // Local packages are not content addressed by commit, so they rebuild
        let again = DependencyBuildContext::new(
            &fixture.cache,
            "mylib",
            Version::new(0, 3, 0),
            "",
            PackageSource::Local { dir: dir.to_string() },
            BuildKind::Shared,
            OptionSet::new(),
            hooks.clone(),
        );
        BuildMachine::new(vcs, CancellationToken::new(), false).run(&again);
        assert_eq!(hooks.builds(), 2);
    }
}
