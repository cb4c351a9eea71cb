//! `spn build` command implementation.
//!
//! Resolves (from spn.lock when it covers the manifest), plans one context per
//! dependency and hands them to the coordinator on a blocking thread while a
//! Ctrl-C watcher trips the cancellation token.

use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use spn_build::{BuildReport, Coordinator, GitCli};
use spn_resolver::DependencyGraph;

use super::project::{Project, ResolveMode};
use super::CommandContext;
use crate::output::errors::ErrorFormatter;
use crate::output::progress::BuildProgress;

/// Execute the `spn build` command
pub async fn execute(force: bool, ctx: &CommandContext) -> anyhow::Result<()> {
    run(ResolveMode::Locked, force, ctx).await
}

/// Resolve with `mode`, build everything, and report
pub async fn run(mode: ResolveMode, force: bool, ctx: &CommandContext) -> anyhow::Result<()> {
    let project = Project::load(ctx).await?;
    let resolution = project.resolve(&mode)?;
    let graph = DependencyGraph::from_resolution(&resolution)?;
    let plan = project.plan(&resolution)?;

    ctx.output.step(
        "==>",
        &format!(
            "Building {} dependencies of {}",
            graph.package_count(),
            project.name()
        ),
    );

    let coordinator = Coordinator::new(
        Arc::new(GitCli::new()),
        ctx.cancel.clone(),
        force || project.config.force,
        Duration::from_millis(project.config.poll_interval_ms),
    )
    .with_lock(project.lock_target(&graph));

    let cancel = ctx.cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, canceling outstanding builds");
            cancel.cancel();
        }
    });

    let contexts = plan.into_contexts();
    let colors = *ctx.output.colors();
    let report = tokio::task::spawn_blocking(move || {
        let mut progress = BuildProgress::stdout(colors);
        coordinator.run(contexts, &mut progress)
    })
    .await??;
    watcher.abort();

    summarize(&report, ctx)
}

fn summarize(report: &BuildReport, ctx: &CommandContext) -> anyhow::Result<()> {
    if report.is_success() {
        ctx.output.success(&format!("Built {} dependencies", report.statuses.len()));
        if report.lock_written {
            ctx.output.info(&format!("Updated {}", spn_config::LOCK_FILE));
        }
        return Ok(());
    }

    let formatter = ErrorFormatter::with_colors(*ctx.output.colors());
    for failure in &report.failures {
        eprint!("{}", formatter.format_failure(failure));
    }

    if report.canceled {
        bail!("build canceled; {} was left unchanged", spn_config::LOCK_FILE);
    }
    bail!(
        "{} of {} dependencies failed to build",
        report.failures.len(),
        report.statuses.len()
    )
}
