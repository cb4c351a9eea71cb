//! `spn flags` command implementation.

use spn_core::error::SpnResult;
use spn_resolver::DependencyGraph;

use super::project::{Project, ResolveMode};
use super::CommandContext;

/// Print `-I`/`-L`/`-l` flags for every resolved dependency on one line
pub async fn execute(ctx: &CommandContext) -> SpnResult<()> {
    let project = Project::load(ctx).await?;
    let resolution = project.resolve(&ResolveMode::Locked)?;
    let link_order = DependencyGraph::from_resolution(&resolution)?.link_order()?;
    let plan = project.plan(&resolution)?;

    let unbuilt: Vec<&str> = plan
        .contexts()
        .iter()
        .filter(|dep| !dep.paths.stamp.exists())
        .map(|dep| dep.name.as_str())
        .collect();
    if !unbuilt.is_empty() {
        tracing::warn!("Not built yet: {}; run 'spn build'", unbuilt.join(", "));
    }

    ctx.output.data(&plan.compiler_flags(&link_order).join(" "));
    Ok(())
}
