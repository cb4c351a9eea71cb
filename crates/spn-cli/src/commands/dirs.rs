//! `spn which` and `spn dirs` command implementations.

use spn_build::DependencyBuildContext;
use spn_core::error::SpnResult;

use super::project::{Project, ResolveMode};
use super::CommandContext;

/// Print every cache directory of one dependency
pub async fn which(package: String, ctx: &CommandContext) -> SpnResult<()> {
    let project = Project::load(ctx).await?;
    let resolution = project.resolve(&ResolveMode::Locked)?;
    let plan = project.plan(&resolution)?;

    let Some(dep) = plan.get(&package) else {
        project.require(&package)?;
        ctx.output.warn(&format!("{} is not a dependency of {}", package, project.name()));
        return Ok(());
    };

    ctx.output.step("==>", &format!("{} {} ({})", dep.name, dep.version, describe(dep)));
    let rows = [
        ("source", &dep.paths.source),
        ("work", &dep.paths.work),
        ("store", &dep.paths.store),
        ("include", &dep.paths.include),
        ("lib", &dep.paths.lib),
        ("log", &dep.paths.log),
    ];
    for (label, path) in rows {
        ctx.output.data(&format!("{:<8} {}", label, path));
    }
    Ok(())
}

/// Print the store directory of every resolved dependency
pub async fn execute(ctx: &CommandContext) -> SpnResult<()> {
    let project = Project::load(ctx).await?;
    let resolution = project.resolve(&ResolveMode::Locked)?;
    let plan = project.plan(&resolution)?;

    ctx.output.info(&format!("cache: {}", project.config.cache_dir));
    for dep in plan.contexts() {
        ctx.output.data(&format!("{:<16} {}", dep.name, dep.paths.store));
    }
    Ok(())
}

fn describe(dep: &DependencyBuildContext) -> String {
    let built = if dep.paths.stamp.exists() { "built" } else { "not built" };
    format!("{}, {}, build {}", dep.kind, built, dep.build_id)
}
