//! `spn update` command implementation.

use super::build;
use super::project::ResolveMode;
use super::CommandContext;

/// Re-solve ignoring spn.lock (or only for `package`), then build
pub async fn execute(package: Option<String>, ctx: &CommandContext) -> anyhow::Result<()> {
    let mode = match package {
        Some(package) => {
            ctx.output.info(&format!("Updating {}; other locked versions stay pinned", package));
            ResolveMode::Update(package)
        },
        None => ResolveMode::Fresh,
    };
    build::run(mode, false, ctx).await
}
