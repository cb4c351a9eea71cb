//! `spn add` command implementation.
//!
//! The edited manifest is resolved before it is written, so a range that
//! cannot be satisfied leaves spn.toml untouched.

use spn_config::{manifest::add_dependency, manifest::parse_spn_toml, MANIFEST_FILE};
use spn_core::error::{SpnError, SpnResult};
use spn_core::types::VersionRange;
use spn_resolver::Resolver;

use super::project::Project;
use super::CommandContext;

/// Add `package` to spn.toml with `range`, or a caret range on its newest version
pub async fn execute(package: String, range: Option<String>, ctx: &CommandContext) -> SpnResult<()> {
    let project = Project::load(ctx).await?;
    project.require(&package)?;

    let range_text = match range {
        Some(text) => {
            VersionRange::parse(&text)?;
            text
        },
        None => default_range(&project, &package)?,
    };

    let manifest_path = project.dir.join(MANIFEST_FILE);
    let content = tokio::fs::read_to_string(&manifest_path)
        .await
        .map_err(|e| SpnError::io(format!("Failed to read {}", manifest_path), e))?;
    let updated = add_dependency(&content, &package, &range_text)?;

    let manifest = parse_spn_toml(&updated, manifest_path.as_str())?;
    let resolution = Resolver::new(&project.catalog).resolve(project.name(), &manifest.requests()?)?;

    tokio::fs::write(&manifest_path, updated)
        .await
        .map_err(|e| SpnError::io(format!("Failed to write {}", manifest_path), e))?;

    let chosen = resolution
        .version_of(&package)
        .map(|version| version.to_string())
        .unwrap_or_else(|| "?".to_string());
    ctx.output.success(&format!("Added {} {} ({})", package, range_text, chosen));
    ctx.output.info("Run 'spn build' to fetch and build it");
    Ok(())
}

fn default_range(project: &Project, package: &str) -> SpnResult<String> {
    let latest = project
        .catalog
        .get(package)
        .and_then(|record| record.latest().copied());
    match latest {
        Some(version) => Ok(format!("^{}", version)),
        None => Err(SpnError::NoMatchingVersion {
            package: package.to_string(),
            range: "*".to_string(),
            requester: project.name().to_string(),
        }),
    }
}
