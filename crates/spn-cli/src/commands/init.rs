//! `spn init` command implementation.

use spn_config::{manifest::serialize_spn_toml, manifest::validate_config, SpnToml, MANIFEST_FILE};
use spn_core::error::{SpnError, SpnResult};

use super::CommandContext;

/// Write a fresh spn.toml into the current directory
pub async fn execute(name: Option<String>, ctx: &CommandContext) -> SpnResult<()> {
    let manifest_path = ctx.cwd.join(MANIFEST_FILE);
    if manifest_path.exists() {
        ctx.output.info(&format!("{} already exists, skipping initialization", MANIFEST_FILE));
        return Ok(());
    }

    let name = match name {
        Some(name) => name,
        None => ctx
            .cwd
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| SpnError::ConfigValidation {
                field: "package.name".to_string(),
                reason: "cannot derive a name from this directory; pass --name".to_string(),
            })?,
    };

    let manifest = SpnToml::new(name);
    validate_config(&manifest)?;
    let content = serialize_spn_toml(&manifest)?;
    tokio::fs::write(&manifest_path, content)
        .await
        .map_err(|e| SpnError::io(format!("Failed to write {}", manifest_path), e))?;

    ctx.output.success(&format!("Created {} for {}", MANIFEST_FILE, manifest.package.name));
    ctx.output.info("");
    ctx.output.info("Next steps:");
    ctx.output.info("  spn add <package>");
    ctx.output.info("  spn build");
    Ok(())
}
