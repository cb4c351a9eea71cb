//! `spn cache` command implementation.

use spn_core::error::SpnResult;

use super::project::load_settings;
use super::CommandContext;

/// Show the cache root, number of stored builds and their total size
pub async fn execute(ctx: &CommandContext) -> SpnResult<()> {
    let config = load_settings(ctx, Vec::new()).await?;
    let cache = config.cache();
    let stats = tokio::task::spawn_blocking(move || cache.stats())
        .await
        .unwrap_or_default();

    ctx.output.info(&format!("cache: {}", config.cache_dir));
    ctx.output.data(&format!("{} builds, {}", stats.entries, human_size(stats.bytes)));
    Ok(())
}

/// Bytes as B, or KiB and up with one decimal
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}
