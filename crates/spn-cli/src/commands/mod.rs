//! Command implementations and dispatch logic.
//!
//! Each command is an async function taking a `CommandContext`. Commands that
//! need the project go through `project::Project`, which loads the manifest,
//! layered settings and package catalog once.

use camino::Utf8PathBuf;
use spn_build::CancellationToken;
use spn_core::error::SpnError;
use std::collections::HashMap;
use tracing::info;

pub mod add;
pub mod build;
pub mod cache;
pub mod dirs;
pub mod flags;
pub mod init;
pub mod project;
pub mod update;

#[cfg(test)]
mod tests;

use crate::{output::OutputHandler, Commands};

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: Utf8PathBuf,
    pub output: OutputHandler,
    /// Flag-level settings overrides (`cache_dir`, `force`, ...)
    pub overrides: HashMap<String, String>,
    /// Set on Ctrl-C; observed by running builds
    pub cancel: CancellationToken,
}

impl CommandContext {
    /// Create a new command context for the current directory
    pub fn new() -> Result<Self, SpnError> {
        let cwd = std::env::current_dir()
            .map_err(|e| SpnError::io("Failed to get current directory", e))?;
        let cwd = Utf8PathBuf::try_from(cwd).map_err(|e| SpnError::ConfigValidation {
            field: "cwd".to_string(),
            reason: format!("current directory is not valid UTF-8: {}", e),
        })?;

        Ok(Self {
            cwd,
            output: OutputHandler::new(),
            overrides: HashMap::new(),
            cancel: CancellationToken::new(),
        })
    }
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> anyhow::Result<()> {
    match command {
        Commands::Init { name } => {
            info!("Initializing project in {}", ctx.cwd);
            init::execute(name, ctx).await?;
        },
        Commands::Add { package, range } => {
            info!("Adding dependency: {} ({:?})", package, range);
            add::execute(package, range, ctx).await?;
        },
        Commands::Update { package } => {
            info!("Updating dependencies ({:?})", package);
            update::execute(package, ctx).await?;
        },
        Commands::Build { force } => {
            info!("Building dependencies (force: {})", force);
            build::execute(force, ctx).await?;
        },
        Commands::Flags => flags::execute(ctx).await?,
        Commands::Which { package } => dirs::which(package, ctx).await?,
        Commands::Dirs => dirs::execute(ctx).await?,
        Commands::Cache => cache::execute(ctx).await?,
        Commands::Version => show_version(ctx),
    }
    Ok(())
}

/// Show help information
pub fn show_help(ctx: &CommandContext) {
    ctx.output.info("spn - source-built native dependency manager");
    ctx.output.info("");
    ctx.output.info("Usage: spn [COMMAND] [OPTIONS]");
    ctx.output.info("");
    ctx.output.info("Project:");
    ctx.output.info("  init           Create spn.toml in the current directory");
    ctx.output.info("  add <pkg>      Add a dependency");
    ctx.output.info("");
    ctx.output.info("Building:");
    ctx.output.info("  build          Resolve and build every dependency");
    ctx.output.info("  update [pkg]   Re-solve ignoring spn.lock, then build");
    ctx.output.info("  flags          Print compiler and linker flags");
    ctx.output.info("");
    ctx.output.info("Cache:");
    ctx.output.info("  which <pkg>    Show one dependency's directories");
    ctx.output.info("  dirs           Show every dependency's directories");
    ctx.output.info("  cache          Show cache usage");
    ctx.output.info("");
    ctx.output.info("Run 'spn <command> --help' for more information on a command.");
}

fn show_version(ctx: &CommandContext) {
    let target = format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS);

    ctx.output.info(&format!("spn v{}", env!("CARGO_PKG_VERSION")));
    ctx.output.info(&format!("Build: {}", env!("SPN_BUILD")));
    ctx.output.info(&format!("Built: {}", env!("BUILD_DATE")));
    ctx.output.info(&format!("Target: {}", target));
    ctx.output.info(&format!("Rust: {}", env!("RUSTC_VERSION")));
}

/// Closest candidate within edit distance 2, if any
pub fn suggest_similar<'a>(input: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut best_match = None;
    let mut best_distance = usize::MAX;

    for candidate in candidates {
        let distance = edit_distance(input, candidate);
        if distance < best_distance && distance <= 2 {
            best_distance = distance;
            best_match = Some(candidate);
        }
    }

    best_match.map(|s| s.to_string())
}

/// Calculate edit distance between two strings
fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut matrix = vec![vec![0; b_len + 1]; a_len + 1];
    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b_len {
        matrix[0][j] = j;
    }

    for i in 1..=a_len {
        for j in 1..=b_len {
            let cost = if a_chars[i - 1] == b_chars[j - 1] { 0 } else { 1 };
            matrix[i][j] = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + cost);
        }
    }

    matrix[a_len][b_len]
}
