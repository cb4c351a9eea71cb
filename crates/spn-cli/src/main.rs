//! # spn-cli
//!
//! Source-built native dependency manager CLI.
//!
//! This is the main entry point for the spn tool. It handles command parsing,
//! sets up logging and error handling, and dispatches to the appropriate command handlers.

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing::{error, info};

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Resolve, fetch and build native dependencies from source
#[derive(Parser)]
#[command(name = "spn", version, about = "Source-built native dependency manager")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Override the cache directory
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create spn.toml in the current directory
    Init {
        /// Package name (defaults to the directory name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Add a dependency to spn.toml
    Add {
        package: String,
        /// Version range; defaults to a caret range on the newest version
        range: Option<String>,
    },
    /// Re-solve dependencies ignoring the lock, then build
    Update {
        /// Only move this package; keep every other locked version
        package: Option<String>,
    },
    /// Resolve and build every dependency
    Build {
        /// Rebuild even when a build stamp exists
        #[arg(long)]
        force: bool,
    },
    /// Print compiler and linker flags for consumers
    Flags,
    /// Print the cache directories of one dependency
    Which { package: String },
    /// Print the cache directories of every dependency
    Dirs,
    /// Show cache usage
    Cache,
    /// Show version information
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    setup_panic_handler();

    info!("Starting spn v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprint!("{}", ErrorFormatter::new().format_any(&err));
            ExitCode::FAILURE
        },
    }
}

fn run_cli(cli: Cli) -> anyhow::Result<()> {
    // Create Tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut ctx = CommandContext::new()?;
    if cli.no_color {
        ctx.output = output::OutputHandler::plain();
    }
    if let Some(dir) = cli.cache_dir {
        ctx.overrides.insert("cache_dir".to_string(), dir);
    }

    match cli.command {
        Some(command) => commands::dispatch_command(command, &ctx).await,
        None => {
            commands::show_help(&ctx);
            Ok(())
        },
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "spn={level},spn_core={level},spn_resolver={level},spn_config={level},spn_build={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("spn encountered an unexpected error: {}", panic_info);
        eprintln!("spn crashed! This is a bug.");
        eprintln!("Please report it together with the output of `spn version`.");
        eprintln!("Error: {}", panic_info);
    }));
}
