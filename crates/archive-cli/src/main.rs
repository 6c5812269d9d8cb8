//! Archive Sync CLI
//!
//! Compares two archive directories by content and brings the second in
//! line with the first.

mod cli;
mod commands;
mod console;
mod error;

use archive_core::Settings;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        // No command provided - show help hint
        println!("{} Archive Sync CLI", "archive".green().bold());
        println!();
        println!("Run {} for available commands.", "archive --help".cyan());
        return Ok(());
    };

    let settings = Settings::resolve(cli.config.as_deref(), Some(command.base()))?;
    init_tracing(cli.verbose, &settings.logging.filter);
    tracing::debug!("Verbose mode enabled");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(execute_command(command, &settings))
}

/// Install the global subscriber. `--verbose` wins over `RUST_LOG`, which
/// wins over the configured filter.
fn init_tracing(verbose: bool, configured: &str) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured))
    };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .try_init();
    if installed.is_err() {
        eprintln!("{}: tracing subscriber already installed", "warning".yellow());
    }
}

async fn execute_command(cmd: Commands, settings: &Settings) -> Result<()> {
    match cmd {
        Commands::Compare { base, other, json } => {
            commands::run_compare(&base, &other, json).await
        }
        Commands::Sync(args) => commands::run_sync(&args, settings).await,
    }
}
