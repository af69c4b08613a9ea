//! Hearth - resource cache and dependency-invalidation engine
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use hearth::cli::{Cli, Commands};
use hearth::config::{Config, ConfigManager};
use hearth::error::HearthResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> HearthResult<()> {
    let cli = Cli::parse();

    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };
    let config = config_manager.load().await?;

    init_logging(cli.verbose, &config);
    debug!("Loaded configuration from {}", config_manager.path().display());

    // Dispatch to command
    match cli.command {
        Commands::Load(args) => hearth::cli::commands::load(args, &config, cli.root).await,
        Commands::Resolve(args) => hearth::cli::commands::resolve(args),
        Commands::Watch(args) => hearth::cli::commands::watch(args, &config, cli.root).await,
        Commands::Config(args) => {
            hearth::cli::commands::config(args, &config, &config_manager).await
        }
    }
}

/// 0 = warn, 1 = info, 2+ = debug; `general.verbose` counts as one `-v`
fn init_logging(verbose: u8, config: &Config) {
    let level = if config.general.verbose {
        verbose.max(1)
    } else {
        verbose
    };
    let filter = match level {
        0 => EnvFilter::new("hearth=warn"),
        1 => EnvFilter::new("hearth=info"),
        _ => EnvFilter::new("hearth=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
