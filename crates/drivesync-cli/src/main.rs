//! DriveSync CLI - Command-line interface for DriveSync
//!
//! Provides commands for:
//! - Mirroring Drive changes into object storage
//! - Inspecting pending changes
//! - Managing the stored checkpoint
//! - Downloading single files
//! - Managing credentials and configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use drivesync_core::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod output;

use commands::{
    auth::AuthCommand, changes::ChangesCommand, checkpoint::CheckpointCommand,
    config::ConfigCommand, download::DownloadCommand, sync::SyncCommand,
};
use context::AppContext;
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(
    name = "drivesync",
    version,
    about = "Incremental Google Drive to object storage mirror"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Mirror changed files into the configured sink
    Sync(SyncCommand),
    /// List pending changes without mirroring them
    Changes(ChangesCommand),
    /// Inspect or manage the stored checkpoint
    #[command(subcommand)]
    Checkpoint(CheckpointCommand),
    /// Download or export a single file
    Download(DownloadCommand),
    /// Manage stored credentials
    #[command(subcommand)]
    Auth(AuthCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Build the log filter: `RUST_LOG` wins, then `-v`, then `logging.level`
fn env_filter(verbose: u8, logging: &LoggingConfig) -> EnvFilter {
    let level = match verbose {
        0 => logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn init_tracing(verbose: u8, logging: &LoggingConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose, logging))
        .with_writer(std::io::stderr)
        .with_target(false);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let format = OutputFormat::from_flag(cli.json);

    let ctx = match AppContext::load(cli.config.as_deref()) {
        Ok(ctx) => ctx,
        Err(e) => {
            get_formatter(format).error(&format!("{e:#}"));
            std::process::exit(2);
        }
    };
    init_tracing(cli.verbose, &ctx.config.logging);

    let result = match &cli.command {
        Commands::Sync(cmd) => cmd.execute(&ctx, format).await,
        Commands::Changes(cmd) => cmd.execute(&ctx, format).await,
        Commands::Checkpoint(cmd) => cmd.execute(&ctx, format).await,
        Commands::Download(cmd) => cmd.execute(&ctx, format).await,
        Commands::Auth(cmd) => cmd.execute(&ctx, format).await,
        Commands::Config(cmd) => cmd.execute(&ctx, format).await,
    };

    if let Err(e) = result {
        tracing::error!(error = %format!("{e:#}"), "Command failed");
        get_formatter(format).error(&format!("{e:#}"));
        std::process::exit(1);
    }
    Ok(())
}
