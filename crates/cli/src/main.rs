//! vanguard: single-node application orchestrator
//!
//! Subcommands:
//! - `vanguard serve` - boot the environment and supervise it until interrupted
//! - `vanguard validate <path>` - resolve a definitions directory and print the services
//! - `vanguard info` - show platform and workspace information

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;
mod config;
mod providers;

#[derive(Parser)]
#[command(name = "vanguard")]
#[command(author, version, about = "Single-node application orchestrator")]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Boot the environment and supervise it until interrupted
  Serve,

  /// Load a definitions directory and print the resolved services
  Validate {
    /// Path to the definitions directory
    path: PathBuf,
  },

  /// Show platform and workspace information
  Info,
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
  FmtSubscriber::builder().with_max_level(level).with_target(false).init();

  match cli.command {
    Commands::Serve => commands::serve::run().await,
    Commands::Validate { path } => commands::validate::run(&path).await,
    Commands::Info => commands::info::run(),
  }
}
