// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! `PikselCat` CLI - bulk image staging and Pixelcut processing.
//!
//! # Examples
//!
//! ```bash
//! # Validate and stage a batch of files
//! pikselcat stage ~/Pictures/*.jpg
//!
//! # Check an API key (stored as the active key when it has credits)
//! pikselcat key validate sk_live_xxx
//!
//! # Show the credit balance, forcing a network refresh
//! pikselcat credits --refresh
//!
//! # Remove backgrounds into ./out
//! pikselcat process --action remove-bg --output out photo1.png photo2.jpg
//!
//! # Today's API call budget
//! pikselcat quota --format json --pretty
//! ```

mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use pikselcat_core::system_clock;
use pikselcat_store::{default_config_path, ConfigStore};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{config, credits, key, process, quota, stage};

// ============================================================================
// CLI Definition
// ============================================================================

/// `PikselCat` CLI - bulk image staging and Pixelcut processing.
#[derive(Parser)]
#[command(name = "pikselcat")]
#[command(about = "Bulk image staging and a quota-governed Pixelcut API client")]
#[command(long_about = r"
PikselCat validates and stages image files and sends them to the Pixelcut
API for background removal and upscaling. API calls are limited per day and
spaced out; credential checks and credit balances are cached.

Accepted formats: jpg, jpeg, png, tif, tiff, webp

Examples:
  pikselcat stage ./photos/*.png              # Validate and stage files
  pikselcat key validate sk_live_xxx          # Check an API key
  pikselcat credits                           # Credit balance and expiry
  pikselcat process -a upscale-2x -o out *.jpg
  pikselcat quota                             # API calls left today
")]
#[command(version)]
#[command(author = "PikselCat Contributors")]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Configuration file to use instead of the default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Validate files and build the staged list.
    #[command(visible_alias = "s")]
    Stage(stage::StageArgs),

    /// Manage the API key.
    Key(key::KeyArgs),

    /// Show the credit balance and billing period.
    #[command(visible_alias = "c")]
    Credits(credits::CreditsArgs),

    /// Run a Pixelcut action over files.
    #[command(visible_alias = "p")]
    Process(process::ProcessArgs),

    /// Show today's API call budget.
    Quota,

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// The API key was rejected or has no credits.
    InvalidKey = 2,
    /// Some files could not be processed.
    PartialFailure = 3,
    /// The run was cancelled.
    Cancelled = 130,
}

impl Cli {
    /// Loads the configuration store from `--config` or the default path.
    pub async fn load_store(&self) -> Result<ConfigStore> {
        let path = self.config.clone().unwrap_or_else(default_config_path);
        Ok(ConfigStore::load(path, system_clock()).await?)
    }

    /// Whether text output should use ANSI colors.
    pub fn use_colors(&self) -> bool {
        !self.no_color
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("pikselcat=debug,info")
    } else {
        EnvFilter::new("pikselcat=warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Stage(args) => stage::run(args, &cli).await,
        Commands::Key(args) => key::run(args, &cli).await,
        Commands::Credits(args) => credits::run(args, &cli).await,
        Commands::Process(args) => process::run(args, &cli).await,
        Commands::Quota => quota::run(&cli).await,
        Commands::Config(args) => config::run(args, &cli).await,
    };

    match result {
        Ok(ExitCode::Success) => Ok(()),
        Ok(code) => std::process::exit(code as i32),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            std::process::exit(ExitCode::Error as i32);
        }
    }
}
