//! Config command - show the configuration and its location.

use anyhow::Result;
use clap::{Args, Subcommand};
use pikselcat_store::{default_config_dir, default_config_path};

use crate::output::{mask_key, JsonFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration paths.
    Path,
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli) -> Result<ExitCode> {
    match &args.action {
        ConfigAction::Show => show_config(cli).await,
        ConfigAction::Path => show_paths(cli),
    }
}

async fn show_config(cli: &Cli) -> Result<ExitCode> {
    let store = cli.load_store().await?;
    let mut document = store.snapshot().await;
    document.api_key = document.api_key.as_deref().map(mask_key);
    // Cache keys are full credentials.
    let cached = document.api_validation_cache.len();
    document.api_validation_cache = Default::default();

    match cli.format {
        OutputFormat::Text => {
            let settings = &document.client;
            println!("PikselCat Configuration");
            println!("{}", "─".repeat(40));
            println!();
            println!("File:            {}", store.path().display());
            println!(
                "API key:         {}",
                document.api_key.as_deref().unwrap_or("(not set)")
            );
            println!("Cached verdicts: {cached}");
            println!();
            println!("Cache duration:  {}s", settings.cache_duration_secs);
            println!("Daily limit:     {} calls", settings.daily_call_limit);
            println!("Min interval:    {}ms", settings.min_call_interval_ms);
            println!("Request timeout: {}s", settings.request_timeout_secs);
            println!("Upload timeout:  {}s", settings.processing_timeout_secs);
            println!();
            println!("Endpoints:");
            println!("  credits:           {}", document.api_endpoints.credits);
            println!("  remove-background: {}", document.api_endpoints.remove_background);
            println!("  upscale:           {}", document.api_endpoints.upscale);
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&document)?);
        }
    }

    Ok(ExitCode::Success)
}

fn show_paths(cli: &Cli) -> Result<ExitCode> {
    let config_dir = default_config_dir();
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:  {}", config_dir.display());
            println!("Config file: {}", config_path.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "config_file": config_path.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(ExitCode::Success)
}
