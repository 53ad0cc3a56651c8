//! Key command - validate, show, or clear the API key.

use anyhow::Result;
use clap::{Args, Subcommand};
use pikselcat_api::PixelcutClient;

use crate::output::{mask_key, JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the key command.
#[derive(Args)]
pub struct KeyArgs {
    #[command(subcommand)]
    pub action: KeyAction,
}

/// Key subcommands.
#[derive(Subcommand)]
pub enum KeyAction {
    /// Check a key; a key with credits becomes the active key.
    Validate {
        /// The API key.
        credential: String,
    },

    /// Show the active key, masked.
    Show,

    /// Forget the active key and its credit snapshot.
    Clear,
}

/// Runs the key command.
pub async fn run(args: &KeyArgs, cli: &Cli) -> Result<ExitCode> {
    match &args.action {
        KeyAction::Validate { credential } => validate(credential, cli).await,
        KeyAction::Show => show(cli).await,
        KeyAction::Clear => clear(cli).await,
    }
}

async fn validate(credential: &str, cli: &Cli) -> Result<ExitCode> {
    let store = cli.load_store().await?;
    let client = PixelcutClient::connect(store).await?;
    let report = client.validate(credential).await;

    match cli.format {
        OutputFormat::Text => {
            println!("{}", TextFormatter::new(cli.use_colors()).format_validation(&report));
        }
        OutputFormat::Json => println!("{}", JsonFormatter::new(cli.pretty).format(&report)?),
    }

    Ok(if report.valid() {
        ExitCode::Success
    } else {
        ExitCode::InvalidKey
    })
}

async fn show(cli: &Cli) -> Result<ExitCode> {
    let store = cli.load_store().await?;
    let key = store.api_key().await;
    let masked = key.as_deref().map(mask_key);

    match cli.format {
        OutputFormat::Text => match masked {
            Some(masked) => println!("Active API key: {masked}"),
            None => println!("No API key configured"),
        },
        OutputFormat::Json => {
            let output = serde_json::json!({ "api_key": masked });
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }
    Ok(ExitCode::Success)
}

async fn clear(cli: &Cli) -> Result<ExitCode> {
    let store = cli.load_store().await?;
    let cleared = store
        .update(|d| {
            let had_key = d.api_key.is_some();
            d.api_key = None;
            d.pixelcut_credits = None;
            had_key
        })
        .await;
    store.save().await?;

    if !cli.quiet {
        if cleared {
            println!("API key cleared");
        } else {
            println!("No API key to clear");
        }
    }
    Ok(ExitCode::Success)
}
