//! Credits command - balance and billing period.

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use pikselcat_api::PixelcutClient;
use pikselcat_core::CreditStatistics;

use crate::output::{CreditsOutput, JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the credits command.
#[derive(Args, Default)]
pub struct CreditsArgs {
    /// Ask the API even if the stored balance is recent.
    #[arg(long, short)]
    pub refresh: bool,
}

/// Runs the credits command.
pub async fn run(args: &CreditsArgs, cli: &Cli) -> Result<ExitCode> {
    let store = cli.load_store().await?;
    let client = PixelcutClient::connect(store.clone()).await?;

    let report = if args.refresh {
        client.refresh_credits().await
    } else {
        client.fetch_credits().await
    };

    let statistics = store
        .credit_snapshot()
        .await
        .map_or_else(CreditStatistics::empty, |s| {
            CreditStatistics::from_snapshot(&s, Utc::now())
        });

    match cli.format {
        OutputFormat::Text => {
            let text = TextFormatter::new(cli.use_colors());
            println!("{}", text.format_credits(&report, &statistics));
        }
        OutputFormat::Json => {
            let output = CreditsOutput::new(&report, statistics);
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }

    Ok(ExitCode::Success)
}
