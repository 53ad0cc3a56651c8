//! Quota command - today's API call budget.

use anyhow::Result;
use pikselcat_store::QuotaGovernor;

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Runs the quota command.
pub async fn run(cli: &Cli) -> Result<ExitCode> {
    let store = cli.load_store().await?;
    let status = QuotaGovernor::new(store).status().await;

    match cli.format {
        OutputFormat::Text => {
            println!("{}", TextFormatter::new(cli.use_colors()).format_quota(&status));
        }
        OutputFormat::Json => println!("{}", JsonFormatter::new(cli.pretty).format(&status)?),
    }
    Ok(ExitCode::Success)
}
