//! Process command - run a Pixelcut action over files.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use pikselcat_api::{BatchProcessor, PixelcutClient, ProcessEvent, ProcessSummary};
use pikselcat_core::ProcessAction;
use pikselcat_ingest::{start_validation, IngestConfig, RunEvent, ValidationEvent};
use tracing::warn;

use super::cancel_on_ctrl_c;
use crate::output::{JsonFormatter, ProcessOutput, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Action: remove-bg, upscale-2x, or upscale-4x.
    #[arg(long, short)]
    pub action: ProcessAction,

    /// Output directory.
    #[arg(long, short)]
    pub output: PathBuf,

    /// Files to process.
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Show progress on stderr.
    #[arg(long)]
    pub progress: bool,
}

/// Runs the process command.
pub async fn run(args: &ProcessArgs, cli: &Cli) -> Result<ExitCode> {
    let text = TextFormatter::new(cli.use_colors());

    // Only files that pass validation are uploaded.
    let validation = start_validation(args.paths.clone(), IngestConfig::default());
    let interrupt = cancel_on_ctrl_c(validation.cancel_token());
    let terminal = validation.finish().await;
    interrupt.abort();

    let Some(ValidationEvent::Completed(result)) = terminal else {
        return Ok(ExitCode::Cancelled);
    };
    for entry in result.entries.iter().filter(|e| !e.is_accepted()) {
        if let Some(reason) = &entry.rejection {
            warn!(path = %entry.path, %reason, "Skipping file");
        }
    }
    let files = result.accepted_paths();

    let store = cli.load_store().await?;
    let client = PixelcutClient::connect(store).await?;
    let count = i64::try_from(files.len()).unwrap_or(i64::MAX);
    if !client.has_sufficient_credits(count).await && !cli.quiet {
        eprintln!(
            "Warning: last known balance is {} credits for {count} files",
            client.last_known_credits().await
        );
    }

    let mut handle = BatchProcessor::new(client).start(files, args.action, args.output.clone());
    let interrupt = cancel_on_ctrl_c(handle.cancel_token());

    let mut outcomes = Vec::new();
    let mut summary: Option<ProcessSummary> = None;
    while let Some(event) = handle.next_event().await {
        let terminal = event.is_terminal();
        match event {
            ProcessEvent::Progress(p) => {
                if args.progress && !cli.quiet {
                    eprintln!("{}", text.format_progress(&p));
                }
            }
            ProcessEvent::File(outcome) => {
                if cli.format == OutputFormat::Text && !cli.quiet {
                    println!("{}", text.format_file_outcome(&outcome));
                }
                outcomes.push(outcome);
            }
            ProcessEvent::Completed(s) => summary = Some(s),
            ProcessEvent::Cancelled => {}
        }
        if terminal {
            break;
        }
    }
    interrupt.abort();

    let rejected = result.rejected_count();
    let Some(summary) = summary else {
        if !cli.quiet {
            eprintln!("Processing cancelled");
        }
        return Ok(ExitCode::Cancelled);
    };

    match cli.format {
        OutputFormat::Text => println!("{}", text.format_process_summary(&summary, rejected)),
        OutputFormat::Json => {
            let output = ProcessOutput {
                action: args.action,
                summary,
                skipped: rejected,
                files: outcomes,
            };
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }

    Ok(if summary.failed > 0 || rejected > 0 {
        ExitCode::PartialFailure
    } else {
        ExitCode::Success
    })
}
