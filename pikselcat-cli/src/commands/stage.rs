//! Stage command - validate files and build the staged list.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use pikselcat_ingest::{
    stage_files, IngestConfig, MaterializeEvent, RunEvent, StageEvent, StagingSummary,
    ValidationEvent,
};

use super::cancel_on_ctrl_c;
use crate::output::{JsonFormatter, StageOutput, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the stage command.
#[derive(Args)]
pub struct StageArgs {
    /// Files to validate and stage.
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Show progress on stderr.
    #[arg(long)]
    pub progress: bool,

    /// Pause between scheduling ticks, in milliseconds.
    #[arg(long)]
    pub tick_ms: Option<u64>,
}

/// Runs the stage command.
pub async fn run(args: &StageArgs, cli: &Cli) -> Result<ExitCode> {
    let mut config = IngestConfig::default();
    if let Some(ms) = args.tick_ms {
        config = config.with_tick_delay(Duration::from_millis(ms));
    }

    let mut handle = stage_files(args.paths.clone(), config);
    let interrupt = cancel_on_ctrl_c(handle.cancel_token());
    let text = TextFormatter::new(cli.use_colors());

    let mut terminal = None;
    while let Some(event) = handle.next_event().await {
        if event.is_terminal() {
            terminal = Some(event);
            break;
        }
        if args.progress && !cli.quiet {
            if let StageEvent::Validation(ValidationEvent::Progress(p))
            | StageEvent::Materialize(MaterializeEvent::Progress(p)) = &event
            {
                eprintln!("{}", text.format_progress(p));
            }
        }
    }
    interrupt.abort();

    let Some(StageEvent::Completed { validation, items }) = terminal else {
        if !cli.quiet {
            eprintln!("Staging cancelled");
        }
        return Ok(ExitCode::Cancelled);
    };

    let summary = StagingSummary::from_items(&items);
    match cli.format {
        OutputFormat::Text => println!("{}", text.format_stage(&validation, &summary)),
        OutputFormat::Json => {
            let output = StageOutput::new(&validation, items, &summary);
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }

    Ok(ExitCode::Success)
}
