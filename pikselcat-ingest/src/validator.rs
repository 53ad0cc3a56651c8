//! Validation run: filters candidates by existence, extension, and header.

use std::path::Path;

use pikselcat_core::{CheckedCandidate, Progress, ValidationResult};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::config::IngestConfig;
use crate::probe::inspect;
use crate::run::{tick, EventSink, RunEvent, RunHandle};

/// Events emitted by a validation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationEvent {
    /// Progress update; percentages strictly increase.
    Progress(Progress),
    /// One candidate was checked.
    Checked(CheckedCandidate),
    /// All candidates were checked.
    Completed(ValidationResult),
    /// The run stopped early.
    Cancelled,
}

impl RunEvent for ValidationEvent {
    fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Cancelled)
    }
}

/// Starts validating `paths` on a new task.
pub fn start_validation(paths: Vec<String>, config: IngestConfig) -> RunHandle<ValidationEvent> {
    start_validation_with_token(paths, config, CancellationToken::new())
}

/// Starts validating `paths` under an existing token.
pub fn start_validation_with_token(
    paths: Vec<String>,
    config: IngestConfig,
    token: CancellationToken,
) -> RunHandle<ValidationEvent> {
    RunHandle::spawn(token, move |sink, token| run_validation(paths, config, token, sink))
}

#[instrument(skip_all, fields(total = paths.len()))]
async fn run_validation(
    paths: Vec<String>,
    config: IngestConfig,
    token: CancellationToken,
    sink: EventSink<ValidationEvent>,
) {
    let total = paths.len();
    let every = config.progress_every();

    if !sink
        .send(ValidationEvent::Progress(Progress::new(0, format!("Scanning {total} files..."))))
        .await
    {
        return;
    }

    let mut entries: Vec<CheckedCandidate> = Vec::with_capacity(total);
    let mut last_percent = 0u8;

    for batch in paths.chunks(config.batch_size()) {
        if token.is_cancelled() {
            break;
        }

        for path in batch {
            if token.is_cancelled() {
                break;
            }

            let checked = match inspect(Path::new(path), config.min_file_size).await {
                Ok(_) => CheckedCandidate::accepted(path.clone()),
                Err(reason) => {
                    debug!(path = %path, %reason, "Candidate rejected");
                    CheckedCandidate::rejected(path.clone(), reason)
                }
            };
            entries.push(checked.clone());
            if !sink.send(ValidationEvent::Checked(checked)).await {
                return;
            }

            let done = entries.len();
            if done % every == 0 || done == total {
                let percent = Progress::percent_of(done, total);
                if percent > last_percent && percent < 100 {
                    last_percent = percent;
                    let progress = Progress::new(percent, format!("Processed {done}/{total} files"));
                    if !sink.send(ValidationEvent::Progress(progress)).await {
                        return;
                    }
                }
            }

            tokio::task::yield_now().await;
        }

        tick(config.tick_delay, &token).await;
    }

    if token.is_cancelled() {
        info!(checked = entries.len(), "Validation cancelled");
        sink.send(ValidationEvent::Cancelled).await;
        return;
    }

    let result = ValidationResult { entries };
    info!(
        accepted = result.accepted_count(),
        rejected = result.rejected_count(),
        "Validation completed"
    );

    if sink
        .send(ValidationEvent::Progress(Progress::new(100, format!("Processed {total}/{total} files"))))
        .await
    {
        sink.send(ValidationEvent::Completed(result)).await;
    }
}
