//! Validation followed by materialization under one cancellation token.

use std::sync::Arc;

use pikselcat_core::{StagedItem, ValidationResult};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::config::IngestConfig;
use crate::materializer::{start_materialization_with, FileItemFactory, MaterializeEvent};
use crate::run::{EventSink, RunEvent, RunHandle};
use crate::validator::{start_validation_with_token, ValidationEvent};

/// Events emitted while staging a batch of files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageEvent {
    /// A non-terminal validation event.
    Validation(ValidationEvent),
    /// A non-terminal materialization event.
    Materialize(MaterializeEvent<StagedItem>),
    /// Both stages finished.
    Completed {
        /// Outcome of the validation stage.
        validation: ValidationResult,
        /// Items built from the accepted paths.
        items: Vec<StagedItem>,
    },
    /// The run stopped early.
    Cancelled,
}

impl RunEvent for StageEvent {
    fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Cancelled)
    }
}

/// Validates `paths`, then materializes the accepted ones.
///
/// Cancelling the returned handle stops whichever stage is running.
pub fn stage_files(paths: Vec<String>, config: IngestConfig) -> RunHandle<StageEvent> {
    RunHandle::spawn(CancellationToken::new(), move |sink, token| {
        run_stage(paths, config, token, sink)
    })
}

#[instrument(skip_all, fields(total = paths.len()))]
async fn run_stage(
    paths: Vec<String>,
    config: IngestConfig,
    token: CancellationToken,
    sink: EventSink<StageEvent>,
) {
    let mut validation = start_validation_with_token(paths, config.clone(), token.child_token());
    let result = loop {
        match validation.next_event().await {
            Some(ValidationEvent::Completed(result)) => break result,
            Some(ValidationEvent::Cancelled) | None => {
                sink.send(StageEvent::Cancelled).await;
                return;
            }
            Some(event) => {
                if !sink.send(StageEvent::Validation(event)).await {
                    validation.cancel();
                    return;
                }
            }
        }
    };

    let accepted = result.accepted_paths();
    debug!(accepted = accepted.len(), "Validation stage done, materializing");

    let mut materialize = start_materialization_with(
        accepted,
        Arc::new(FileItemFactory),
        config,
        token.child_token(),
    );
    loop {
        match materialize.next_event().await {
            Some(MaterializeEvent::Completed(items)) => {
                sink.send(StageEvent::Completed {
                    validation: result,
                    items,
                })
                .await;
                return;
            }
            Some(MaterializeEvent::Cancelled) | None => {
                sink.send(StageEvent::Cancelled).await;
                return;
            }
            Some(event) => {
                if !sink.send(StageEvent::Materialize(event)).await {
                    materialize.cancel();
                    return;
                }
            }
        }
    }
}
