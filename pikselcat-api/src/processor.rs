//! Batch image processing through the governed client.

use std::path::{Path, PathBuf};
use std::time::Duration;

use pikselcat_core::{PikselError, ProcessAction, Progress};
use pikselcat_fetch::SubmitRequest;
use pikselcat_ingest::{EventSink, RunEvent, RunHandle};
use pikselcat_store::{ensure_dir, BlockReason, CallGuard};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::client::PixelcutClient;

/// Poll interval while another metered call is in flight.
const IN_FLIGHT_POLL: Duration = Duration::from_millis(100);

/// Result for one input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    /// The input path.
    pub input: String,
    /// Where the result was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Why the file failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PikselError>,
}

impl FileOutcome {
    fn ok(input: &str, output: PathBuf) -> Self {
        Self {
            input: input.to_string(),
            output: Some(output),
            error: None,
        }
    }

    fn failed(input: &str, error: PikselError) -> Self {
        Self {
            input: input.to_string(),
            output: None,
            error: Some(error),
        }
    }

    /// Returns true if the file was processed.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Counts at the end of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    /// Files written.
    pub processed: usize,
    /// Files that failed.
    pub failed: usize,
}

/// Events emitted by a processing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// Progress update; percentages strictly increase.
    Progress(Progress),
    /// One file finished.
    File(FileOutcome),
    /// All files were attempted.
    Completed(ProcessSummary),
    /// The run stopped early.
    Cancelled,
}

impl RunEvent for ProcessEvent {
    fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Cancelled)
    }
}

/// Runs one action over a list of files.
///
/// Each file costs one metered call, so every upload goes through the quota
/// governor. A rate-limited or in-flight block waits; a daily-limit block
/// fails the file.
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    client: PixelcutClient,
}

impl BatchProcessor {
    /// Creates a processor using `client`'s transport and governor.
    pub fn new(client: PixelcutClient) -> Self {
        Self { client }
    }

    /// Starts processing `files` into `output_dir`.
    pub fn start(
        &self,
        files: Vec<String>,
        action: ProcessAction,
        output_dir: PathBuf,
    ) -> RunHandle<ProcessEvent> {
        let client = self.client.clone();
        RunHandle::spawn(CancellationToken::new(), move |sink, token| {
            run_batch(client, files, action, output_dir, token, sink)
        })
    }
}

#[instrument(skip_all, fields(action = action.label(), total = files.len()))]
async fn run_batch(
    client: PixelcutClient,
    files: Vec<String>,
    action: ProcessAction,
    output_dir: PathBuf,
    token: CancellationToken,
    sink: EventSink<ProcessEvent>,
) {
    let total = files.len();
    let mut summary = ProcessSummary::default();
    let mut last_percent = 0u8;

    let start = Progress::new(0, format!("Starting {} for {total} files...", action.label()));
    if !sink.send(ProcessEvent::Progress(start)).await {
        return;
    }

    let key = client.store().api_key().await;
    let setup = match key {
        None => Err(PikselError::UpstreamUnauthorized),
        Some(key) => ensure_dir(&output_dir)
            .await
            .map(|()| key)
            .map_err(|e| {
                PikselError::CorruptOrUnreadable(format!("{}: {e}", output_dir.display()))
            }),
    };

    for (index, input) in files.iter().enumerate() {
        if token.is_cancelled() {
            info!(processed = summary.processed, "Processing cancelled");
            sink.send(ProcessEvent::Cancelled).await;
            return;
        }

        let percent = Progress::percent_of(index, total);
        if percent > last_percent && percent < 100 {
            last_percent = percent;
            let name = file_name(input);
            let progress = Progress::new(percent, format!("Processing {name}..."));
            if !sink.send(ProcessEvent::Progress(progress)).await {
                return;
            }
        }

        let outcome = match &setup {
            Ok(key) => match process_one(&client, key, input, action, &output_dir, &token).await {
                Ok(output) => FileOutcome::ok(input, output),
                Err(PikselError::Cancelled) => {
                    sink.send(ProcessEvent::Cancelled).await;
                    return;
                }
                Err(e) => {
                    warn!(file = %input, error = %e, "File failed");
                    FileOutcome::failed(input, e)
                }
            },
            Err(e) => FileOutcome::failed(input, e.clone()),
        };

        if outcome.is_success() {
            summary.processed += 1;
        } else {
            summary.failed += 1;
        }
        if !sink.send(ProcessEvent::File(outcome)).await {
            return;
        }
    }

    info!(processed = summary.processed, failed = summary.failed, "Processing completed");
    let done = Progress::new(
        100,
        format!("Completed: {} processed, {} failed", summary.processed, summary.failed),
    );
    if sink.send(ProcessEvent::Progress(done)).await {
        sink.send(ProcessEvent::Completed(summary)).await;
    }
}

async fn process_one(
    client: &PixelcutClient,
    key: &str,
    input: &str,
    action: ProcessAction,
    output_dir: &Path,
    token: &CancellationToken,
) -> Result<PathBuf, PikselError> {
    let path = Path::new(input);
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PikselError::NotFound(input.to_string()),
        _ => PikselError::CorruptOrUnreadable(format!("{input}: {e}")),
    })?;

    let call = reserve_call(client, token).await?;

    let request = SubmitRequest {
        action,
        file_name: file_name(input),
        bytes,
    };
    let submitted = client.transport().submit_image(key, request).await;
    match &submitted {
        Ok(_) => call.success(),
        Err(e) if e.is_rate_limited() => call.refund().await,
        Err(_) => call.failure(),
    }
    // The reserved call is settled; persist the counter before anything
    // below can fail.
    persist(client).await;
    let url = submitted.map_err(|e| e.to_failure())?;

    let result = client
        .transport()
        .download(&url)
        .await
        .map_err(|e| e.to_failure())?;

    let output = output_dir.join(action.output_file_name(path));
    tokio::fs::write(&output, &result)
        .await
        .map_err(|e| PikselError::CorruptOrUnreadable(format!("{}: {e}", output.display())))?;

    debug!(output = %output.display(), "File processed");
    Ok(output)
}

async fn persist(client: &PixelcutClient) {
    if let Err(e) = client.store().save().await {
        warn!(error = %e, "Failed to save configuration");
    }
}

/// Waits until the governor allows a call.
async fn reserve_call(
    client: &PixelcutClient,
    token: &CancellationToken,
) -> Result<CallGuard, PikselError> {
    loop {
        let wait = match client.governor().reserve().await {
            Ok(call) => return Ok(call),
            Err(reason @ BlockReason::DailyLimit { .. }) => return Err(reason.to_failure()),
            Err(BlockReason::RateLimited { retry_in }) => retry_in,
            Err(BlockReason::InFlight) => IN_FLIGHT_POLL,
        };

        debug!(?wait, "Waiting for the governor");
        tokio::select! {
            () = tokio::time::sleep(wait) => {}
            () = token.cancelled() => return Err(PikselError::Cancelled),
        }
    }
}

fn file_name(input: &str) -> String {
    Path::new(input)
        .file_name()
        .map_or_else(|| input.to_string(), |n| n.to_string_lossy().into_owned())
}
