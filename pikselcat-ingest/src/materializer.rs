//! Incremental materializer.
//!
//! Turns accepted paths into presentable items one per scheduling tick.
//! Cancellation is checked after each build and before publishing, so an item
//! built while cancellation arrived is released instead of published.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use pikselcat_core::{ImageFormat, PikselError, Progress, StagedItem};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::IngestConfig;
use crate::probe::read_dimensions;
use crate::run::{tick, EventSink, RunEvent, RunHandle};

// ============================================================================
// Item Factory
// ============================================================================

/// Builds and releases items for the materializer.
#[async_trait]
pub trait ItemFactory: Send + Sync + 'static {
    /// The item type produced.
    type Item: Clone + Send + 'static;

    /// Builds the item for one path.
    async fn build(&self, path: &str) -> Result<Self::Item, PikselError>;

    /// Releases an item that will never be published.
    async fn release(&self, item: Self::Item);
}

/// Builds [`StagedItem`]s from files on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileItemFactory;

#[async_trait]
impl ItemFactory for FileItemFactory {
    type Item = StagedItem;

    async fn build(&self, path: &str) -> Result<StagedItem, PikselError> {
        let path_ref = Path::new(path);
        let meta = tokio::fs::metadata(path_ref)
            .await
            .map_err(|_| PikselError::NotFound(path.to_string()))?;
        let format = ImageFormat::from_path(path_ref)?;

        // Dimensions are informational here; the validator already checked the header.
        let dimensions = read_dimensions(path_ref.to_path_buf()).await.ok();

        Ok(StagedItem::new(path_ref, meta.len(), format, dimensions))
    }

    async fn release(&self, item: StagedItem) {
        debug!(path = %item.path, "Released unpublished item");
    }
}

// ============================================================================
// Events
// ============================================================================

/// Events emitted by a materialization run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterializeEvent<T> {
    /// Progress update; percentages strictly increase.
    Progress(Progress),
    /// One item is ready.
    Published(T),
    /// Every path was processed. Carries all published items in order.
    Completed(Vec<T>),
    /// The run stopped early.
    Cancelled,
}

impl<T: Send + 'static> RunEvent for MaterializeEvent<T> {
    fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Cancelled)
    }
}

// ============================================================================
// Run
// ============================================================================

/// Starts materializing `paths` into [`StagedItem`]s.
pub fn start_materialization(
    paths: Vec<String>,
    config: IngestConfig,
) -> RunHandle<MaterializeEvent<StagedItem>> {
    start_materialization_with(paths, Arc::new(FileItemFactory), config, CancellationToken::new())
}

/// Starts materializing `paths` with a custom factory and token.
pub fn start_materialization_with<F: ItemFactory>(
    paths: Vec<String>,
    factory: Arc<F>,
    config: IngestConfig,
    token: CancellationToken,
) -> RunHandle<MaterializeEvent<F::Item>> {
    RunHandle::spawn(token, move |sink, token| {
        run_materialization(paths, factory, config, token, sink)
    })
}

#[instrument(skip_all, fields(total = paths.len()))]
async fn run_materialization<F: ItemFactory>(
    paths: Vec<String>,
    factory: Arc<F>,
    config: IngestConfig,
    token: CancellationToken,
    sink: EventSink<MaterializeEvent<F::Item>>,
) {
    let total = paths.len();
    let mut published: Vec<F::Item> = Vec::with_capacity(total);
    let mut last_percent: Option<u8> = None;

    for (index, path) in paths.iter().enumerate() {
        if token.is_cancelled() {
            sink.send(MaterializeEvent::Cancelled).await;
            return;
        }

        let percent = Progress::percent_of(index, total);
        if last_percent.is_none_or(|last| percent > last) && percent < 100 {
            last_percent = Some(percent);
            let name = Path::new(path)
                .file_name()
                .map_or_else(|| path.clone(), |n| n.to_string_lossy().into_owned());
            let progress = Progress::new(percent, format!("Creating item for: {name}"));
            if !sink.send(MaterializeEvent::Progress(progress)).await {
                return;
            }
        }

        let item = match factory.build(path).await {
            Ok(item) => item,
            Err(e) => {
                warn!(path = %path, error = %e, "Skipping item that failed to build");
                tick(config.tick_delay, &token).await;
                continue;
            }
        };

        if token.is_cancelled() {
            factory.release(item).await;
            info!(published = published.len(), "Materialization cancelled");
            sink.send(MaterializeEvent::Cancelled).await;
            return;
        }

        published.push(item.clone());
        if !sink.send(MaterializeEvent::Published(item)).await {
            return;
        }

        tick(config.tick_delay, &token).await;
    }

    if token.is_cancelled() {
        sink.send(MaterializeEvent::Cancelled).await;
        return;
    }

    info!(published = published.len(), "Materialization completed");
    if sink
        .send(MaterializeEvent::Progress(Progress::new(100, "All items created")))
        .await
    {
        sink.send(MaterializeEvent::Completed(published)).await;
    }
}
