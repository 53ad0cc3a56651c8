// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `PikselCat` Ingest
//!
//! The staged ingestion pipeline. Each stage runs on its own tokio task,
//! reports over a bounded channel, and stops through a cancellation token.
//!
//! - **Validator**: filters candidate paths by existence, extension, size,
//!   and image header
//! - **Materializer**: builds one [`StagedItem`](pikselcat_core::StagedItem)
//!   per tick, releasing anything built after cancellation
//! - **Pipeline**: both stages under one token
//! - **Summary**: work-area header for a staged batch
//!
//! ## Usage
//!
//! ```ignore
//! use pikselcat_ingest::{stage_files, IngestConfig, StageEvent};
//!
//! let mut run = stage_files(paths, IngestConfig::default());
//! while let Some(event) = run.next_event().await {
//!     if let StageEvent::Completed { items, .. } = event {
//!         render(items);
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod materializer;
pub mod pipeline;
pub mod probe;
pub mod run;
pub mod summary;
pub mod validator;

pub use config::IngestConfig;
pub use error::IngestError;
pub use materializer::{
    start_materialization, start_materialization_with, FileItemFactory, ItemFactory,
    MaterializeEvent,
};
pub use pipeline::{stage_files, StageEvent};
pub use probe::{inspect, read_dimensions, FileFacts};
pub use run::{tick, EventSink, RunEvent, RunHandle, EVENT_CHANNEL_CAPACITY};
pub use summary::{StagingSummary, PREVIEW_LIMIT};
pub use validator::{start_validation, start_validation_with_token, ValidationEvent};
