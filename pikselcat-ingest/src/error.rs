//! Ingest error types.
//!
//! Per-file problems are reported as [`pikselcat_core::PikselError`] inside
//! the run results; this type only covers the run itself.

use thiserror::Error;

/// Errors from driving a run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The background task panicked or was aborted.
    #[error("Run task failed: {0}")]
    TaskFailed(String),
}

impl From<tokio::task::JoinError> for IngestError {
    fn from(err: tokio::task::JoinError) -> Self {
        IngestError::TaskFailed(err.to_string())
    }
}
