//! Pipeline tuning.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Knobs for the validator and materializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Candidates checked per batch.
    pub batch_size: usize,
    /// Emit validation progress every this many items.
    pub progress_every: usize,
    /// Files smaller than this are rejected as corrupt.
    pub min_file_size: u64,
    /// Pause between scheduling ticks. `None` yields to the runtime instead.
    pub tick_delay: Option<Duration>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            progress_every: 5,
            min_file_size: 100,
            tick_delay: None,
        }
    }
}

impl IngestConfig {
    /// Sets the tick delay.
    #[must_use]
    pub fn with_tick_delay(mut self, delay: Duration) -> Self {
        self.tick_delay = Some(delay);
        self
    }

    pub(crate) fn batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    pub(crate) fn progress_every(&self) -> usize {
        self.progress_every.max(1)
    }
}
