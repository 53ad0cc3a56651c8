//! Core error types for `PikselCat`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core error type for data handling inside `PikselCat`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid data from an API response or persisted document.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

/// The failure taxonomy shared by the ingestion pipeline and the API client.
///
/// Per-file variants (`NotFound`, `UnsupportedFormat`, `CorruptOrUnreadable`)
/// only ever downgrade a single file. API variants are surfaced to callers
/// with enough detail to decide whether to retry.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PikselError {
    /// Candidate path does not exist.
    #[error("File not found: {0}")]
    NotFound(String),

    /// Extension is outside the image allow-list.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// File exists but its header could not be read, or it is truncated.
    #[error("Corrupt or unreadable file: {0}")]
    CorruptOrUnreadable(String),

    /// Transport failure, non-2xx status, or malformed payload.
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// The provider answered HTTP 429.
    #[error("Rate limited by the API{}", fmt_retry(.retry_after))]
    UpstreamRateLimited {
        /// Provider hint for when to retry.
        retry_after: Option<Duration>,
    },

    /// The provider answered HTTP 401.
    #[error("Invalid API key")]
    UpstreamUnauthorized,

    /// The provider answered HTTP 403.
    #[error("Access forbidden for this API key")]
    UpstreamForbidden,

    /// The balance is zero or negative.
    #[error("Insufficient credits")]
    InsufficientBalance {
        /// Balance observed when the check failed.
        available: i64,
    },

    /// The daily call ceiling has been reached.
    #[error("Daily API call limit reached ({limit} calls)")]
    DailyQuotaExceeded {
        /// The configured ceiling.
        limit: u32,
    },

    /// The minimum interval between calls has not elapsed, or a call is in flight.
    #[error("Too many requests, retry in {}s", .retry_in.as_secs().max(1))]
    LocalRateLimited {
        /// How long until a call is permitted again.
        retry_in: Duration,
    },

    /// The run or call was cancelled.
    #[error("Cancelled")]
    Cancelled,
}

fn fmt_retry(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(", retry after {}s", d.as_secs()),
        None => String::new(),
    }
}

impl PikselError {
    /// Returns true when the same request may succeed later without changes.
    pub fn is_try_again_later(&self) -> bool {
        matches!(
            self,
            Self::UpstreamRateLimited { .. }
                | Self::LocalRateLimited { .. }
                | Self::DailyQuotaExceeded { .. }
        )
    }

    /// Returns true when the credential will never work as-is.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::UpstreamUnauthorized | Self::UpstreamForbidden)
    }

    /// Returns true for transient transport problems.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NetworkFailure(_))
    }

    /// Returns true for per-file errors raised by the ingestion pipeline.
    pub fn is_file_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::UnsupportedFormat(_) | Self::CorruptOrUnreadable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classes_are_disjoint() {
        let all = [
            PikselError::NotFound("a".into()),
            PikselError::UnsupportedFormat("b".into()),
            PikselError::CorruptOrUnreadable("c".into()),
            PikselError::NetworkFailure("d".into()),
            PikselError::UpstreamRateLimited { retry_after: None },
            PikselError::UpstreamUnauthorized,
            PikselError::UpstreamForbidden,
            PikselError::InsufficientBalance { available: 0 },
            PikselError::DailyQuotaExceeded { limit: 10 },
            PikselError::LocalRateLimited { retry_in: Duration::from_secs(2) },
            PikselError::Cancelled,
        ];

        for err in &all {
            let classes = [err.is_try_again_later(), err.is_permanent(), err.is_transient()];
            assert!(classes.iter().filter(|c| **c).count() <= 1, "{err:?}");
        }
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(PikselError::UpstreamUnauthorized.to_string(), "Invalid API key");
        assert_eq!(
            PikselError::InsufficientBalance { available: 0 }.to_string(),
            "Insufficient credits"
        );
        assert_eq!(
            PikselError::UpstreamRateLimited { retry_after: Some(Duration::from_secs(30)) }
                .to_string(),
            "Rate limited by the API, retry after 30s"
        );
        assert_eq!(
            PikselError::LocalRateLimited { retry_in: Duration::from_millis(300) }.to_string(),
            "Too many requests, retry in 1s"
        );
    }

    #[test]
    fn test_file_errors() {
        assert!(PikselError::NotFound("x".into()).is_file_error());
        assert!(!PikselError::Cancelled.is_file_error());
    }
}
