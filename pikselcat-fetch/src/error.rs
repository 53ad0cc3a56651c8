//! Fetch error types.

use std::time::Duration;

use pikselcat_core::PikselError;
use thiserror::Error;

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for calls to the provider.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Rate limited by the provider (HTTP 429).
    #[error("Rate limited, retry after {retry_after:?} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after: Option<u64>,
    },

    /// The API key was rejected (HTTP 401).
    #[error("Unauthorized")]
    Unauthorized,

    /// The API key may not use this endpoint (HTTP 403).
    #[error("Forbidden")]
    Forbidden,

    /// The API key cannot be sent as a header value.
    #[error("Malformed API key: {0}")]
    MalformedKey(String),

    /// Any other non-2xx status.
    #[error("API error {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error message from the body, or a generic one.
        message: String,
    },

    /// Invalid response from the provider.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP layer error.
    #[error(transparent)]
    Client(#[from] HttpError),
}

impl FetchError {
    /// Maps this error onto the shared failure taxonomy.
    pub fn to_failure(&self) -> PikselError {
        match self {
            Self::RateLimited { retry_after } => PikselError::UpstreamRateLimited {
                retry_after: retry_after.map(Duration::from_secs),
            },
            Self::Unauthorized | Self::MalformedKey(_) => PikselError::UpstreamUnauthorized,
            Self::Forbidden => PikselError::UpstreamForbidden,
            other => PikselError::NetworkFailure(other.to_string()),
        }
    }

    /// Returns true if the provider answered 429.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Returns true for failures worth retrying on an idempotent request.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            Self::Timeout(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

// ============================================================================
// HTTP Error
// ============================================================================

/// HTTP-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The underlying client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Build(String),

    /// Domain not allowed.
    #[error("Domain not allowed: {0}")]
    DomainNotAllowed(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}
