//! Endpoint and client settings persisted in the configuration document.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Default credits endpoint.
pub const DEFAULT_CREDITS_URL: &str = "https://api.developer.pixelcut.ai/v1/credits";
/// Default background removal endpoint.
pub const DEFAULT_REMOVE_BACKGROUND_URL: &str =
    "https://api.developer.pixelcut.ai/v1/remove-background";
/// Default upscale endpoint.
pub const DEFAULT_UPSCALE_URL: &str = "https://api.developer.pixelcut.ai/v1/upscale";

// ============================================================================
// Endpoints
// ============================================================================

/// Provider endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiEndpoints {
    /// Credit balance endpoint.
    pub credits: String,
    /// Background removal endpoint.
    pub remove_background: String,
    /// Upscale endpoint.
    pub upscale: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            credits: DEFAULT_CREDITS_URL.to_string(),
            remove_background: DEFAULT_REMOVE_BACKGROUND_URL.to_string(),
            upscale: DEFAULT_UPSCALE_URL.to_string(),
        }
    }
}

impl ApiEndpoints {
    /// All configured URLs.
    pub fn urls(&self) -> [&str; 3] {
        [&self.credits, &self.remove_background, &self.upscale]
    }
}

// ============================================================================
// Client Settings
// ============================================================================

/// Budget and timeout settings for the API client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// How long a cached verdict or credit snapshot is trusted.
    pub cache_duration_secs: u64,
    /// Hard ceiling on API calls per calendar day.
    pub daily_call_limit: u32,
    /// Minimum wall-clock gap between two API calls.
    pub min_call_interval_ms: u64,
    /// Timeout for credit checks.
    pub request_timeout_secs: u64,
    /// Timeout for image processing calls.
    pub processing_timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            cache_duration_secs: 300,
            daily_call_limit: 100,
            min_call_interval_ms: 2000,
            request_timeout_secs: 10,
            processing_timeout_secs: 60,
        }
    }
}

impl ClientSettings {
    /// Cache TTL as a chrono duration.
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.cache_duration_secs).unwrap_or(i64::MAX / 1000))
    }

    /// Minimum call interval as a chrono duration.
    pub fn min_interval(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(i64::try_from(self.min_call_interval_ms).unwrap_or(i64::MAX))
    }

    /// Timeout for credit checks.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Timeout for processing calls.
    pub fn processing_timeout(&self) -> Duration {
        Duration::from_secs(self.processing_timeout_secs)
    }

    /// Rejects settings that would disable the budget.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfig` for a zero TTL, limit, or timeout.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.cache_duration_secs == 0 {
            return Err(CoreError::InvalidConfig("cache_duration_secs must be positive".into()));
        }
        if self.daily_call_limit == 0 {
            return Err(CoreError::InvalidConfig("daily_call_limit must be positive".into()));
        }
        if self.request_timeout_secs == 0 || self.processing_timeout_secs == 0 {
            return Err(CoreError::InvalidConfig("timeouts must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ClientSettings::default();
        assert_eq!(settings.cache_ttl(), chrono::Duration::minutes(5));
        assert_eq!(settings.min_interval(), chrono::Duration::seconds(2));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let settings: ClientSettings = serde_json::from_str(r#"{"daily_call_limit": 5}"#).unwrap();
        assert_eq!(settings.daily_call_limit, 5);
        assert_eq!(settings.cache_duration_secs, 300);

        let endpoints: ApiEndpoints = serde_json::from_str("{}").unwrap();
        assert_eq!(endpoints, ApiEndpoints::default());
    }

    #[test]
    fn test_zero_limit_rejected() {
        let settings = ClientSettings {
            daily_call_limit: 0,
            ..ClientSettings::default()
        };
        assert!(matches!(settings.validate(), Err(CoreError::InvalidConfig(_))));
    }
}
