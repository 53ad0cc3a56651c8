//! HTTP client with tracing and a domain allowlist.

use std::time::Duration;

use reqwest::{header, header::HeaderMap, multipart::Form, Client, Response};
use tracing::{debug, instrument};
use url::Url;

use crate::error::HttpError;

/// User agent string for PikselCat.
const USER_AGENT: &str = concat!("PikselCat/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client wrapper with request tracing and an optional domain allowlist.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    timeout: Duration,
    allowed_domains: Option<Vec<String>>,
}

impl HttpClient {
    /// Creates a client with the given timeout and no domain restrictions.
    ///
    /// # Errors
    ///
    /// Returns `HttpError::Build` if the TLS backend cannot be initialised.
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let inner = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;

        Ok(Self {
            inner,
            timeout,
            allowed_domains: None,
        })
    }

    /// Restricts requests to the given domains and their subdomains.
    #[must_use]
    pub fn allow_domains(mut self, domains: Vec<String>) -> Self {
        self.allowed_domains = Some(domains);
        self
    }

    /// Extracts hosts from a list of URLs for use as an allowlist.
    pub fn hosts_of<'a>(urls: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut hosts: Vec<String> = urls
            .into_iter()
            .filter_map(|u| Url::parse(u).ok())
            .filter_map(|u| u.host_str().map(str::to_string))
            .collect();
        hosts.sort();
        hosts.dedup();
        hosts
    }

    /// The configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Checks if a URL's domain is allowed.
    fn is_domain_allowed(&self, url: &str) -> Result<(), HttpError> {
        let parsed = Url::parse(url).map_err(|e| HttpError::InvalidUrl(e.to_string()))?;

        let host = parsed
            .host_str()
            .ok_or_else(|| HttpError::InvalidUrl("No host in URL".to_string()))?;

        let Some(ref allowed) = self.allowed_domains else {
            return Ok(());
        };

        let allowed = allowed
            .iter()
            .any(|domain| host == domain || host.ends_with(&format!(".{domain}")));

        if allowed {
            Ok(())
        } else {
            Err(HttpError::DomainNotAllowed(host.to_string()))
        }
    }

    /// Performs a GET request.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get(&self, url: &str) -> Result<Response, reqwest::Error> {
        debug!("GET request");
        let response = self.inner.get(url).send().await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    /// Checks the allowlist, then performs a GET with custom headers.
    ///
    /// Headers are skipped from the span; they carry the API key.
    ///
    /// # Errors
    ///
    /// Returns the allowlist error or the transport error.
    #[instrument(skip(self, headers), fields(url = %url))]
    pub async fn get_with_headers(
        &self,
        url: &str,
        headers: HeaderMap,
    ) -> Result<Response, crate::FetchError> {
        self.is_domain_allowed(url)?;
        debug!("GET request with headers");

        let response = self.inner.get(url).headers(headers).send().await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    /// Checks the allowlist, then POSTs a multipart form.
    ///
    /// # Errors
    ///
    /// Returns the allowlist error or the transport error.
    #[instrument(skip(self, headers, form), fields(url = %url))]
    pub async fn post_multipart(
        &self,
        url: &str,
        headers: HeaderMap,
        form: Form,
    ) -> Result<Response, crate::FetchError> {
        self.is_domain_allowed(url)?;
        debug!("POST multipart request");

        let response = self
            .inner
            .post(url)
            .headers(headers)
            .multipart(form)
            .send()
            .await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    /// Checks the allowlist without sending anything.
    ///
    /// # Errors
    ///
    /// Returns `HttpError::InvalidUrl` or `HttpError::DomainNotAllowed`.
    pub fn check_url(&self, url: &str) -> Result<(), HttpError> {
        self.is_domain_allowed(url)
    }
}

// ============================================================================
// Response Extensions
// ============================================================================

/// Extension trait for Response handling.
pub trait ResponseExt {
    /// Check if the response indicates rate limiting.
    fn is_rate_limited(&self) -> bool;

    /// Get the Retry-After header value in seconds.
    fn retry_after_secs(&self) -> Option<u64>;
}

impl ResponseExt for Response {
    fn is_rate_limited(&self) -> bool {
        self.status() == reqwest::StatusCode::TOO_MANY_REQUESTS
    }

    fn retry_after_secs(&self) -> Option<u64> {
        self.headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HttpClient {
        HttpClient::with_timeout(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_domain_allowlist() {
        let client = client().allow_domains(vec!["api.developer.pixelcut.ai".to_string()]);

        assert!(client.check_url("https://api.developer.pixelcut.ai/v1/credits").is_ok());
        assert!(client.check_url("https://eu.api.developer.pixelcut.ai/v1/credits").is_ok());
        assert!(matches!(
            client.check_url("https://evil.com/steal"),
            Err(HttpError::DomainNotAllowed(_))
        ));
    }

    #[test]
    fn test_no_domain_restrictions() {
        assert!(client().check_url("https://any.domain.com").is_ok());
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(client().check_url("not-a-valid-url"), Err(HttpError::InvalidUrl(_))));
    }

    #[test]
    fn test_hosts_of_dedups() {
        let hosts = HttpClient::hosts_of([
            "https://api.developer.pixelcut.ai/v1/credits",
            "https://api.developer.pixelcut.ai/v1/upscale",
            "garbage",
        ]);
        assert_eq!(hosts, vec!["api.developer.pixelcut.ai".to_string()]);
    }
}
