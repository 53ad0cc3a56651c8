//! Pixelcut API client.

use async_trait::async_trait;
use pikselcat_core::{ApiEndpoints, ClientSettings, CreditsResponse, ProcessAction};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT},
    multipart::{Form, Part},
    Response, StatusCode,
};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::{
    error::FetchError,
    http::{HttpClient, ResponseExt},
    retry::RetryStrategy,
    transport::{PixelcutTransport, SubmitRequest},
};

// ============================================================================
// Constants
// ============================================================================

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Timeout for result downloads.
const DOWNLOAD_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// API Response Types
// ============================================================================

/// Response from the processing endpoints.
#[derive(Debug, Deserialize)]
struct ProcessResponse {
    #[serde(default, alias = "resultUrl")]
    result_url: Option<String>,
}

/// Error body the provider sends with non-2xx answers.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

// ============================================================================
// API Client
// ============================================================================

/// Talks to the Pixelcut HTTP API.
#[derive(Debug, Clone)]
pub struct PixelcutApi {
    endpoints: ApiEndpoints,
    api: HttpClient,
    processing: HttpClient,
    downloads: HttpClient,
    retry: RetryStrategy,
}

impl PixelcutApi {
    /// Creates a client for the given endpoints and timeouts.
    ///
    /// Metered calls are restricted to the hosts of the configured endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(endpoints: ApiEndpoints, settings: &ClientSettings) -> Result<Self, FetchError> {
        let hosts = HttpClient::hosts_of(endpoints.urls());
        debug!(?hosts, "Creating Pixelcut client");

        Ok(Self {
            api: HttpClient::with_timeout(settings.request_timeout())?.allow_domains(hosts.clone()),
            processing: HttpClient::with_timeout(settings.processing_timeout())?
                .allow_domains(hosts),
            downloads: HttpClient::with_timeout(std::time::Duration::from_secs(
                DOWNLOAD_TIMEOUT_SECS,
            ))?,
            endpoints,
            retry: RetryStrategy::default(),
        })
    }

    /// Replaces the download retry strategy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryStrategy) -> Self {
        self.retry = retry;
        self
    }

    /// Endpoint for an action.
    pub fn endpoint_for(&self, action: ProcessAction) -> &str {
        match action {
            ProcessAction::RemoveBg => &self.endpoints.remove_background,
            ProcessAction::Upscale2x | ProcessAction::Upscale4x => &self.endpoints.upscale,
        }
    }

    /// Build request headers.
    fn build_headers(api_key: &str) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        headers.insert(API_KEY_HEADER, credential_header(api_key)?);

        Ok(headers)
    }

    /// Builds the multipart body for a submission.
    fn build_form(request: SubmitRequest) -> Result<Form, FetchError> {
        let part = Part::bytes(request.bytes)
            .file_name(request.file_name)
            .mime_str("application/octet-stream")?;
        let form = Form::new().part("image", part);

        Ok(match request.action.scale() {
            None => form.text("format", "png"),
            Some(scale) => form.text("scale", scale.to_string()),
        })
    }
}

/// Encodes an API key as a sensitive header value.
///
/// # Errors
///
/// Returns `FetchError::MalformedKey` if the key contains bytes that are not
/// allowed in a header.
pub fn credential_header(api_key: &str) -> Result<HeaderValue, FetchError> {
    let mut value =
        HeaderValue::from_str(api_key.trim()).map_err(|e| FetchError::MalformedKey(e.to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Maps a send failure, turning reqwest timeouts into `Timeout`.
fn map_send_error(err: FetchError, timeout_secs: u64) -> FetchError {
    match err {
        FetchError::Http(e) if e.is_timeout() => FetchError::Timeout(timeout_secs),
        other => other,
    }
}

/// Maps a non-2xx answer onto an error.
async fn check_status(response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if response.is_rate_limited() {
        return Err(FetchError::RateLimited {
            retry_after: response.retry_after_secs(),
        });
    }

    match status {
        StatusCode::UNAUTHORIZED => Err(FetchError::Unauthorized),
        StatusCode::FORBIDDEN => Err(FetchError::Forbidden),
        _ => {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| format!("API error: {}", status.as_u16()));
            Err(FetchError::Status {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl PixelcutTransport for PixelcutApi {
    #[instrument(skip(self, api_key))]
    async fn fetch_credits(&self, api_key: &str) -> Result<CreditsResponse, FetchError> {
        debug!("Fetching Pixelcut credits");

        let headers = Self::build_headers(api_key)?;
        let timeout = self.api.timeout().as_secs();
        let response = self
            .api
            .get_with_headers(&self.endpoints.credits, headers)
            .await
            .map_err(|e| map_send_error(e, timeout))?;
        let response = check_status(response).await?;

        let body = response.text().await?;
        let credits: CreditsResponse = serde_json::from_str(&body).map_err(|e| {
            warn!(error = %e, "Failed to parse credits response");
            FetchError::InvalidResponse(format!("JSON error: {e}"))
        })?;

        Ok(credits)
    }

    #[instrument(skip(self, api_key, request), fields(action = %request.action, file = %request.file_name))]
    async fn submit_image(
        &self,
        api_key: &str,
        request: SubmitRequest,
    ) -> Result<String, FetchError> {
        let url = self.endpoint_for(request.action).to_string();
        debug!(size = request.bytes.len(), "Submitting image");

        let headers = Self::build_headers(api_key)?;
        let timeout = self.processing.timeout().as_secs();
        let response = self
            .processing
            .post_multipart(&url, headers, Self::build_form(request)?)
            .await
            .map_err(|e| map_send_error(e, timeout))?;
        let response = check_status(response).await?;

        let body = response.text().await?;
        let parsed: ProcessResponse = serde_json::from_str(&body)
            .map_err(|e| FetchError::InvalidResponse(format!("JSON error: {e}")))?;

        parsed
            .result_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| FetchError::InvalidResponse("No result URL in response".to_string()))
    }

    #[instrument(skip(self), fields(url = %url))]
    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.downloads.check_url(url)?;

        self.retry
            .run(move || async move {
                let response = self
                    .downloads
                    .get(url)
                    .await
                    .map_err(|e| map_send_error(FetchError::Http(e), DOWNLOAD_TIMEOUT_SECS))?;
                let response = check_status(response).await?;
                Ok(response.bytes().await?.to_vec())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api() -> PixelcutApi {
        PixelcutApi::new(ApiEndpoints::default(), &ClientSettings::default()).unwrap()
    }

    #[test]
    fn test_endpoint_routing() {
        let api = api();
        assert!(api.endpoint_for(ProcessAction::RemoveBg).ends_with("/remove-background"));
        assert!(api.endpoint_for(ProcessAction::Upscale2x).ends_with("/upscale"));
        assert!(api.endpoint_for(ProcessAction::Upscale4x).ends_with("/upscale"));
    }

    #[test]
    fn test_headers_mark_key_sensitive() {
        let headers = PixelcutApi::build_headers("  sk_live_123 ").unwrap();
        let key = headers.get(API_KEY_HEADER).unwrap();
        assert_eq!(key.to_str().unwrap(), "sk_live_123");
        assert!(key.is_sensitive());
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
    }

    #[test]
    fn test_control_characters_in_key_rejected() {
        assert!(matches!(
            PixelcutApi::build_headers("bad\nkey"),
            Err(FetchError::MalformedKey(_))
        ));
        assert!(api().check_credential("bad\nkey").is_err());
        assert!(api().check_credential("sk_live_123").is_ok());
    }

    /// Serves one canned HTTP response on a local port.
    async fn serve_once(raw: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket.write_all(raw.as_bytes()).await.unwrap();
        });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn test_check_status_reads_retry_after() {
        let url = serve_once(
            "HTTP/1.1 429 Too Many Requests\r\nRetry-After: 7\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let response = reqwest::get(url).await.unwrap();

        let err = check_status(response).await.unwrap_err();
        assert!(matches!(err, FetchError::RateLimited { retry_after: Some(7) }));
    }

    #[test]
    fn test_process_response_aliases() {
        let a: ProcessResponse = serde_json::from_str(r#"{"result_url":"https://x/y.png"}"#).unwrap();
        let b: ProcessResponse = serde_json::from_str(r#"{"resultUrl":"https://x/y.png"}"#).unwrap();
        assert_eq!(a.result_url, b.result_url);
    }

    #[tokio::test]
    async fn test_metered_calls_refuse_foreign_hosts() {
        let endpoints = ApiEndpoints::default();
        let api = PixelcutApi::new(endpoints, &ClientSettings::default()).unwrap();
        let err = api
            .processing
            .post_multipart("https://evil.com/upload", HeaderMap::new(), Form::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Client(crate::HttpError::DomainNotAllowed(_))));
    }
}
