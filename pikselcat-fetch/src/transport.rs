//! The seam between the API client and the network.

use async_trait::async_trait;
use pikselcat_core::{CreditsResponse, ProcessAction};

use crate::error::FetchError;
use crate::pixelcut::credential_header;

/// One image submitted for processing.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// Requested operation.
    pub action: ProcessAction,
    /// File name sent with the upload.
    pub file_name: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Network operations against the provider.
///
/// Every call to `fetch_credits` or `submit_image` is metered; callers gate
/// them through the quota governor. `download` fetches a result URL and is
/// not metered.
#[async_trait]
pub trait PixelcutTransport: Send + Sync {
    /// Checks that `api_key` can be sent at all, without any network call.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::MalformedKey` for keys that cannot be encoded.
    fn check_credential(&self, api_key: &str) -> Result<(), FetchError> {
        credential_header(api_key).map(|_| ())
    }

    /// Reads the credit balance for `api_key`.
    async fn fetch_credits(&self, api_key: &str) -> Result<CreditsResponse, FetchError>;

    /// Uploads an image and returns the result URL.
    async fn submit_image(&self, api_key: &str, request: SubmitRequest)
        -> Result<String, FetchError>;

    /// Downloads a processed result.
    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}
