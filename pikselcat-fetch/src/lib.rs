// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `PikselCat` Fetch
//!
//! HTTP access to the Pixelcut API.
//!
//! - [`http::HttpClient`] - reqwest wrapper with tracing and a domain allowlist
//! - [`retry::RetryStrategy`] - Backoff for idempotent downloads
//! - [`transport::PixelcutTransport`] - The network seam used by the API client
//! - [`pixelcut::PixelcutApi`] - The production transport

pub mod error;
pub mod http;
pub mod pixelcut;
pub mod retry;
pub mod transport;

pub use error::{FetchError, HttpError};
pub use http::{HttpClient, ResponseExt};
pub use pixelcut::{credential_header, PixelcutApi, API_KEY_HEADER};
pub use retry::RetryStrategy;
pub use transport::{PixelcutTransport, SubmitRequest};
