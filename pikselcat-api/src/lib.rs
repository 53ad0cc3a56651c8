// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `PikselCat` API
//!
//! The rate-limited, caching client for the Pixelcut API and the batch
//! processor built on it.
//!
//! ## Usage
//!
//! ```ignore
//! use pikselcat_api::PixelcutClient;
//! use pikselcat_store::ConfigStore;
//!
//! let store = ConfigStore::load_default().await?;
//! let client = PixelcutClient::connect(store).await?;
//!
//! let report = client.validate(&api_key).await;
//! if report.valid() {
//!     println!("{} credits", report.credits);
//! }
//! ```

pub mod client;
pub mod processor;
pub mod single_flight;

pub use client::{PixelcutClient, MSG_INSUFFICIENT, MSG_INVALID, MSG_VALID};
pub use processor::{BatchProcessor, FileOutcome, ProcessEvent, ProcessSummary};
pub use single_flight::SingleFlight;
