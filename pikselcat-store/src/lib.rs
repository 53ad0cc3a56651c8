// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `PikselCat` Store
//!
//! Persisted state shared by the API client.
//!
//! - **ConfigStore**: the configuration document behind an async lock, with
//!   explicit `load`/`save` and a watch channel for changes
//! - **CredentialCache**: TTL cache of credential verdicts
//! - **QuotaGovernor**: daily ceiling, minimum interval, and in-flight guard
//! - **Persistence**: atomic JSON file helpers
//!
//! ## Usage
//!
//! ```ignore
//! use pikselcat_store::{ConfigStore, CredentialCache, QuotaGovernor};
//!
//! let store = ConfigStore::load_default().await?;
//! let cache = CredentialCache::new(store.clone());
//! let governor = QuotaGovernor::new(store.clone());
//!
//! if governor.record_call().await.is_allowed() {
//!     // ... call the API ...
//!     governor.record_success();
//! }
//! store.save().await?;
//! ```

pub mod config_store;
pub mod credential_cache;
pub mod document;
pub mod error;
pub mod persistence;
pub mod quota;

pub use config_store::ConfigStore;
pub use credential_cache::CredentialCache;
pub use document::{CacheEntry, ConfigDocument, QuotaState, ValidationCache, MAX_CACHE_ENTRIES};
pub use error::StoreError;
pub use persistence::{
    default_config_dir, default_config_path, ensure_dir, load_json, load_json_or_default,
    save_json,
};
pub use quota::{BlockReason, CallGuard, Permit, QuotaGovernor, QuotaStatus};

#[cfg(test)]
mod persistence_tests;
