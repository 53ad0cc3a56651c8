//! Domain models for PikselCat.
//!
//! ## Submodules
//!
//! - [`format`] - The image format allow-list
//! - [`staging`] - Validation results, staged items, and progress
//! - [`credits`] - Credit balance, snapshot, and statistics
//! - [`verdict`] - Reports returned by the API client
//! - [`settings`] - Endpoints and client settings
//! - [`action`] - Processing actions

pub mod action;
pub mod credits;
pub mod format;
pub mod settings;
pub mod staging;
pub mod verdict;

pub use credits::{
    parse_period_instant, CreditBalance, CreditPeriod, CreditSnapshot, CreditStatistics,
    CreditsResponse, Provenance,
};
pub use action::ProcessAction;
pub use format::ImageFormat;
pub use settings::{ApiEndpoints, ClientSettings};
pub use staging::{
    format_size, icon_for_path, truncate_path, CheckedCandidate, Progress, StagedItem,
    ValidationResult, DISPLAY_DIR_MAX_LEN,
};
pub use verdict::{CreditsReport, Freshness, ValidationReport, Verdict};

#[cfg(test)]
mod serde_tests;
