// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `PikselCat` Core
//!
//! Shared types for the `PikselCat` crates.
//!
//! ## Key Types
//!
//! ### Staging
//! - [`ImageFormat`] - The accepted image formats
//! - [`ValidationResult`] - Ordered outcome of a validation run
//! - [`StagedItem`] - A presentable entry for an accepted file
//! - [`Progress`] - Progress notification for a cancellable run
//!
//! ### Credits
//! - [`CreditSnapshot`] - Persisted copy of the provider's credit report
//! - [`CreditStatistics`] - Derived usage and expiry view
//! - [`ValidationReport`] / [`CreditsReport`] - API client answers
//!
//! ### Errors and Time
//! - [`PikselError`] - The failure taxonomy shared across crates
//! - [`Clock`] - Injectable wall clock

pub mod clock;
pub mod error;
pub mod models;

pub use clock::{system_clock, Clock, ManualClock, SystemClock};
pub use error::{CoreError, PikselError};
pub use models::{
    // Staging
    format_size,
    icon_for_path,
    truncate_path,
    CheckedCandidate,
    ImageFormat,
    Progress,
    StagedItem,
    ValidationResult,
    DISPLAY_DIR_MAX_LEN,
    // Credits
    parse_period_instant,
    CreditBalance,
    CreditPeriod,
    CreditSnapshot,
    CreditStatistics,
    CreditsResponse,
    Provenance,
    // Settings
    ApiEndpoints,
    ClientSettings,
    ProcessAction,
    // Reports
    CreditsReport,
    Freshness,
    ValidationReport,
    Verdict,
};
