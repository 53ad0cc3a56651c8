//! Reports returned by the API client.

use serde::{Deserialize, Serialize};

use super::credits::CreditBalance;
use crate::error::PikselError;

/// Outcome of checking a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The credential works and the balance is positive.
    Valid,
    /// The credential works but the balance is zero or negative.
    Insufficient,
    /// The provider rejected the credential.
    Invalid,
    /// No definitive answer could be obtained.
    Unknown,
}

impl Verdict {
    /// Returns true for verdicts that may be cached.
    pub fn is_definitive(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// How current the data in a report is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    /// Obtained from the network during this call.
    Live,
    /// Served from a cache entry still inside its TTL.
    Cached,
    /// Served from older local data because the network was not used or failed.
    Stale,
}

/// The answer to `validate(credential)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Verdict for the credential.
    pub verdict: Verdict,
    /// Message suitable for showing to the user.
    pub message: String,
    /// Known balance, never negative.
    pub credits: i64,
    /// How current the verdict is.
    pub freshness: Freshness,
    /// The failure that prevented a live answer, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<PikselError>,
}

impl ValidationReport {
    /// Builds a report without a failure.
    pub fn new(verdict: Verdict, message: impl Into<String>, credits: i64, freshness: Freshness) -> Self {
        Self {
            verdict,
            message: message.into(),
            credits: credits.max(0),
            freshness,
            failure: None,
        }
    }

    /// Attaches the failure that degraded this report.
    #[must_use]
    pub fn with_failure(mut self, failure: PikselError) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Returns true only for a valid credential.
    pub fn valid(&self) -> bool {
        self.verdict == Verdict::Valid
    }
}

/// The answer to `fetch_credits()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditsReport {
    /// The balance, live or from local state.
    pub balance: CreditBalance,
    /// How current the balance is.
    pub freshness: Freshness,
    /// The failure that prevented a live balance, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<PikselError>,
}

impl CreditsReport {
    /// Remaining credits.
    pub fn credits(&self) -> i64 {
        self.balance.credits
    }
}
