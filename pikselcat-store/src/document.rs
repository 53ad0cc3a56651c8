//! The persisted configuration document.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use pikselcat_core::{ApiEndpoints, ClientSettings, CreditSnapshot, Verdict};
use serde::{Deserialize, Serialize};

/// Maximum number of cached credential verdicts.
pub const MAX_CACHE_ENTRIES: usize = 50;

// ============================================================================
// Document
// ============================================================================

/// Everything persisted between runs. Absent fields mean "no data".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigDocument {
    /// The active API key, stored once it validated with a positive balance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Provider endpoints.
    pub api_endpoints: ApiEndpoints,
    /// Budget and timeout settings.
    pub client: ClientSettings,
    /// Cached credential verdicts.
    pub api_validation_cache: ValidationCache,
    /// Daily call accounting.
    pub api_quota: QuotaState,
    /// Last credit report for the active key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pixelcut_credits: Option<CreditSnapshot>,
}

impl ConfigDocument {
    /// The active API key, ignoring blanks.
    pub fn active_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

// ============================================================================
// Credential Cache Entries
// ============================================================================

/// One cached verdict, keyed by the full credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// True only for a valid credential with a positive balance.
    pub valid: bool,
    /// Message shown with the verdict.
    pub message: String,
    /// Balance at the time of the check, never negative.
    pub credits: i64,
    /// When the verdict was obtained.
    pub timestamp: DateTime<Utc>,
    /// Full verdict; older documents only carry `valid`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
}

impl CacheEntry {
    /// Creates an entry for a definitive verdict.
    pub fn new(
        verdict: Verdict,
        message: impl Into<String>,
        credits: i64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            valid: verdict == Verdict::Valid,
            message: message.into(),
            credits: credits.max(0),
            timestamp,
            verdict: Some(verdict),
        }
    }

    /// The stored verdict, inferred from `valid` for older entries.
    pub fn verdict(&self) -> Verdict {
        self.verdict.unwrap_or(if self.valid {
            Verdict::Valid
        } else {
            Verdict::Invalid
        })
    }

    /// Age of the entry at `now`; a future timestamp counts as zero.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        (now - self.timestamp).max(chrono::Duration::zero())
    }
}

/// The credential cache section of the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationCache {
    /// Entries keyed by the full credential string.
    pub validation_cache: HashMap<String, CacheEntry>,
}

impl ValidationCache {
    /// Number of entries.
    pub fn len(&self) -> usize {
        self.validation_cache.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.validation_cache.is_empty()
    }

    /// Removes entries older than `2 × ttl`. Returns how many were removed.
    pub fn purge(&mut self, now: DateTime<Utc>, ttl: chrono::Duration) -> usize {
        let before = self.validation_cache.len();
        let limit = ttl * 2;
        self.validation_cache.retain(|_, e| e.age(now) <= limit);
        before - self.validation_cache.len()
    }

    /// Evicts the oldest entries beyond `max`. Returns how many were removed.
    pub fn cap(&mut self, max: usize) -> usize {
        let excess = self.validation_cache.len().saturating_sub(max);
        if excess == 0 {
            return 0;
        }

        let mut by_age: Vec<(DateTime<Utc>, String)> = self
            .validation_cache
            .iter()
            .map(|(k, e)| (e.timestamp, k.clone()))
            .collect();
        by_age.sort();

        for (_, key) in by_age.into_iter().take(excess) {
            self.validation_cache.remove(&key);
        }
        excess
    }

    /// Purges expired entries, then enforces the size cap.
    pub fn normalize(&mut self, now: DateTime<Utc>, ttl: chrono::Duration) -> usize {
        self.purge(now, ttl) + self.cap(MAX_CACHE_ENTRIES)
    }
}

// ============================================================================
// Quota State
// ============================================================================

/// Daily call accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuotaState {
    /// Calendar day `calls_today` belongs to.
    pub date: Option<NaiveDate>,
    /// Calls made on `date`.
    pub calls_today: u32,
    /// When the last call was dispatched.
    pub last_call_at: Option<DateTime<Utc>>,
}

impl QuotaState {
    /// Resets the counter if `today` differs from the stored day.
    ///
    /// Returns true when a reset happened.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.date == Some(today) {
            return false;
        }
        self.date = Some(today);
        self.calls_today = 0;
        true
    }
}
