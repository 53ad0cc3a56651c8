//! Daily call budget and pacing.
//!
//! The governor enforces three limits before any metered call: a hard daily
//! ceiling, a minimum wall-clock gap between calls, and at most one call in
//! flight. State lives in the [`ConfigStore`] so it survives restarts; the
//! in-flight flag is process-local.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use pikselcat_core::PikselError;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config_store::ConfigStore;
use crate::document::ConfigDocument;

// ============================================================================
// Permit
// ============================================================================

/// Why a call is not permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum BlockReason {
    /// The daily ceiling has been reached.
    DailyLimit {
        /// The ceiling.
        limit: u32,
    },
    /// The minimum interval has not elapsed.
    RateLimited {
        /// Time left until the next call is allowed.
        retry_in: Duration,
    },
    /// Another call has not finished.
    InFlight,
}

impl BlockReason {
    /// Maps the reason onto the shared failure taxonomy.
    pub fn to_failure(&self) -> PikselError {
        match *self {
            Self::DailyLimit { limit } => PikselError::DailyQuotaExceeded { limit },
            Self::RateLimited { retry_in } => PikselError::LocalRateLimited { retry_in },
            Self::InFlight => PikselError::LocalRateLimited {
                retry_in: Duration::ZERO,
            },
        }
    }
}

/// Answer to "may I call the API now?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permit {
    /// A call may be made.
    Allowed,
    /// A call may not be made.
    Blocked(BlockReason),
}

impl Permit {
    /// Returns true if allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Read-only view of the quota for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaStatus {
    /// Day the counter belongs to.
    pub date: Option<NaiveDate>,
    /// Calls made today.
    pub calls_today: u32,
    /// Daily ceiling.
    pub daily_limit: u32,
    /// Calls left today.
    pub remaining: u32,
    /// When the last call was dispatched.
    pub last_call_at: Option<DateTime<Utc>>,
    /// Whether a call is currently running.
    pub in_flight: bool,
}

// ============================================================================
// Governor
// ============================================================================

/// Gatekeeper for metered API calls.
#[derive(Debug, Clone)]
pub struct QuotaGovernor {
    store: ConfigStore,
    in_flight: Arc<AtomicBool>,
}

impl QuotaGovernor {
    /// Creates a governor over the shared store.
    pub fn new(store: ConfigStore) -> Self {
        Self {
            store,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Decides whether a call is permitted right now, without reserving it.
    pub async fn can_call(&self) -> Permit {
        let now = self.store.now();
        let today = self.store.clock().today();
        self.store
            .update(|doc| {
                roll_over(doc, today);
                self.evaluate(doc, now)
            })
            .await
    }

    /// Atomically checks the limits and, if allowed, counts the call and
    /// marks it in flight.
    ///
    /// Every `Allowed` answer must be followed by exactly one of
    /// [`record_success`](Self::record_success),
    /// [`record_failure`](Self::record_failure), or
    /// [`record_failure_refund`](Self::record_failure_refund).
    pub async fn record_call(&self) -> Permit {
        let now = self.store.now();
        let today = self.store.clock().today();
        let permit = self
            .store
            .update(|doc| {
                roll_over(doc, today);
                let permit = self.evaluate(doc, now);
                if permit.is_allowed() {
                    doc.api_quota.calls_today += 1;
                    doc.api_quota.last_call_at = Some(now);
                    self.in_flight.store(true, Ordering::SeqCst);
                }
                permit
            })
            .await;

        match permit {
            Permit::Allowed => debug!("API call reserved"),
            Permit::Blocked(reason) => debug!(?reason, "API call blocked"),
        }
        permit
    }

    /// Like [`record_call`](Self::record_call), but hands back a guard that
    /// settles the call.
    ///
    /// If the guard is dropped without an outcome, for example because the
    /// task panicked or was cancelled, the call counts as a failure and the
    /// in-flight flag is cleared.
    ///
    /// # Errors
    ///
    /// Returns the block reason when the call is not permitted.
    pub async fn reserve(&self) -> Result<CallGuard, BlockReason> {
        match self.record_call().await {
            Permit::Allowed => Ok(CallGuard {
                governor: self.clone(),
                armed: true,
            }),
            Permit::Blocked(reason) => Err(reason),
        }
    }

    /// Backs a call answered with HTTP 429 out of today's count.
    pub async fn record_failure_refund(&self) {
        let today = self.store.clock().today();
        self.store
            .update(|doc| {
                if doc.api_quota.date == Some(today) {
                    doc.api_quota.calls_today = doc.api_quota.calls_today.saturating_sub(1);
                }
            })
            .await;
        self.in_flight.store(false, Ordering::SeqCst);
        info!("Refunded rate-limited API call");
    }

    /// Marks the in-flight call as finished successfully.
    pub fn record_success(&self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }

    /// Marks the in-flight call as finished with a counted failure.
    pub fn record_failure(&self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }

    /// Applies a pending day rollover. Returns true if the counter reset.
    pub async fn tick(&self) -> bool {
        let today = self.store.clock().today();
        self.store.update(|doc| roll_over(doc, today)).await
    }

    /// Current quota view.
    pub async fn status(&self) -> QuotaStatus {
        let today = self.store.clock().today();
        let in_flight = self.in_flight.load(Ordering::SeqCst);
        self.store
            .read(|doc| {
                let calls_today = if doc.api_quota.date == Some(today) {
                    doc.api_quota.calls_today
                } else {
                    0
                };
                let daily_limit = doc.client.daily_call_limit;
                QuotaStatus {
                    date: Some(today),
                    calls_today,
                    daily_limit,
                    remaining: daily_limit.saturating_sub(calls_today),
                    last_call_at: doc.api_quota.last_call_at,
                    in_flight,
                }
            })
            .await
    }

    fn evaluate(&self, doc: &ConfigDocument, now: DateTime<Utc>) -> Permit {
        let limit = doc.client.daily_call_limit;
        if doc.api_quota.calls_today >= limit {
            return Permit::Blocked(BlockReason::DailyLimit { limit });
        }

        if self.in_flight.load(Ordering::SeqCst) {
            return Permit::Blocked(BlockReason::InFlight);
        }

        if let Some(last) = doc.api_quota.last_call_at {
            // Negative elapsed time means the clock moved backwards; allow.
            let elapsed = now - last;
            let interval = doc.client.min_interval();
            if elapsed >= chrono::Duration::zero() && elapsed < interval {
                let retry_in = (interval - elapsed).to_std().unwrap_or_default();
                return Permit::Blocked(BlockReason::RateLimited { retry_in });
            }
        }

        Permit::Allowed
    }
}

// ============================================================================
// Call Guard
// ============================================================================

/// A reserved call. Settle it with exactly one of its methods.
#[derive(Debug)]
#[must_use = "dropping the guard settles the call as a failure"]
pub struct CallGuard {
    governor: QuotaGovernor,
    armed: bool,
}

impl CallGuard {
    /// The call succeeded.
    pub fn success(mut self) {
        self.armed = false;
        self.governor.record_success();
    }

    /// The call failed and stays counted.
    pub fn failure(mut self) {
        self.armed = false;
        self.governor.record_failure();
    }

    /// The provider answered 429; the call is refunded.
    pub async fn refund(mut self) {
        self.governor.record_failure_refund().await;
        self.armed = false;
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        if self.armed {
            warn!("API call ended without an outcome");
            self.governor.record_failure();
        }
    }
}

fn roll_over(doc: &mut ConfigDocument, today: NaiveDate) -> bool {
    let reset = doc.api_quota.roll_over(today);
    if reset {
        debug!(%today, "Quota day rolled over");
    }
    reset
}
