//! The rate-limited, caching API client.
//!
//! Every public operation consults local state first (the credential cache
//! or the persisted credit snapshot), then the quota governor, and only then
//! the network. Network work is dispatched through a [`SingleFlight`] so
//! concurrent callers share one request. Failures never surface as errors:
//! they degrade the report to the best local data, tagged with the failure.

use std::fmt;
use std::sync::Arc;

use pikselcat_core::{
    CreditBalance, CreditsReport, Freshness, PikselError, ValidationReport, Verdict,
};
use pikselcat_fetch::{FetchError, PixelcutApi, PixelcutTransport};
use pikselcat_store::{CacheEntry, ConfigStore, CredentialCache, QuotaGovernor};
use tracing::{debug, info, instrument, warn};

use crate::single_flight::SingleFlight;

/// Message for a credential with a positive balance.
pub const MSG_VALID: &str = "API key is valid";
/// Message for a credential with no credits left.
pub const MSG_INSUFFICIENT: &str = "Insufficient credits";
/// Message for a credential the provider rejected.
pub const MSG_INVALID: &str = "Invalid API key";

/// Client for credential validation and credit balance.
#[derive(Clone)]
pub struct PixelcutClient {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn PixelcutTransport>,
    store: ConfigStore,
    cache: CredentialCache,
    governor: QuotaGovernor,
    validations: SingleFlight<String, ValidationReport>,
    credits: SingleFlight<String, CreditsReport>,
}

impl fmt::Debug for PixelcutClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelcutClient")
            .field("store", &self.inner.store.path())
            .finish_non_exhaustive()
    }
}

impl PixelcutClient {
    /// Creates a client over `transport`, sharing `store` with the cache and
    /// the governor.
    pub fn new(transport: Arc<dyn PixelcutTransport>, store: ConfigStore) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                cache: CredentialCache::new(store.clone()),
                governor: QuotaGovernor::new(store.clone()),
                store,
                validations: SingleFlight::new(),
                credits: SingleFlight::new(),
            }),
        }
    }

    /// Creates a client talking to the endpoints configured in `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP clients cannot be built.
    pub async fn connect(store: ConfigStore) -> Result<Self, FetchError> {
        let (endpoints, settings) = store
            .read(|d| (d.api_endpoints.clone(), d.client.clone()))
            .await;
        let api = PixelcutApi::new(endpoints, &settings)?;
        Ok(Self::new(Arc::new(api), store))
    }

    /// The shared configuration store.
    pub fn store(&self) -> &ConfigStore {
        &self.inner.store
    }

    /// The quota governor.
    pub fn governor(&self) -> &QuotaGovernor {
        &self.inner.governor
    }

    /// The credential cache.
    pub fn cache(&self) -> &CredentialCache {
        &self.inner.cache
    }

    /// The network transport.
    pub fn transport(&self) -> &Arc<dyn PixelcutTransport> {
        &self.inner.transport
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Checks a credential.
    ///
    /// A verdict cached within the cache duration is returned without any
    /// network call. Otherwise one live check per credential is shared by
    /// all concurrent callers.
    #[instrument(skip_all)]
    pub async fn validate(&self, credential: &str) -> ValidationReport {
        let credential = credential.trim().to_string();
        if credential.is_empty() {
            return ValidationReport::new(Verdict::Invalid, "API key is empty", 0, Freshness::Live);
        }

        // A key that cannot be sent must not cost a quota slot.
        if let Err(e) = self.inner.transport.check_credential(&credential) {
            debug!(error = %e, "Credential rejected before dispatch");
            return ValidationReport::new(Verdict::Invalid, MSG_INVALID, 0, Freshness::Live)
                .with_failure(e.to_failure());
        }

        if let Some(entry) = self.inner.cache.lookup(&credential).await {
            debug!("Verdict served from cache");
            return report_from_entry(&entry, Freshness::Cached);
        }

        let inner = Arc::clone(&self.inner);
        let key = credential.clone();
        self.inner
            .validations
            .run(credential, move || async move { inner.validate_live(&key).await })
            .await
            .unwrap_or_else(|| {
                let failure = PikselError::NetworkFailure("validation task failed".to_string());
                ValidationReport::new(Verdict::Unknown, failure.to_string(), 0, Freshness::Stale)
                    .with_failure(failure)
            })
    }

    // ========================================================================
    // Credits
    // ========================================================================

    /// Returns the balance of the active key.
    ///
    /// A snapshot fetched within the cache duration is returned without any
    /// network call.
    #[instrument(skip_all)]
    pub async fn fetch_credits(&self) -> CreditsReport {
        self.credits(false).await
    }

    /// Returns the balance of the active key, ignoring the snapshot's age.
    ///
    /// The governor still applies.
    #[instrument(skip_all)]
    pub async fn refresh_credits(&self) -> CreditsReport {
        self.credits(true).await
    }

    async fn credits(&self, force: bool) -> CreditsReport {
        let Some(key) = self.inner.store.api_key().await else {
            debug!("No active API key");
            return CreditsReport {
                balance: CreditBalance::cached(0),
                freshness: Freshness::Stale,
                failure: Some(PikselError::UpstreamUnauthorized),
            };
        };

        if !force {
            let now = self.inner.store.now();
            let ttl = self.inner.store.settings().await.cache_ttl();
            if let Some(snapshot) = self.inner.store.credit_snapshot().await {
                if snapshot.is_fresh(now, ttl) {
                    debug!("Credits served from snapshot");
                    return CreditsReport {
                        balance: CreditBalance::cached(snapshot.credits_remaining),
                        freshness: Freshness::Cached,
                        failure: None,
                    };
                }
            }
        }

        let inner = Arc::clone(&self.inner);
        let flight_key = key.clone();
        self.inner
            .credits
            .run(flight_key, move || async move { inner.fetch_credits_live(&key).await })
            .await
            .unwrap_or_else(|| {
                CreditsReport {
                    balance: CreditBalance::cached(0),
                    freshness: Freshness::Stale,
                    failure: Some(PikselError::NetworkFailure(
                        "credits task failed".to_string(),
                    )),
                }
            })
    }

    /// Last known balance of the active key, without any network call.
    pub async fn last_known_credits(&self) -> i64 {
        self.inner
            .store
            .read(|d| d.pixelcut_credits.as_ref().map_or(0, |s| s.credits_remaining))
            .await
    }

    /// Returns true if the last known balance covers `amount`.
    pub async fn has_sufficient_credits(&self, amount: i64) -> bool {
        self.last_known_credits().await >= amount
    }
}

// ============================================================================
// Live Calls
// ============================================================================

impl Inner {
    async fn validate_live(&self, credential: &str) -> ValidationReport {
        // A flight that finished just before this one may have filled the cache.
        if let Some(entry) = self.cache.lookup(credential).await {
            return report_from_entry(&entry, Freshness::Cached);
        }

        let call = match self.governor.reserve().await {
            Ok(call) => call,
            Err(reason) => {
                debug!(?reason, "Validation blocked by governor");
                return self.validation_fallback(credential, reason.to_failure()).await;
            }
        };

        let result = self.transport.fetch_credits(credential).await;
        let now = self.store.now();

        let report = match result {
            Ok(response) => {
                call.success();
                let credits = response.remaining();
                let report = if credits > 0 {
                    self.store.activate_key(credential, response.into_snapshot(now)).await;
                    info!(credits, "API key validated");
                    ValidationReport::new(Verdict::Valid, MSG_VALID, credits, Freshness::Live)
                } else {
                    self.store.deactivate_key(credential).await;
                    info!("API key has no credits");
                    ValidationReport::new(Verdict::Insufficient, MSG_INSUFFICIENT, 0, Freshness::Live)
                };
                self.remember(credential, &report, now).await;
                report
            }
            Err(e) if e.is_rate_limited() => {
                call.refund().await;
                warn!("Validation rate limited by the API");
                self.validation_fallback(credential, e.to_failure()).await
            }
            Err(e @ (FetchError::Unauthorized | FetchError::Forbidden)) => {
                call.failure();
                self.store.deactivate_key(credential).await;
                let failure = e.to_failure();
                info!(%failure, "API key rejected");
                let report = if matches!(failure, PikselError::UpstreamForbidden) {
                    ValidationReport::new(Verdict::Invalid, failure.to_string(), 0, Freshness::Live)
                        .with_failure(failure)
                } else {
                    ValidationReport::new(Verdict::Invalid, MSG_INVALID, 0, Freshness::Live)
                };
                self.remember(credential, &report, now).await;
                report
            }
            Err(e) => {
                call.failure();
                warn!(error = %e, "Validation request failed");
                self.validation_fallback(credential, e.to_failure()).await
            }
        };

        self.persist().await;
        report
    }

    async fn validation_fallback(&self, credential: &str, failure: PikselError) -> ValidationReport {
        match self.cache.quick_lookup(credential).await {
            Some(entry) => report_from_entry(&entry, Freshness::Stale).with_failure(failure),
            None => ValidationReport::new(Verdict::Unknown, failure.to_string(), 0, Freshness::Stale)
                .with_failure(failure),
        }
    }

    async fn remember(
        &self,
        credential: &str,
        report: &ValidationReport,
        now: chrono::DateTime<chrono::Utc>,
    ) {
        if report.verdict.is_definitive() {
            let entry = CacheEntry::new(report.verdict, report.message.clone(), report.credits, now);
            self.cache.put(credential, entry).await;
        }
    }

    async fn fetch_credits_live(&self, key: &str) -> CreditsReport {
        let call = match self.governor.reserve().await {
            Ok(call) => call,
            Err(reason) => {
                debug!(?reason, "Credit fetch blocked by governor");
                return self.credits_fallback(reason.to_failure()).await;
            }
        };

        let result = self.transport.fetch_credits(key).await;
        let now = self.store.now();

        let report = match result {
            Ok(response) => {
                call.success();
                let snapshot = response.into_snapshot(now);
                let credits = snapshot.credits_remaining;
                self.store
                    .update(|d| {
                        if d.active_key() == Some(key) {
                            d.pixelcut_credits = Some(snapshot);
                        }
                    })
                    .await;
                debug!(credits, "Credits refreshed");
                CreditsReport {
                    balance: CreditBalance::live(credits),
                    freshness: Freshness::Live,
                    failure: None,
                }
            }
            Err(e) if e.is_rate_limited() => {
                call.refund().await;
                self.credits_fallback(e.to_failure()).await
            }
            Err(e @ (FetchError::Unauthorized | FetchError::Forbidden)) => {
                call.failure();
                self.store.deactivate_key(key).await;
                warn!("Active API key was rejected, cleared it");
                self.credits_fallback(e.to_failure()).await
            }
            Err(e) => {
                call.failure();
                warn!(error = %e, "Credit fetch failed");
                self.credits_fallback(e.to_failure()).await
            }
        };

        self.persist().await;
        report
    }

    async fn credits_fallback(&self, failure: PikselError) -> CreditsReport {
        let credits = self
            .store
            .read(|d| d.pixelcut_credits.as_ref().map_or(0, |s| s.credits_remaining))
            .await;
        CreditsReport {
            balance: CreditBalance::cached(credits),
            freshness: Freshness::Stale,
            failure: Some(failure),
        }
    }

    async fn persist(&self) {
        if let Err(e) = self.store.save().await {
            warn!(error = %e, "Failed to save configuration");
        }
    }
}

fn report_from_entry(entry: &CacheEntry, freshness: Freshness) -> ValidationReport {
    ValidationReport::new(entry.verdict(), entry.message.clone(), entry.credits, freshness)
}
