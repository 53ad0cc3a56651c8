//! TTL cache of credential verdicts.

use tracing::debug;

use crate::config_store::ConfigStore;
use crate::document::CacheEntry;
use crate::error::StoreError;

/// Cached verdicts keyed by the full credential string.
///
/// Entries live in the shared [`ConfigStore`]. Writes do not touch disk;
/// callers batch them and call [`CredentialCache::save`] once per round.
#[derive(Debug, Clone)]
pub struct CredentialCache {
    store: ConfigStore,
}

impl CredentialCache {
    /// Creates a cache backed by `store`.
    pub fn new(store: ConfigStore) -> Self {
        Self { store }
    }

    /// Returns an entry younger than the cache duration.
    pub async fn lookup(&self, credential: &str) -> Option<CacheEntry> {
        self.find(credential, 1).await
    }

    /// Returns an entry younger than three times the cache duration.
    ///
    /// Advisory only: used as a fallback when a live check is not possible.
    pub async fn quick_lookup(&self, credential: &str) -> Option<CacheEntry> {
        self.find(credential, 3).await
    }

    async fn find(&self, credential: &str, ttl_multiple: i32) -> Option<CacheEntry> {
        let now = self.store.now();
        self.store
            .read(|doc| {
                let ttl = doc.client.cache_ttl() * ttl_multiple;
                doc.api_validation_cache
                    .validation_cache
                    .get(credential)
                    .filter(|entry| entry.age(now) < ttl)
                    .cloned()
            })
            .await
    }

    /// Inserts or replaces the entry for `credential`, then purges and caps.
    pub async fn put(&self, credential: &str, entry: CacheEntry) {
        let now = self.store.now();
        let removed = self
            .store
            .update(|doc| {
                let ttl = doc.client.cache_ttl();
                let cache = &mut doc.api_validation_cache;
                cache.validation_cache.insert(credential.to_string(), entry);
                cache.normalize(now, ttl)
            })
            .await;
        if removed > 0 {
            debug!(removed, "Evicted cache entries");
        }
    }

    /// Removes entries older than twice the cache duration.
    pub async fn purge_expired(&self) -> usize {
        let now = self.store.now();
        self.store
            .update(|doc| {
                let ttl = doc.client.cache_ttl();
                doc.api_validation_cache.purge(now, ttl)
            })
            .await
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        self.store.read(|doc| doc.api_validation_cache.len()).await
    }

    /// Returns true if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Persists the document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    pub async fn save(&self) -> Result<(), StoreError> {
        self.store.save().await
    }
}
