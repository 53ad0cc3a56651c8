//! Shared, persisted configuration store.
//!
//! One `ConfigStore` is shared by the credential cache, the quota governor,
//! and the API client. Every mutation goes through the write lock, which is
//! what makes the quota check-and-increment atomic.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pikselcat_core::{system_clock, ClientSettings, Clock, CreditSnapshot};
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, instrument};

use crate::document::ConfigDocument;
use crate::error::StoreError;
use crate::persistence::{default_config_path, load_json_or_default, save_json};

/// Persistent configuration store with change notifications.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    document: Arc<RwLock<ConfigDocument>>,
    path: Arc<PathBuf>,
    clock: Arc<dyn Clock>,
    notify: Arc<watch::Sender<u64>>,
    version: Arc<AtomicU64>,
}

impl ConfigStore {
    /// Creates a store holding `document`, saved to `path` on demand.
    pub fn with_document(path: PathBuf, document: ConfigDocument, clock: Arc<dyn Clock>) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            document: Arc::new(RwLock::new(document)),
            path: Arc::new(path),
            clock,
            notify: Arc::new(notify),
            version: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Creates a store with a default document.
    pub fn new(path: PathBuf, clock: Arc<dyn Clock>) -> Self {
        Self::with_document(path, ConfigDocument::default(), clock)
    }

    /// Loads the document from the default path with the system clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings in the document are invalid.
    pub async fn load_default() -> Result<Self, StoreError> {
        Self::load(default_config_path(), system_clock()).await
    }

    /// Loads the document from `path` and purges expired cache entries.
    ///
    /// A missing or unparsable file yields a default document.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Config` if the client settings are invalid.
    #[instrument(skip(clock), fields(path = %path.display()))]
    pub async fn load(path: PathBuf, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        let mut document: ConfigDocument = if path.exists() {
            info!("Loading configuration");
            load_json_or_default(&path).await
        } else {
            debug!("Configuration file not found, using defaults");
            ConfigDocument::default()
        };

        document
            .client
            .validate()
            .map_err(|e| StoreError::Config(e.to_string()))?;

        let ttl = document.client.cache_ttl();
        let removed = document.api_validation_cache.normalize(clock.now(), ttl);
        if removed > 0 {
            debug!(removed, "Dropped stale cache entries on load");
        }

        Ok(Self::with_document(path, document, clock))
    }

    /// Path of the persisted document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The clock used for TTLs and quota days.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Current instant according to the store's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Reads from the document under the read lock.
    pub async fn read<R>(&self, f: impl FnOnce(&ConfigDocument) -> R) -> R {
        let document = self.document.read().await;
        f(&document)
    }

    /// Returns a copy of the document.
    pub async fn snapshot(&self) -> ConfigDocument {
        self.document.read().await.clone()
    }

    /// Mutates the document under the write lock and notifies subscribers.
    pub async fn update<R>(&self, f: impl FnOnce(&mut ConfigDocument) -> R) -> R {
        let result = {
            let mut document = self.document.write().await;
            f(&mut document)
        };
        self.notify_change();
        result
    }

    /// Purges and caps the cache, then writes the document to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn save(&self) -> Result<(), StoreError> {
        let now = self.now();
        let document = {
            let mut document = self.document.write().await;
            let ttl = document.client.cache_ttl();
            document.api_validation_cache.normalize(now, ttl);
            document.clone()
        };

        save_json(&self.path, &document).await?;
        debug!("Configuration saved");
        Ok(())
    }

    /// Subscribes to document changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    fn notify_change(&self) {
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.notify.send(version);
    }

    // ========================================================================
    // Convenience Methods
    // ========================================================================

    /// Client settings.
    pub async fn settings(&self) -> ClientSettings {
        self.read(|d| d.client.clone()).await
    }

    /// The active API key, if any.
    pub async fn api_key(&self) -> Option<String> {
        self.read(|d| d.active_key().map(str::to_string)).await
    }

    /// The persisted credit snapshot, if any.
    pub async fn credit_snapshot(&self) -> Option<CreditSnapshot> {
        self.read(|d| d.pixelcut_credits.clone()).await
    }

    /// Stores `key` as the active key together with its snapshot.
    pub async fn activate_key(&self, key: &str, snapshot: CreditSnapshot) {
        self.update(|d| {
            d.api_key = Some(key.trim().to_string());
            d.pixelcut_credits = Some(snapshot);
        })
        .await;
    }

    /// Clears the active key and snapshot if the key equals `key`.
    ///
    /// Returns true when something was cleared.
    pub async fn deactivate_key(&self, key: &str) -> bool {
        self.update(|d| {
            if d.active_key() == Some(key.trim()) {
                d.api_key = None;
                d.pixelcut_credits = None;
                true
            } else {
                false
            }
        })
        .await
    }
}
