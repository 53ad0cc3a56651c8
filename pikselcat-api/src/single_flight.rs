//! Shared in-flight calls.
//!
//! The first caller for a key spawns the work; later callers for the same
//! key await the same shared future. The work runs on its own task, so it
//! finishes even if every caller goes away.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{trace, warn};

type SharedCall<V> = Shared<BoxFuture<'static, Option<V>>>;

/// Deduplicates concurrent calls per key.
pub struct SingleFlight<K, V> {
    calls: Arc<Mutex<HashMap<K, SharedCall<V>>>>,
}

impl<K, V> Clone for SingleFlight<K, V> {
    fn clone(&self) -> Self {
        Self {
            calls: Arc::clone(&self.calls),
        }
    }
}

impl<K, V> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self {
            calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, V> fmt::Debug for SingleFlight<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleFlight").finish_non_exhaustive()
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `make()` unless a call for `key` is already in flight, in which
    /// case its outcome is shared.
    ///
    /// Returns `None` if the spawned task panicked.
    pub async fn run<F, Fut>(&self, key: K, make: F) -> Option<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let call = {
            let mut calls = self.calls.lock().await;
            if let Some(existing) = calls.get(&key) {
                trace!("Joining in-flight call");
                existing.clone()
            } else {
                let task = tokio::spawn(make());
                let call = async move {
                    task.await
                        .map_err(|e| warn!(error = %e, "In-flight call failed"))
                        .ok()
                }
                .boxed()
                .shared();
                calls.insert(key.clone(), call.clone());
                call
            }
        };

        let outcome = call.clone().await;

        let mut calls = self.calls.lock().await;
        if calls.get(&key).is_some_and(|current| current.ptr_eq(&call)) {
            calls.remove(&key);
        }
        outcome
    }

    /// Number of keys with a call in flight.
    pub async fn in_flight(&self) -> usize {
        self.calls.lock().await.len()
    }
}
