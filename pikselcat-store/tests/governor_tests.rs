//! Integration tests for the cache and governor over a persisted store.

use std::sync::Arc;

use chrono::Duration;
use pikselcat_core::{Clock, ManualClock, Verdict};
use pikselcat_store::{BlockReason, CacheEntry, ConfigStore, CredentialCache, Permit, QuotaGovernor};
use tempfile::TempDir;

#[tokio::test]
async fn test_quota_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    let clock = ManualClock::starting_now();

    let store = ConfigStore::new(path.clone(), Arc::new(clock.clone()));
    store.update(|d| d.client.daily_call_limit = 2).await;
    let governor = QuotaGovernor::new(store.clone());
    for _ in 0..2 {
        assert!(governor.record_call().await.is_allowed());
        governor.record_success();
        clock.advance(Duration::seconds(3));
    }
    store.save().await.unwrap();

    let store = ConfigStore::load(path, Arc::new(clock.clone())).await.unwrap();
    let governor = QuotaGovernor::new(store);
    assert_eq!(
        governor.can_call().await,
        Permit::Blocked(BlockReason::DailyLimit { limit: 2 })
    );

    clock.advance(Duration::days(1));
    assert!(governor.tick().await);
    assert!(governor.can_call().await.is_allowed());
}

#[tokio::test]
async fn test_cache_and_quota_share_one_document() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    let clock = ManualClock::starting_now();
    let store = ConfigStore::new(path.clone(), Arc::new(clock.clone()));

    let cache = CredentialCache::new(store.clone());
    let governor = QuotaGovernor::new(store.clone());

    assert!(governor.record_call().await.is_allowed());
    cache
        .put("sk_key", CacheEntry::new(Verdict::Valid, "API key is valid", 42, clock.now()))
        .await;
    governor.record_success();
    cache.save().await.unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();
    assert_eq!(raw["api_quota"]["callsToday"], 1);
    assert_eq!(raw["api_validation_cache"]["validation_cache"]["sk_key"]["credits"], 42);
}
