//! Persistence round-trip and edge case tests.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Duration;
use pikselcat_core::{Clock, CreditSnapshot, ManualClock, Verdict};
use tempfile::TempDir;

use crate::config_store::ConfigStore;
use crate::document::{CacheEntry, ConfigDocument};
use crate::persistence::{ensure_dir, load_json, load_json_or_default, save_json};

// ============================================================================
// JSON Persistence Tests
// ============================================================================

#[tokio::test]
async fn test_save_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let nested_path = temp_dir.path().join("deeply").join("nested").join("config.json");

    save_json(&nested_path, &ConfigDocument::default()).await.unwrap();
    assert!(nested_path.exists());
}

#[tokio::test]
async fn test_load_nonexistent_file() {
    let file_path = PathBuf::from("/nonexistent/path/config.json");

    let result: Result<ConfigDocument, _> = load_json(&file_path).await;
    assert!(result.is_err());

    let doc: ConfigDocument = load_json_or_default(&file_path).await;
    assert_eq!(doc, ConfigDocument::default());
}

#[tokio::test]
async fn test_ensure_dir_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let new_dir = temp_dir.path().join("new_directory");

    ensure_dir(&new_dir).await.unwrap();
    assert!(new_dir.is_dir());
}

// ============================================================================
// ConfigStore Tests
// ============================================================================

#[tokio::test]
async fn test_store_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    let clock = ManualClock::starting_now();

    let store = ConfigStore::new(path.clone(), Arc::new(clock.clone()));
    store
        .update(|d| {
            d.api_key = Some("sk_live".into());
            d.pixelcut_credits = Some(CreditSnapshot {
                credits_remaining: 9,
                ..CreditSnapshot::default()
            });
            d.api_quota.calls_today = 4;
        })
        .await;
    store.save().await.unwrap();

    let reloaded = ConfigStore::load(path, Arc::new(clock)).await.unwrap();
    assert_eq!(reloaded.api_key().await.as_deref(), Some("sk_live"));
    assert_eq!(reloaded.credit_snapshot().await.unwrap().credits_remaining, 9);
    assert_eq!(reloaded.read(|d| d.api_quota.calls_today).await, 4);
}

#[tokio::test]
async fn test_load_purges_stale_cache() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    let clock = ManualClock::starting_now();

    let mut doc = ConfigDocument::default();
    let cache = &mut doc.api_validation_cache.validation_cache;
    cache.insert("fresh".into(), CacheEntry::new(Verdict::Valid, "ok", 1, clock.now()));
    cache.insert(
        "stale".into(),
        CacheEntry::new(Verdict::Valid, "ok", 1, clock.now() - Duration::seconds(601)),
    );
    save_json(&path, &doc).await.unwrap();

    let store = ConfigStore::load(path, Arc::new(clock)).await.unwrap();
    let keys: Vec<String> = store
        .read(|d| d.api_validation_cache.validation_cache.keys().cloned().collect())
        .await;
    assert_eq!(keys, vec!["fresh".to_string()]);
}

#[tokio::test]
async fn test_corrupt_file_falls_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    tokio::fs::write(&path, "{ not json").await.unwrap();

    let store = ConfigStore::load(path, Arc::new(ManualClock::starting_now())).await.unwrap();
    assert_eq!(store.snapshot().await, ConfigDocument::default());
}

#[tokio::test]
async fn test_invalid_settings_rejected_on_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    tokio::fs::write(&path, r#"{"client": {"daily_call_limit": 0}}"#).await.unwrap();

    let result = ConfigStore::load(path, Arc::new(ManualClock::starting_now())).await;
    assert!(matches!(result, Err(crate::StoreError::Config(_))));
}
