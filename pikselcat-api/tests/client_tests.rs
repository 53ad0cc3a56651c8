//! Tests for the cache- and quota-gated client.

mod common;

use std::time::Duration;

use chrono::Duration as ChronoDuration;
use common::{harness, MockTransport, Reply};
use pikselcat_api::{MSG_INSUFFICIENT, MSG_INVALID, MSG_VALID};
use pikselcat_core::{CreditSnapshot, Freshness, PikselError, Provenance, Verdict};

// ============================================================================
// validate
// ============================================================================

#[tokio::test]
async fn test_valid_key_then_cache_hit() {
    let h = harness(MockTransport::new(Reply::Credits(42))).await;

    let report = h.client.validate("sk_live_key").await;
    assert!(report.valid());
    assert_eq!(report.credits, 42);
    assert_eq!(report.message, MSG_VALID);
    assert_eq!(report.freshness, Freshness::Live);

    h.pass_interval();
    let again = h.client.validate("sk_live_key").await;
    assert_eq!(again.verdict, Verdict::Valid);
    assert_eq!(again.credits, 42);
    assert_eq!(again.freshness, Freshness::Cached);
    assert_eq!(h.transport.credit_calls(), 1);
}

#[tokio::test]
async fn test_valid_key_is_activated_and_persisted() {
    let h = harness(MockTransport::new(Reply::Credits(42))).await;
    h.client.validate("  sk_live_key ").await;

    assert_eq!(h.store.api_key().await.as_deref(), Some("sk_live_key"));
    assert_eq!(h.client.last_known_credits().await, 42);
    assert!(h.client.has_sufficient_credits(42).await);
    assert!(!h.client.has_sufficient_credits(43).await);

    let raw = std::fs::read_to_string(h.dir.path().join("config.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(doc["api_key"], "sk_live_key");
    assert_eq!(doc["pixelcut_credits"]["creditsRemaining"], 42);
    assert_eq!(doc["api_quota"]["callsToday"], 1);
    assert!(doc["api_validation_cache"]["validation_cache"]["sk_live_key"]["valid"]
        .as_bool()
        .unwrap());
}

#[tokio::test]
async fn test_zero_balance_is_insufficient() {
    let h = harness(MockTransport::new(Reply::Credits(0))).await;

    let report = h.client.validate("sk_empty").await;
    assert!(!report.valid());
    assert_eq!(report.verdict, Verdict::Insufficient);
    assert_eq!(report.message, MSG_INSUFFICIENT);
    assert_eq!(report.credits, 0);
    assert!(report.failure.is_none());
    assert!(h.store.api_key().await.is_none());
}

#[tokio::test]
async fn test_negative_balance_is_clamped() {
    let h = harness(MockTransport::new(Reply::Credits(-5))).await;
    let report = h.client.validate("sk_negative").await;
    assert_eq!(report.verdict, Verdict::Insufficient);
    assert_eq!(report.credits, 0);
}

#[tokio::test]
async fn test_unauthorized_is_invalid_and_clears_active_key() {
    let h = harness(MockTransport::new(Reply::Credits(10))).await;
    h.client.validate("sk_revoked").await;
    assert!(h.store.api_key().await.is_some());

    // Let the cached verdict expire, then the provider starts refusing.
    h.clock.advance(ChronoDuration::seconds(301));
    h.transport.set_reply(Reply::Status(401));

    let report = h.client.validate("sk_revoked").await;
    assert_eq!(report.verdict, Verdict::Invalid);
    assert_eq!(report.message, MSG_INVALID);
    assert_eq!(report.credits, 0);
    assert!(report.failure.is_none());
    assert!(h.store.api_key().await.is_none());
    assert!(h.store.credit_snapshot().await.is_none());
}

#[tokio::test]
async fn test_forbidden_is_invalid_with_failure() {
    let h = harness(MockTransport::new(Reply::Status(403))).await;
    let report = h.client.validate("sk_scoped").await;

    assert_eq!(report.verdict, Verdict::Invalid);
    assert_eq!(report.failure, Some(PikselError::UpstreamForbidden));
}

#[tokio::test]
async fn test_rate_limited_is_refunded_and_not_cached() {
    let h = harness(MockTransport::new(Reply::Status(429))).await;

    let report = h.client.validate("sk_busy").await;
    assert_eq!(report.verdict, Verdict::Unknown);
    assert_eq!(report.freshness, Freshness::Stale);
    assert!(matches!(report.failure, Some(PikselError::UpstreamRateLimited { .. })));

    let status = h.client.governor().status().await;
    assert_eq!(status.calls_today, 0);
    assert!(!status.in_flight);
    assert!(h.client.cache().lookup("sk_busy").await.is_none());
}

#[tokio::test]
async fn test_network_failure_falls_back_to_stale_verdict() {
    let h = harness(MockTransport::new(Reply::Credits(17))).await;
    h.client.validate("sk_flaky").await;

    h.clock.advance(ChronoDuration::seconds(400));
    h.transport.set_reply(Reply::Network);

    let report = h.client.validate("sk_flaky").await;
    assert_eq!(report.verdict, Verdict::Valid);
    assert_eq!(report.credits, 17);
    assert_eq!(report.freshness, Freshness::Stale);
    assert!(matches!(report.failure, Some(PikselError::NetworkFailure(_))));
    assert_eq!(h.transport.credit_calls(), 2);
}

#[tokio::test]
async fn test_network_failure_without_history_is_unknown() {
    let h = harness(MockTransport::new(Reply::Status(500))).await;
    let report = h.client.validate("sk_new").await;

    assert_eq!(report.verdict, Verdict::Unknown);
    assert!(!report.valid());
    assert!(report.failure.as_ref().is_some_and(PikselError::is_transient));
}

#[tokio::test]
async fn test_daily_limit_blocks_without_network() {
    let h = harness(MockTransport::new(Reply::Credits(5))).await;
    h.store.update(|d| d.client.daily_call_limit = 1).await;

    h.client.validate("sk_one").await;
    h.pass_interval();
    let report = h.client.validate("sk_two").await;

    assert_eq!(report.verdict, Verdict::Unknown);
    assert_eq!(report.failure, Some(PikselError::DailyQuotaExceeded { limit: 1 }));
    assert_eq!(h.transport.credit_calls(), 1);
}

#[tokio::test]
async fn test_min_interval_blocks_second_key() {
    let h = harness(MockTransport::new(Reply::Credits(5))).await;
    h.client.validate("sk_a").await;

    let report = h.client.validate("sk_b").await;
    assert!(matches!(report.failure, Some(PikselError::LocalRateLimited { .. })));
    assert!(report.failure.as_ref().is_some_and(PikselError::is_try_again_later));
    assert_eq!(h.transport.credit_calls(), 1);
}

#[tokio::test]
async fn test_concurrent_validations_share_one_call() {
    let transport = MockTransport::new(Reply::Credits(9)).with_delay(Duration::from_millis(100));
    let h = harness(transport).await;

    let calls: Vec<_> = (0..8)
        .map(|_| {
            let client = h.client.clone();
            tokio::spawn(async move { client.validate("sk_shared").await })
        })
        .collect();

    for call in calls {
        let report = call.await.unwrap();
        assert_eq!(report.verdict, Verdict::Valid);
        assert_eq!(report.credits, 9);
    }
    assert_eq!(h.transport.credit_calls(), 1);
}

#[tokio::test]
async fn test_empty_credential_is_invalid_without_network() {
    let h = harness(MockTransport::new(Reply::Credits(1))).await;
    let report = h.client.validate("   ").await;
    assert_eq!(report.verdict, Verdict::Invalid);
    assert_eq!(h.transport.credit_calls(), 0);
}

#[tokio::test]
async fn test_unencodable_credential_is_invalid_without_quota() {
    let h = harness(MockTransport::new(Reply::Credits(1))).await;
    let report = h.client.validate("bad\nkey").await;

    assert_eq!(report.verdict, Verdict::Invalid);
    assert_eq!(report.message, MSG_INVALID);
    assert_eq!(report.failure, Some(PikselError::UpstreamUnauthorized));
    assert!(report.failure.as_ref().is_some_and(PikselError::is_permanent));
    assert_eq!(h.transport.credit_calls(), 0);
    assert_eq!(h.client.governor().status().await.calls_today, 0);
}

#[tokio::test]
async fn test_failed_validation_is_counted_on_disk() {
    let h = harness(MockTransport::new(Reply::Status(500))).await;
    h.client.validate("sk_down").await;

    assert_eq!(h.client.governor().status().await.calls_today, 1);
    assert_eq!(h.calls_on_disk().await, 1);
}

#[tokio::test]
async fn test_refunded_validation_is_saved() {
    let h = harness(MockTransport::new(Reply::Credits(3))).await;
    h.client.validate("sk_first").await;
    assert_eq!(h.calls_on_disk().await, 1);

    h.pass_interval();
    h.transport.set_reply(Reply::Status(429));
    h.client.validate("sk_second").await;

    assert_eq!(h.client.governor().status().await.calls_today, 1);
    assert_eq!(h.calls_on_disk().await, 1);
}

#[tokio::test]
async fn test_crashed_transport_releases_in_flight() {
    let h = harness(MockTransport::new(Reply::Panic)).await;

    let report = h.client.validate("sk_crash").await;
    assert_eq!(report.verdict, Verdict::Unknown);
    assert!(!h.client.governor().status().await.in_flight);

    h.pass_interval();
    h.transport.set_reply(Reply::Credits(4));
    let report = h.client.validate("sk_crash").await;
    assert_eq!(report.verdict, Verdict::Valid);
    assert_eq!(h.transport.credit_calls(), 2);
}

// ============================================================================
// fetch_credits
// ============================================================================

#[tokio::test]
async fn test_fetch_credits_without_key() {
    let h = harness(MockTransport::new(Reply::Credits(1))).await;
    let report = h.client.fetch_credits().await;

    assert_eq!(report.credits(), 0);
    assert_eq!(report.freshness, Freshness::Stale);
    assert_eq!(report.failure, Some(PikselError::UpstreamUnauthorized));
    assert_eq!(h.transport.credit_calls(), 0);
}

#[tokio::test]
async fn test_fresh_snapshot_served_without_network() {
    let h = harness(MockTransport::new(Reply::Credits(30))).await;
    h.client.validate("sk_key").await;
    h.pass_interval();

    let report = h.client.fetch_credits().await;
    assert_eq!(report.credits(), 30);
    assert_eq!(report.freshness, Freshness::Cached);
    assert_eq!(report.balance.provenance, Provenance::Cached);
    assert_eq!(h.transport.credit_calls(), 1);
}

#[tokio::test]
async fn test_stale_snapshot_is_refreshed() {
    let h = harness(MockTransport::new(Reply::Credits(30))).await;
    h.client.validate("sk_key").await;

    h.clock.advance(ChronoDuration::seconds(301));
    h.transport.set_reply(Reply::Credits(25));

    let report = h.client.fetch_credits().await;
    assert_eq!(report.credits(), 25);
    assert_eq!(report.freshness, Freshness::Live);
    assert_eq!(report.balance.provenance, Provenance::Live);
    assert_eq!(h.client.last_known_credits().await, 25);
}

#[tokio::test]
async fn test_refresh_failure_keeps_last_balance() {
    let h = harness(MockTransport::new(Reply::Credits(30))).await;
    h.client.validate("sk_key").await;

    h.pass_interval();
    h.transport.set_reply(Reply::Network);

    let report = h.client.refresh_credits().await;
    assert_eq!(report.credits(), 30);
    assert_eq!(report.freshness, Freshness::Stale);
    assert!(matches!(report.failure, Some(PikselError::NetworkFailure(_))));
}

#[tokio::test]
async fn test_legacy_snapshot_without_timestamp_is_refreshed() {
    let h = harness(MockTransport::new(Reply::Credits(12))).await;
    h.store
        .activate_key(
            "sk_legacy",
            CreditSnapshot {
                credits_remaining: 3,
                ..CreditSnapshot::default()
            },
        )
        .await;

    let report = h.client.fetch_credits().await;
    assert_eq!(report.credits(), 12);
    assert_eq!(h.transport.credit_calls(), 1);
}
