//! Serde tests for the persisted and reported shapes.

use chrono::{TimeZone, Utc};

use crate::{
    CheckedCandidate, CreditBalance, CreditSnapshot, Freshness, ImageFormat, PikselError,
    StagedItem, ValidationReport, Verdict,
};

// ============================================================================
// Snapshot
// ============================================================================

#[test]
fn test_snapshot_uses_camel_case_keys() {
    let snapshot = CreditSnapshot {
        credits_remaining: 12,
        periods: vec![],
        updated_at: Some(Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap()),
    };
    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["creditsRemaining"], 12);
    assert!(json.get("updatedAt").is_some());
}

#[test]
fn test_legacy_snapshot_without_timestamp() {
    let json = r#"{
        "creditsRemaining": 40,
        "periods": [{
            "credits": 50,
            "creditsRemaining": 40,
            "creditsUsed": 10,
            "periodStart": "2025-05-29T04:46:00.927Z",
            "periodEnd": "2026-05-29T04:46:00.926Z",
            "gracePeriodEnd": "2026-06-08T04:46:00.926Z"
        }]
    }"#;
    let snapshot: CreditSnapshot = serde_json::from_str(json).unwrap();
    assert_eq!(snapshot.credits_remaining, 40);
    assert!(snapshot.updated_at.is_none());
    assert_eq!(snapshot.periods[0].credits_used, 10);
}

// ============================================================================
// Verdicts and Reports
// ============================================================================

#[test]
fn test_verdict_lowercase() {
    assert_eq!(serde_json::to_string(&Verdict::Insufficient).unwrap(), r#""insufficient""#);
    assert_eq!(serde_json::to_string(&Freshness::Stale).unwrap(), r#""stale""#);
}

#[test]
fn test_report_omits_missing_failure() {
    let report = ValidationReport::new(Verdict::Valid, "API key is valid", 42, Freshness::Live);
    let json = serde_json::to_value(&report).unwrap();
    assert!(json.get("failure").is_none());
    assert_eq!(json["credits"], 42);
}

#[test]
fn test_report_clamps_negative_credits() {
    let report = ValidationReport::new(Verdict::Insufficient, "Insufficient credits", -3, Freshness::Live);
    assert_eq!(report.credits, 0);
    assert!(!report.valid());
}

#[test]
fn test_failure_serializes_with_variant_name() {
    let report = ValidationReport::new(Verdict::Unknown, "offline", 0, Freshness::Stale)
        .with_failure(PikselError::NetworkFailure("connection refused".into()));
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["failure"]["network_failure"], "connection refused");
}

#[test]
fn test_balance_provenance() {
    let json = serde_json::to_value(CreditBalance::cached(7)).unwrap();
    assert_eq!(json["provenance"], "cached");
}

// ============================================================================
// Staging
// ============================================================================

#[test]
fn test_staged_item_fields() {
    let item = StagedItem::new(
        std::path::Path::new("/photos/cat.webp"),
        2048,
        ImageFormat::WebP,
        Some((640, 480)),
    );
    let json = serde_json::to_value(&item).unwrap();
    assert_eq!(json["displayName"], "cat.webp");
    assert_eq!(json["sizeLabel"], "2.0 KB");
    assert_eq!(json["format"], "webp");
    assert_eq!(json["icon"], "fa6s.image");
}

#[test]
fn test_accepted_candidate_has_no_rejection_key() {
    let json = serde_json::to_value(CheckedCandidate::accepted("a.png")).unwrap();
    assert!(json.get("rejection").is_none());
}
