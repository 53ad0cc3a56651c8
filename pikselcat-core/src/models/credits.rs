//! Credit balance, snapshot, and statistics models.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Balance
// ============================================================================

/// Where a balance came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Read from a network response during this call.
    Live,
    /// Read from the cache or the persisted snapshot.
    Cached,
}

/// Last known credit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditBalance {
    /// Remaining credits.
    pub credits: i64,
    /// Where the number came from.
    pub provenance: Provenance,
}

impl CreditBalance {
    /// A balance just read from the provider.
    pub fn live(credits: i64) -> Self {
        Self {
            credits,
            provenance: Provenance::Live,
        }
    }

    /// A balance read from local state.
    pub fn cached(credits: i64) -> Self {
        Self {
            credits,
            provenance: Provenance::Cached,
        }
    }
}

// ============================================================================
// Wire / Persisted Shapes
// ============================================================================

/// One billing period as reported by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditPeriod {
    /// Credits granted for the period.
    #[serde(default)]
    pub credits: i64,
    /// Credits left in the period.
    #[serde(default)]
    pub credits_remaining: i64,
    /// Credits consumed in the period.
    #[serde(default)]
    pub credits_used: i64,
    /// Period start, ISO-8601 or epoch seconds/milliseconds.
    #[serde(default, deserialize_with = "string_or_number")]
    pub period_start: String,
    /// Period end.
    #[serde(default, deserialize_with = "string_or_number")]
    pub period_end: String,
    /// Grace period end.
    #[serde(default, deserialize_with = "string_or_number")]
    pub grace_period_end: String,
}

/// Body of the credits endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreditsResponse {
    /// Top-level remaining credits, when present.
    #[serde(default, alias = "creditsRemaining")]
    pub credits_remaining: Option<i64>,
    /// Billing periods, most recent first.
    #[serde(default)]
    pub periods: Vec<CreditPeriod>,
}

impl CreditsResponse {
    /// Remaining credits: the top-level field, else the first period, else 0.
    pub fn remaining(&self) -> i64 {
        self.credits_remaining
            .or_else(|| self.periods.first().map(|p| p.credits_remaining))
            .unwrap_or(0)
    }

    /// Converts the response into a snapshot stamped at `fetched_at`.
    pub fn into_snapshot(self, fetched_at: DateTime<Utc>) -> CreditSnapshot {
        CreditSnapshot {
            credits_remaining: self.remaining(),
            periods: self.periods,
            updated_at: Some(fetched_at),
        }
    }
}

/// The persisted credit snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditSnapshot {
    /// Remaining credits at fetch time.
    #[serde(default)]
    pub credits_remaining: i64,
    /// Billing periods, most recent first.
    #[serde(default)]
    pub periods: Vec<CreditPeriod>,
    /// When the snapshot was fetched. `None` for legacy documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CreditSnapshot {
    /// Returns true if the snapshot was fetched less than `ttl` ago.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        self.updated_at.is_some_and(|at| now - at < ttl)
    }

    /// The most recent billing period.
    pub fn current_period(&self) -> Option<&CreditPeriod> {
        self.periods.first()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
        Null,
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        #[allow(clippy::cast_possible_truncation)]
        Raw::Float(f) => (f as i64).to_string(),
        Raw::Null => String::new(),
    })
}

/// Parses a period boundary: ISO-8601, or epoch seconds/milliseconds.
///
/// Numeric strings longer than 10 digits are milliseconds. Empty and `"0"`
/// mean "no data".
pub fn parse_period_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "0" {
        return None;
    }

    if raw.contains('T') {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        return NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc());
    }

    let n: i64 = raw.parse().ok()?;
    if raw.len() > 10 {
        Utc.timestamp_millis_opt(n).single()
    } else {
        Utc.timestamp_opt(n, 0).single()
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Derived view over the most recent billing period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreditStatistics {
    /// Credits left.
    pub credits_remaining: i64,
    /// Credits granted.
    pub total_credits: i64,
    /// Credits consumed.
    pub credits_used: i64,
    /// Percent of the grant consumed.
    pub usage_percentage: u8,
    /// Percent of the grant left.
    pub remaining_percentage: u8,
    /// Whole days until the period ends, never negative.
    pub days_until_expiry: i64,
    /// Whole days until the grace period ends, never negative.
    pub grace_days_until_expiry: i64,
    /// Human text for the period end.
    pub expiry_text: String,
    /// Human text for the period start.
    pub period_start_text: String,
    /// Human text for the grace period end.
    pub grace_period_text: String,
}

impl CreditStatistics {
    /// Computes statistics from a snapshot at instant `now`.
    pub fn from_snapshot(snapshot: &CreditSnapshot, now: DateTime<Utc>) -> Self {
        let Some(period) = snapshot.current_period() else {
            return Self::empty();
        };

        let usage_percentage = if period.credits > 0 {
            let used = period.credits_used.max(0).saturating_mul(100);
            let pct = (used / period.credits).clamp(0, 100);
            u8::try_from(pct).unwrap_or(100)
        } else {
            0
        };

        let end = parse_period_instant(&period.period_end);
        let grace_end = parse_period_instant(&period.grace_period_end);
        let days_until_expiry = days_until(end, now);
        let grace_days_until_expiry = days_until(grace_end, now);

        Self {
            credits_remaining: period.credits_remaining,
            total_credits: period.credits,
            credits_used: period.credits_used,
            usage_percentage,
            remaining_percentage: 100 - usage_percentage,
            days_until_expiry,
            grace_days_until_expiry,
            expiry_text: expiry_text(&period.period_end, end, days_until_expiry),
            period_start_text: start_text(&period.period_start, now),
            grace_period_text: expiry_text(
                &period.grace_period_end,
                grace_end,
                grace_days_until_expiry,
            ),
        }
    }

    /// Statistics when no period data exists.
    pub fn empty() -> Self {
        Self {
            credits_remaining: 0,
            total_credits: 0,
            credits_used: 0,
            usage_percentage: 0,
            remaining_percentage: 0,
            days_until_expiry: 0,
            grace_days_until_expiry: 0,
            expiry_text: "No data available".to_string(),
            period_start_text: "Unknown".to_string(),
            grace_period_text: String::new(),
        }
    }

    /// Returns true when there is a grace window left to report.
    pub fn has_grace_period(&self) -> bool {
        self.grace_days_until_expiry > 0
    }
}

fn days_until(instant: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    instant.map_or(0, |at| (at - now).num_days().max(0))
}

fn expiry_text(raw: &str, parsed: Option<DateTime<Utc>>, days: i64) -> String {
    let raw = raw.trim();
    if raw.is_empty() || raw == "0" {
        return "No expiry data".to_string();
    }
    let Some(at) = parsed else {
        return "Invalid date".to_string();
    };

    let date = at.format("%Y-%m-%d");
    match days {
        0 => format!("{date} (Expired or expires today)"),
        1 => format!("{date} (1 day remaining)"),
        n => format!("{date} ({n} days remaining)"),
    }
}

fn start_text(raw: &str, now: DateTime<Utc>) -> String {
    let raw = raw.trim();
    if raw.is_empty() || raw == "0" {
        return "Unknown".to_string();
    }
    let Some(at) = parse_period_instant(raw) else {
        return "Invalid date".to_string();
    };

    let date = at.format("%Y-%m-%d");
    match (now - at).num_days() {
        0 => format!("{date} (today)"),
        1 => format!("{date} (1 day ago)"),
        n => format!("{date} ({n} days ago)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_parse_period_instant_variants() {
        let iso = parse_period_instant("2026-05-29T04:46:00.926Z").unwrap();
        assert_eq!(iso, at("2026-05-29T04:46:00.926Z"));

        let secs = parse_period_instant("1780029960").unwrap();
        let millis = parse_period_instant("1780029960000").unwrap();
        assert_eq!(secs, millis);

        assert!(parse_period_instant("0").is_none());
        assert!(parse_period_instant("").is_none());
        assert!(parse_period_instant("soon").is_none());
    }

    #[test]
    fn test_remaining_falls_back_to_first_period() {
        let body: CreditsResponse = serde_json::from_str(
            r#"{"periods":[{"credits":100,"creditsRemaining":37,"creditsUsed":63}]}"#,
        )
        .unwrap();
        assert_eq!(body.remaining(), 37);

        let body: CreditsResponse = serde_json::from_str(r#"{"credits_remaining":5}"#).unwrap();
        assert_eq!(body.remaining(), 5);

        let body: CreditsResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(body.remaining(), 0);
    }

    #[test]
    fn test_period_accepts_numeric_boundaries() {
        let period: CreditPeriod =
            serde_json::from_str(r#"{"periodEnd":1780029960,"periodStart":null}"#).unwrap();
        assert_eq!(period.period_end, "1780029960");
        assert_eq!(period.period_start, "");
    }

    #[test]
    fn test_statistics_from_snapshot() {
        let snapshot = CreditSnapshot {
            credits_remaining: 75,
            periods: vec![CreditPeriod {
                credits: 100,
                credits_remaining: 75,
                credits_used: 25,
                period_start: "2026-10-09T00:00:00Z".into(),
                period_end: "2026-10-29T12:00:00Z".into(),
                grace_period_end: "2026-11-08T12:00:00Z".into(),
            }],
            updated_at: None,
        };
        let stats = CreditStatistics::from_snapshot(&snapshot, at("2026-10-19T12:00:00Z"));

        assert_eq!(stats.usage_percentage, 25);
        assert_eq!(stats.remaining_percentage, 75);
        assert_eq!(stats.days_until_expiry, 10);
        assert_eq!(stats.grace_days_until_expiry, 20);
        assert_eq!(stats.expiry_text, "2026-10-29 (10 days remaining)");
        assert_eq!(stats.period_start_text, "2026-10-09 (10 days ago)");
        assert!(stats.has_grace_period());
    }

    #[test]
    fn test_statistics_expired_period() {
        let snapshot = CreditSnapshot {
            periods: vec![CreditPeriod {
                credits: 10,
                period_end: "2026-01-01T00:00:00Z".into(),
                ..CreditPeriod::default()
            }],
            ..CreditSnapshot::default()
        };
        let stats = CreditStatistics::from_snapshot(&snapshot, at("2026-10-19T12:00:00Z"));
        assert_eq!(stats.days_until_expiry, 0);
        assert_eq!(stats.expiry_text, "2026-01-01 (Expired or expires today)");
        assert_eq!(stats.grace_period_text, "No expiry data");
    }

    #[test]
    fn test_statistics_with_huge_usage() {
        let snapshot = CreditSnapshot {
            periods: vec![CreditPeriod {
                credits: 10,
                credits_used: i64::MAX,
                ..CreditPeriod::default()
            }],
            ..CreditSnapshot::default()
        };
        let stats = CreditStatistics::from_snapshot(&snapshot, at("2026-10-19T12:00:00Z"));
        assert_eq!(stats.usage_percentage, 100);
        assert_eq!(stats.remaining_percentage, 0);
    }

    #[test]
    fn test_empty_snapshot_statistics() {
        let stats = CreditStatistics::from_snapshot(&CreditSnapshot::default(), Utc::now());
        assert_eq!(stats, CreditStatistics::empty());
        assert_eq!(stats.expiry_text, "No data available");
    }

    #[test]
    fn test_snapshot_freshness() {
        let now = at("2026-10-19T12:00:00Z");
        let ttl = chrono::Duration::seconds(300);
        let mut snapshot = CreditSnapshot::default();
        assert!(!snapshot.is_fresh(now, ttl));

        snapshot.updated_at = Some(now - chrono::Duration::seconds(299));
        assert!(snapshot.is_fresh(now, ttl));

        snapshot.updated_at = Some(now - chrono::Duration::seconds(300));
        assert!(!snapshot.is_fresh(now, ttl));
    }
}
