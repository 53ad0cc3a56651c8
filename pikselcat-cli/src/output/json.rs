//! JSON output formatting.

use anyhow::Result;
use pikselcat_api::{FileOutcome, ProcessSummary};
use pikselcat_core::{
    CreditStatistics, CreditsReport, Freshness, PikselError, ProcessAction, Provenance,
    StagedItem, ValidationResult,
};
use pikselcat_ingest::StagingSummary;
use serde::Serialize;

// ============================================================================
// Output Types
// ============================================================================

/// A rejected candidate.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionOutput {
    pub path: String,
    pub reason: String,
}

/// Result of the stage command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageOutput {
    pub title: String,
    pub accepted: usize,
    pub rejected: Vec<RejectionOutput>,
    pub items: Vec<StagedItem>,
    pub summary: StagingSummary,
}

impl StageOutput {
    /// Builds the output from a finished staging run.
    pub fn new(validation: &ValidationResult, items: Vec<StagedItem>, summary: &StagingSummary) -> Self {
        let rejected = validation
            .entries
            .iter()
            .filter_map(|e| {
                e.rejection.as_ref().map(|reason| RejectionOutput {
                    path: e.path.clone(),
                    reason: reason.to_string(),
                })
            })
            .collect();
        Self {
            title: summary.title(),
            accepted: validation.accepted_count(),
            rejected,
            items,
            summary: summary.clone(),
        }
    }
}

/// Result of the credits command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditsOutput {
    pub credits: i64,
    pub provenance: Provenance,
    pub freshness: Freshness,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<PikselError>,
    pub statistics: CreditStatistics,
}

impl CreditsOutput {
    /// Builds the output from a report and derived statistics.
    pub fn new(report: &CreditsReport, statistics: CreditStatistics) -> Self {
        Self {
            credits: report.credits(),
            provenance: report.balance.provenance,
            freshness: report.freshness,
            error: report.failure.as_ref().map(ToString::to_string),
            failure: report.failure.clone(),
            statistics,
        }
    }
}

/// Result of the process command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutput {
    pub action: ProcessAction,
    pub summary: ProcessSummary,
    pub skipped: usize,
    pub files: Vec<FileOutcome>,
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }
}
