//! Text output formatting with progress bars and colors.

use pikselcat_api::{FileOutcome, ProcessSummary};
use pikselcat_core::{
    CreditStatistics, CreditsReport, Freshness, Progress, ValidationReport, ValidationResult,
    Verdict,
};
use pikselcat_ingest::StagingSummary;
use pikselcat_store::QuotaStatus;

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";

// Progress bar characters
const BAR_FULL: char = '█';
const BAR_EMPTY: char = '░';

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
    bar_width: usize,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self {
            use_colors,
            bar_width: 10,
        }
    }

    /// Formats one progress event.
    pub fn format_progress(&self, progress: &Progress) -> String {
        format!("[{:>3}%] {}", progress.percent, progress.message)
    }

    /// Formats a finished staging run.
    pub fn format_stage(&self, validation: &ValidationResult, summary: &StagingSummary) -> String {
        let mut lines = vec![self.bold(&summary.title())];
        lines.push("─".repeat(40));
        for name in summary.lines() {
            lines.push(format!("  {name}"));
        }

        let rejected: Vec<_> = validation
            .entries
            .iter()
            .filter_map(|e| e.rejection.as_ref().map(|r| (e.path.as_str(), r)))
            .collect();
        if !rejected.is_empty() {
            lines.push(String::new());
            lines.push(self.yellow(&format!("Skipped {} file(s):", rejected.len())));
            for (path, reason) in rejected {
                lines.push(format!("  {path} {}", self.dim(&format!("({reason})"))));
            }
        }

        lines.join("\n")
    }

    /// Formats a credential verdict.
    pub fn format_validation(&self, report: &ValidationReport) -> String {
        let status = match report.verdict {
            Verdict::Valid => self.green("✓ Valid"),
            Verdict::Insufficient => self.yellow("✗ No credits"),
            Verdict::Invalid => self.red("✗ Invalid"),
            Verdict::Unknown => self.dim("? Unknown"),
        };

        let mut lines = vec![
            format!("{status} {}", self.freshness_tag(report.freshness)),
            format!("Message: {}", report.message),
            format!("Credits: {}", report.credits),
        ];
        if let Some(failure) = &report.failure {
            lines.push(format!("Note:    {}", self.dim(&failure.to_string())));
        }
        lines.join("\n")
    }

    /// Formats the balance and billing period.
    pub fn format_credits(&self, report: &CreditsReport, stats: &CreditStatistics) -> String {
        let mut lines = vec![
            format!(
                "{} {}",
                self.bold(&format!("{} credits", report.credits())),
                self.freshness_tag(report.freshness)
            ),
            "─".repeat(40),
        ];

        if stats.total_credits > 0 {
            let bar = self.progress_bar(f64::from(stats.remaining_percentage));
            lines.push(format!(
                "Remaining: {bar} {}/{} ({}% used)",
                stats.credits_remaining, stats.total_credits, stats.usage_percentage
            ));
        }
        lines.push(format!("Expires:   {}", stats.expiry_text));
        lines.push(format!("Started:   {}", stats.period_start_text));
        if stats.has_grace_period() {
            lines.push(format!("Grace:     {}", stats.grace_period_text));
        }
        if let Some(failure) = &report.failure {
            lines.push(format!("Note:      {}", self.dim(&failure.to_string())));
        }
        lines.join("\n")
    }

    /// Formats the quota view.
    pub fn format_quota(&self, status: &QuotaStatus) -> String {
        let limit = f64::from(status.daily_limit.max(1));
        let remaining_pct = f64::from(status.remaining) * 100.0 / limit;
        let mut lines = vec![
            self.bold("API calls today"),
            "─".repeat(40),
            format!(
                "{} {}/{} left",
                self.progress_bar(remaining_pct),
                status.remaining,
                status.daily_limit
            ),
            format!("Used:      {}", status.calls_today),
        ];
        if let Some(date) = status.date {
            lines.push(format!("Day:       {date}"));
        }
        if let Some(last) = status.last_call_at {
            lines.push(format!("Last call: {}", last.format("%Y-%m-%d %H:%M:%S UTC")));
        }
        lines.join("\n")
    }

    /// Formats one processed file.
    pub fn format_file_outcome(&self, outcome: &FileOutcome) -> String {
        match (&outcome.output, &outcome.error) {
            (Some(output), _) => format!("{} {} -> {}", self.green("✓"), outcome.input, output.display()),
            (None, Some(error)) => format!("{} {} {}", self.red("✗"), outcome.input, self.dim(&format!("({error})"))),
            (None, None) => format!("{} {}", self.dim("−"), outcome.input),
        }
    }

    /// Formats the end of a processing run.
    pub fn format_process_summary(&self, summary: &ProcessSummary, skipped: usize) -> String {
        let mut line = format!(
            "Completed: {} processed, {} failed",
            summary.processed, summary.failed
        );
        if skipped > 0 {
            line.push_str(&format!(", {skipped} skipped"));
        }
        if summary.failed > 0 || skipped > 0 {
            self.yellow(&line)
        } else {
            self.green(&line)
        }
    }

    /// Formats a progress bar.
    pub fn progress_bar(&self, percent_remaining: f64) -> String {
        let fraction = (percent_remaining / 100.0).clamp(0.0, 1.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let filled = (fraction * self.bar_width as f64).round() as usize;
        let empty = self.bar_width.saturating_sub(filled);

        let bar = format!(
            "{}{}",
            BAR_FULL.to_string().repeat(filled),
            BAR_EMPTY.to_string().repeat(empty)
        );

        self.color_for_percent(percent_remaining, &bar)
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn freshness_tag(&self, freshness: Freshness) -> String {
        match freshness {
            Freshness::Live => self.dim("(live)"),
            Freshness::Cached => self.dim("(cached)"),
            Freshness::Stale => self.yellow("(stale)"),
        }
    }

    fn color_for_percent(&self, percent: f64, text: &str) -> String {
        if !self.use_colors {
            return text.to_string();
        }

        if percent < 20.0 {
            self.red(text)
        } else if percent < 50.0 {
            self.yellow(text)
        } else {
            self.green(text)
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }
}
