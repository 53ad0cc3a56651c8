//! Staging types: candidate checks, staged items, and run progress.

use std::path::{Path, MAIN_SEPARATOR};

use serde::{Deserialize, Serialize};

use super::format::ImageFormat;
use crate::error::PikselError;

/// Maximum characters of a parent directory shown in a staged item.
pub const DISPLAY_DIR_MAX_LEN: usize = 50;

// ============================================================================
// Validation Results
// ============================================================================

/// The verdict for one candidate path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckedCandidate {
    /// Candidate path as supplied by the caller.
    pub path: String,
    /// Why the candidate was rejected. `None` means accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<PikselError>,
}

impl CheckedCandidate {
    /// Creates an accepted entry.
    pub fn accepted(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            rejection: None,
        }
    }

    /// Creates a rejected entry.
    pub fn rejected(path: impl Into<String>, reason: PikselError) -> Self {
        Self {
            path: path.into(),
            rejection: Some(reason),
        }
    }

    /// Returns true if the candidate was accepted.
    pub fn is_accepted(&self) -> bool {
        self.rejection.is_none()
    }
}

/// Ordered outcome of one validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// One entry per input path, in input order.
    pub entries: Vec<CheckedCandidate>,
}

impl ValidationResult {
    /// Number of checked candidates.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was checked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Paths that passed validation, in input order.
    pub fn accepted_paths(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.is_accepted())
            .map(|e| e.path.clone())
            .collect()
    }

    /// Number of accepted candidates.
    pub fn accepted_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_accepted()).count()
    }

    /// Number of rejected candidates.
    pub fn rejected_count(&self) -> usize {
        self.len() - self.accepted_count()
    }
}

// ============================================================================
// Staged Item
// ============================================================================

/// A presentable entry for one accepted file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedItem {
    /// Full path of the file.
    pub path: String,
    /// File name shown to the user.
    pub display_name: String,
    /// Parent directory.
    pub parent_dir: String,
    /// Parent directory shortened for display.
    pub display_dir: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Human-readable file size.
    pub size_label: String,
    /// Detected image format.
    pub format: ImageFormat,
    /// Pixel dimensions when the header was readable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<(u32, u32)>,
    /// Icon identifier for the list row.
    pub icon: String,
}

impl StagedItem {
    /// Builds an item from a path and the facts gathered about it.
    pub fn new(
        path: &Path,
        size_bytes: u64,
        format: ImageFormat,
        dimensions: Option<(u32, u32)>,
    ) -> Self {
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent_dir = path
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let icon = icon_for_path(path).to_string();

        Self {
            path: path.to_string_lossy().into_owned(),
            display_dir: truncate_path(&parent_dir, DISPLAY_DIR_MAX_LEN),
            display_name,
            parent_dir,
            size_bytes,
            size_label: format_size(size_bytes),
            format,
            dimensions,
            icon,
        }
    }
}

/// Formats a byte count the way the file list shows it.
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    #[allow(clippy::cast_precision_loss)]
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < MB {
        format!("{:.1} KB", b / KB)
    } else if b < GB {
        format!("{:.1} MB", b / MB)
    } else {
        format!("{:.1} GB", b / GB)
    }
}

/// Shortens a directory for display, keeping its last two components.
pub fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let parts: Vec<&str> = path.split(MAIN_SEPARATOR).filter(|p| !p.is_empty()).collect();
    if parts.len() > 2 {
        let tail = parts[parts.len() - 2..].join(&MAIN_SEPARATOR.to_string());
        format!("...{MAIN_SEPARATOR}{tail}")
    } else {
        let skip = path.chars().count() - max_len;
        format!("...{}", path.chars().skip(skip).collect::<String>())
    }
}

/// Icon token for a file, by extension.
pub fn icon_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "svg" | "webp" | "ico" | "tif" | "tiff" => {
            "fa6s.image"
        }
        _ => "fa6s.file",
    }
}

// ============================================================================
// Progress
// ============================================================================

/// A progress notification for a cancellable run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Percent complete, 0-100.
    pub percent: u8,
    /// Status line for the caller.
    pub message: String,
}

impl Progress {
    /// Creates a progress value, clamping the percentage to 100.
    pub fn new(percent: u8, message: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            message: message.into(),
        }
    }

    /// Percentage of `done` over `total`; an empty run is complete.
    pub fn percent_of(done: usize, total: usize) -> u8 {
        if total == 0 {
            return 100;
        }
        #[allow(clippy::cast_possible_truncation)]
        let pct = (done.min(total) * 100 / total) as u8;
        pct
    }
}
