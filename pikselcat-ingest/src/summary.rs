//! Work-area summary of a staged batch.

use std::collections::BTreeSet;

use pikselcat_core::StagedItem;
use serde::Serialize;

/// Names shown before the "... and N more files" line.
pub const PREVIEW_LIMIT: usize = 10;

/// Header text for a staged batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagingSummary {
    /// Number of files.
    pub file_count: usize,
    /// Number of distinct parent directories.
    pub folder_count: usize,
    /// First names in staging order.
    pub preview: Vec<String>,
    /// Files not listed in the preview.
    pub remaining: usize,
}

impl StagingSummary {
    /// Summarizes `items` in order.
    pub fn from_items(items: &[StagedItem]) -> Self {
        let folders: BTreeSet<&str> = items.iter().map(|i| i.parent_dir.as_str()).collect();
        Self {
            file_count: items.len(),
            folder_count: folders.len(),
            preview: items
                .iter()
                .take(PREVIEW_LIMIT)
                .map(|i| i.display_name.clone())
                .collect(),
            remaining: items.len().saturating_sub(PREVIEW_LIMIT),
        }
    }

    /// `"12 files loaded (2 folders)"`.
    pub fn title(&self) -> String {
        let files = if self.file_count == 1 { "file" } else { "files" };
        let folders = if self.folder_count == 1 { "folder" } else { "folders" };
        format!(
            "{} {files} loaded ({} {folders})",
            self.file_count, self.folder_count
        )
    }

    /// Preview names followed by the overflow line, if any.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = self.preview.clone();
        if self.remaining > 0 {
            lines.push(format!("... and {} more files", self.remaining));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use pikselcat_core::ImageFormat;

    use super::*;

    fn item(path: &str) -> StagedItem {
        StagedItem::new(Path::new(path), 2048, ImageFormat::Png, None)
    }

    #[test]
    fn test_counts_folders() {
        let items = vec![item("/a/one.png"), item("/a/two.png"), item("/b/three.png")];
        let summary = StagingSummary::from_items(&items);

        assert_eq!(summary.file_count, 3);
        assert_eq!(summary.folder_count, 2);
        assert_eq!(summary.title(), "3 files loaded (2 folders)");
        assert_eq!(summary.lines(), vec!["one.png", "two.png", "three.png"]);
    }

    #[test]
    fn test_overflow_line() {
        let items: Vec<_> = (0..13).map(|i| item(&format!("/photos/{i}.png"))).collect();
        let summary = StagingSummary::from_items(&items);

        assert_eq!(summary.preview.len(), PREVIEW_LIMIT);
        assert_eq!(summary.title(), "13 files loaded (1 folder)");
        assert_eq!(summary.lines().last().unwrap(), "... and 3 more files");
    }

    #[test]
    fn test_empty() {
        let summary = StagingSummary::from_items(&[]);
        assert_eq!(summary.title(), "0 files loaded (0 folders)");
        assert!(summary.lines().is_empty());
    }
}
