//! Image formats accepted by the ingestion pipeline.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PikselError;

/// Image formats on the staging allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// JPEG (`.jpg`, `.jpeg`).
    Jpeg,
    /// PNG (`.png`).
    Png,
    /// TIFF (`.tif`, `.tiff`).
    Tiff,
    /// WebP (`.webp`).
    WebP,
}

impl ImageFormat {
    /// All accepted formats.
    pub const ALL: [ImageFormat; 4] = [Self::Jpeg, Self::Png, Self::Tiff, Self::WebP];

    /// File extensions associated with this format.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Jpeg => &["jpg", "jpeg"],
            Self::Png => &["png"],
            Self::Tiff => &["tif", "tiff"],
            Self::WebP => &["webp"],
        }
    }

    /// Check if the extension matches this format.
    pub fn matches_extension(&self, ext: &str) -> bool {
        let ext = ext.to_lowercase();
        self.extensions().contains(&ext.as_str())
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Tiff => "TIFF",
            Self::WebP => "WebP",
        }
    }

    /// Detects the format from a path's extension.
    ///
    /// # Errors
    ///
    /// Returns `PikselError::UnsupportedFormat` when the path has no extension
    /// or the extension is outside the allow-list.
    pub fn from_path(path: &Path) -> Result<Self, PikselError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                PikselError::UnsupportedFormat(format!("no extension: {}", path.display()))
            })?;
        ext.parse()
    }
}

impl FromStr for ImageFormat {
    type Err = PikselError;

    fn from_str(ext: &str) -> Result<Self, Self::Err> {
        let ext = ext.trim_start_matches('.');
        Self::ALL
            .into_iter()
            .find(|f| f.matches_extension(ext))
            .ok_or_else(|| PikselError::UnsupportedFormat(format!(".{}", ext.to_lowercase())))
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
