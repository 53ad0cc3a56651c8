//! Processing actions offered for staged images.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// An image operation billed against the credit balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessAction {
    /// Background removal; always produces PNG.
    RemoveBg,
    /// 2x upscale.
    Upscale2x,
    /// 4x upscale.
    Upscale4x,
}

impl ProcessAction {
    /// All actions.
    pub const ALL: [ProcessAction; 3] = [Self::RemoveBg, Self::Upscale2x, Self::Upscale4x];

    /// Label shown to users.
    pub fn label(&self) -> &'static str {
        match self {
            Self::RemoveBg => "Remove Bg",
            Self::Upscale2x => "Upscale 2x",
            Self::Upscale4x => "Upscale 4x",
        }
    }

    /// Suffix appended to the input stem.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::RemoveBg => "_removed_bg",
            Self::Upscale2x => "_upscaled_2x",
            Self::Upscale4x => "_upscaled_4x",
        }
    }

    /// Upscale factor, if this is an upscale.
    pub fn scale(&self) -> Option<u8> {
        match self {
            Self::RemoveBg => None,
            Self::Upscale2x => Some(2),
            Self::Upscale4x => Some(4),
        }
    }

    /// Output file name for an input path.
    ///
    /// Background removal always writes `.png`; upscales keep the input extension.
    pub fn output_file_name(&self, input: &Path) -> String {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = match self {
            Self::RemoveBg => ".png".to_string(),
            _ => input
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default(),
        };
        format!("{stem}{}{ext}", self.suffix())
    }
}

impl FromStr for ProcessAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '_'], "-");
        match normalized.as_str() {
            "remove-bg" | "removebg" => Ok(Self::RemoveBg),
            "upscale-2x" => Ok(Self::Upscale2x),
            "upscale-4x" => Ok(Self::Upscale4x),
            _ => Err(CoreError::InvalidData(format!("unknown action: {s}"))),
        }
    }
}

impl fmt::Display for ProcessAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
