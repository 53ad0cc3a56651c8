//! File persistence helpers.
//!
//! The configuration document holds the API key, so it is written atomically
//! and kept owner-only on Unix.

use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::StoreError;

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the default configuration directory.
///
/// - macOS: `~/Library/Application Support/PikselCat`
/// - Linux: `~/.config/pikselcat`
/// - Windows: `%APPDATA%\pikselcat`
pub fn default_config_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        dirs::home_dir()
            .map(|h| h.join("Library").join("Application Support").join("PikselCat"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    #[cfg(not(target_os = "macos"))]
    {
        dirs::config_dir()
            .map(|c| c.join("pikselcat"))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Returns the default configuration document path.
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.json")
}

// ============================================================================
// Permissions
// ============================================================================

/// Owner-only mode for the config document.
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// Owner-only mode for the config directory.
#[cfg(unix)]
const DIR_MODE: u32 = 0o700;

/// Applies `mode` to `path`. Does nothing off Unix.
#[cfg(unix)]
async fn restrict(path: &Path, mode: u32) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    debug!(path = %path.display(), mode = %format_args!("{mode:o}"), "Restricted permissions");
    Ok(())
}

#[cfg(not(unix))]
async fn restrict(_path: &Path, _mode: u32) -> Result<(), StoreError> {
    Ok(())
}

#[cfg(not(unix))]
const FILE_MODE: u32 = 0;

#[cfg(not(unix))]
const DIR_MODE: u32 = 0;

// ============================================================================
// Reading and Writing
// ============================================================================

/// Creates `dir` and its parents, owner-only. Existing directories are left
/// untouched.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub async fn ensure_dir(dir: &Path) -> Result<(), StoreError> {
    if dir.as_os_str().is_empty() || dir.exists() {
        return Ok(());
    }
    debug!(path = %dir.display(), "Creating directory");
    tokio::fs::create_dir_all(dir).await?;
    restrict(dir, DIR_MODE).await
}

/// Writes `data` as pretty JSON to `path`.
///
/// The document is written next to the target and renamed over it, so a
/// crash never leaves a half-written config. The file is owner-only on Unix.
///
/// # Errors
///
/// Returns an error if serialization or any file operation fails.
pub async fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent).await?;
    }

    let json = serde_json::to_string_pretty(data)?;
    let staging = path.with_extension("json.tmp");
    tokio::fs::write(&staging, json).await?;
    restrict(&staging, FILE_MODE).await?;
    tokio::fs::rename(&staging, path).await?;

    debug!(path = %path.display(), "Saved");
    Ok(())
}

/// Reads and parses a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// Like [`load_json`], but falls back to `T::default()`.
///
/// A missing file is silent; a file that exists but does not parse is
/// logged.
pub async fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    load_json(path).await.unwrap_or_else(|e| {
        if !matches!(e, StoreError::Io(_)) {
            warn!(path = %path.display(), error = %e, "Unreadable config, using defaults");
        }
        T::default()
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("config.json"));
        assert!(!default_config_dir().as_os_str().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let test_file = temp_dir.path().join("nested").join("config.json");

        save_json(&test_file, &serde_json::json!({"a": 1})).await.unwrap();

        let mode = tokio::fs::metadata(&test_file).await.unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "File should have 0600 permissions");

        let dir_mode = tokio::fs::metadata(test_file.parent().unwrap())
            .await
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700, "Directory should have 0700 permissions");
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");

        save_json(&path, &serde_json::json!({})).await.unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }
}
