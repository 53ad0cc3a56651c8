//! Cheap checks on candidate files.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use pikselcat_core::{ImageFormat, PikselError};

/// Facts gathered about an acceptable file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFacts {
    /// Size in bytes.
    pub size_bytes: u64,
    /// Format from the extension.
    pub format: ImageFormat,
    /// Pixel dimensions from the header.
    pub dimensions: (u32, u32),
}

/// Checks existence, extension, size, and header of one candidate.
///
/// # Errors
///
/// `NotFound` for a missing path, `UnsupportedFormat` for an extension
/// outside the allow-list, `CorruptOrUnreadable` for anything else.
pub async fn inspect(path: &Path, min_file_size: u64) -> Result<FileFacts, PikselError> {
    let display = path.display().to_string();

    let meta = match tokio::fs::metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(PikselError::NotFound(display)),
        Err(e) => return Err(PikselError::CorruptOrUnreadable(format!("{display}: {e}"))),
    };
    if !meta.is_file() {
        return Err(PikselError::CorruptOrUnreadable(format!("{display}: not a regular file")));
    }

    let format = ImageFormat::from_path(path)?;

    if meta.len() < min_file_size {
        return Err(PikselError::CorruptOrUnreadable(format!(
            "{display}: {} bytes is below the {min_file_size} byte minimum",
            meta.len()
        )));
    }

    let dimensions = read_dimensions(path.to_path_buf()).await?;

    Ok(FileFacts {
        size_bytes: meta.len(),
        format,
        dimensions,
    })
}

/// Sniffs the format from the file contents and reads the dimensions
/// from the header. No pixel data is decoded.
///
/// # Errors
///
/// Returns `CorruptOrUnreadable` if the header is missing or malformed.
pub async fn read_dimensions(path: PathBuf) -> Result<(u32, u32), PikselError> {
    let display = path.display().to_string();
    let result = tokio::task::spawn_blocking(move || {
        let reader = image::ImageReader::open(&path)
            .map_err(|e| e.to_string())?
            .with_guessed_format()
            .map_err(|e| e.to_string())?;
        if reader.format().is_none() {
            return Err("unrecognised image header".to_string());
        }
        reader.into_dimensions().map_err(|e| e.to_string())
    })
    .await;

    match result {
        Ok(Ok(dims)) => Ok(dims),
        Ok(Err(reason)) => Err(PikselError::CorruptOrUnreadable(format!("{display}: {reason}"))),
        Err(join) => Err(PikselError::CorruptOrUnreadable(format!("{display}: {join}"))),
    }
}
