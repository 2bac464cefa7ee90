//! File upload intake
//!
//! Accepts one file from drag-and-drop or the file picker. The MIME type must
//! begin with `image/`; anything else is rejected synchronously and never
//! reaches the prediction client.

use bytes::Bytes;
use std::path::Path;

use super::{is_image_mime, CandidateImage, ImageSource};
use crate::error::AcquisitionError;

pub const INVALID_FILE_MESSAGE: &str = "Please select a valid image file";

/// Where a selection came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOrigin {
    DragDrop,
    Picker,
}

/// A user-selected file with its declared MIME type
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub mime: String,
    pub data: Bytes,
}

/// Validate a single file and wrap it as an upload candidate
pub fn accept_file(file: SelectedFile) -> Result<CandidateImage, AcquisitionError> {
    if !is_image_mime(&file.mime) {
        tracing::info!(name = %file.name, mime = %file.mime, "Rejected non-image upload");
        return Err(AcquisitionError::Validation(INVALID_FILE_MESSAGE.to_string()));
    }

    tracing::debug!(name = %file.name, mime = %file.mime, bytes = file.data.len(), "Accepted upload");
    Ok(CandidateImage::new(
        file.data,
        file.mime,
        file.name,
        ImageSource::Upload,
    ))
}

/// Accept the first file of a selection; an empty selection is an abandoned acquisition
pub fn accept_selection(
    files: Vec<SelectedFile>,
    origin: DropOrigin,
) -> Result<Option<CandidateImage>, AcquisitionError> {
    let count = files.len();
    let Some(first) = files.into_iter().next() else {
        tracing::debug!(?origin, "Empty selection");
        return Ok(None);
    };
    if count > 1 {
        tracing::debug!(?origin, count, "Multiple files selected, using the first");
    }
    accept_file(first).map(Some)
}

/// Read a file from disk, sniffing its MIME type from content
///
/// Falls back to the file extension when the content is not recognized.
pub async fn read_file(path: &Path) -> Result<SelectedFile, AcquisitionError> {
    let data = tokio::fs::read(path).await?;
    let mime = sniff_mime(&data, path);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    Ok(SelectedFile {
        name,
        mime,
        data: Bytes::from(data),
    })
}

fn sniff_mime(data: &[u8], path: &Path) -> String {
    if let Some(kind) = infer::get(data) {
        return kind.mime_type().to_string();
    }

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
    .to_string()
}
