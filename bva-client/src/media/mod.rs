//! Image acquisition
//!
//! Two acquisition paths converge on one output, the [`CandidateImage`]:
//! - [`camera`]: live stream → still frame → JPEG
//! - [`upload`]: drag-and-drop or file picker, validated by MIME type
//!
//! [`preview`] holds the locally-resolvable preview handles the session
//! orchestrator mints for each candidate.

pub mod camera;
pub mod preview;
pub mod upload;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use camera::{CameraCapture, CameraState, MediaDevices, VideoConstraints, VideoFrame, VideoStream};
pub use preview::{PreviewRef, PreviewRegistry};
pub use upload::{DropOrigin, SelectedFile};

/// Which acquisition path produced an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSource {
    Camera,
    Upload,
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Camera => write!(f, "camera"),
            ImageSource::Upload => write!(f, "upload"),
        }
    }
}

/// A single acquired image awaiting submission
///
/// The payload is reference-counted, so cloning a candidate is cheap.
#[derive(Debug, Clone)]
pub struct CandidateImage {
    data: Bytes,
    mime: String,
    file_name: String,
    source: ImageSource,
}

impl CandidateImage {
    pub fn new(
        data: impl Into<Bytes>,
        mime: impl Into<String>,
        file_name: impl Into<String>,
        source: ImageSource,
    ) -> Self {
        Self {
            data: data.into(),
            mime: mime.into(),
            file_name: file_name.into(),
            source,
        }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn source(&self) -> ImageSource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Whether a MIME type is acceptable as an image
pub fn is_image_mime(mime: &str) -> bool {
    mime.trim().to_ascii_lowercase().starts_with("image/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image_mime() {
        assert!(is_image_mime("image/jpeg"));
        assert!(is_image_mime("image/png"));
        assert!(is_image_mime("IMAGE/WEBP"));
        assert!(!is_image_mime("application/pdf"));
        assert!(!is_image_mime("text/plain"));
        assert!(!is_image_mime(""));
        assert!(!is_image_mime("video/image"));
    }

    #[test]
    fn test_candidate_accessors() {
        let candidate = CandidateImage::new(vec![1u8, 2, 3], "image/png", "a.png", ImageSource::Upload);
        assert_eq!(candidate.len(), 3);
        assert!(!candidate.is_empty());
        assert_eq!(candidate.mime(), "image/png");
        assert_eq!(candidate.file_name(), "a.png");
        assert_eq!(candidate.source(), ImageSource::Upload);

        // Clones share the payload
        let clone = candidate.clone();
        assert_eq!(clone.data().as_ptr(), candidate.data().as_ptr());
    }
}
