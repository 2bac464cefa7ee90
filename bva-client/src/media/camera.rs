//! Camera capture
//!
//! State machine: `Closed → Requesting → Active → Closed`.
//!
//! The device stream is released (all tracks stopped) on every exit from
//! `Active`: after a successful capture, on explicit cancel and on teardown
//! (drop). A denied or failed open is terminal for the camera path only; the
//! upload path is unaffected.

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::{CandidateImage, ImageSource};
use crate::error::AcquisitionError;

pub const IDEAL_WIDTH: u32 = 1280;
pub const IDEAL_HEIGHT: u32 = 720;
pub const JPEG_QUALITY: u8 = 80;
pub const CAPTURE_MIME: &str = "image/jpeg";

pub const PERMISSION_ERROR_MESSAGE: &str =
    "Could not access the camera. Make sure the required permissions were granted.";

/// Errors reported by a camera device implementation
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device unavailable: {0}")]
    Unavailable(String),

    #[error("No frame available")]
    NoFrame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    /// Rear camera on phones
    Environment,
    User,
}

/// Requested stream properties
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoConstraints {
    pub facing_mode: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            facing_mode: FacingMode::Environment,
            ideal_width: IDEAL_WIDTH,
            ideal_height: IDEAL_HEIGHT,
        }
    }
}

/// One raw frame, packed RGB8
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

/// Platform camera access
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Request a live video stream; suspends until the user grants or denies access
    async fn open_video(
        &self,
        constraints: &VideoConstraints,
    ) -> Result<Box<dyn VideoStream>, DeviceError>;
}

/// A live video stream holding the camera device
///
/// Implementations should also stop their tracks when dropped.
pub trait VideoStream: Send {
    /// Current frame of the live preview
    fn grab_frame(&mut self) -> Result<VideoFrame, DeviceError>;

    /// Stop every track, releasing the hardware
    fn stop_tracks(&mut self);

    /// Number of tracks still running
    fn live_tracks(&self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraState {
    Closed,
    Requesting,
    Active,
}

impl fmt::Display for CameraState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraState::Closed => write!(f, "closed"),
            CameraState::Requesting => write!(f, "requesting"),
            CameraState::Active => write!(f, "active"),
        }
    }
}

/// Capture surface: owns the device stream while `Active`
pub struct CameraCapture {
    devices: Arc<dyn MediaDevices>,
    constraints: VideoConstraints,
    jpeg_quality: u8,
    state: CameraState,
    stream: Option<Box<dyn VideoStream>>,
}

impl CameraCapture {
    pub fn new(devices: Arc<dyn MediaDevices>) -> Self {
        Self {
            devices,
            constraints: VideoConstraints::default(),
            jpeg_quality: JPEG_QUALITY,
            state: CameraState::Closed,
            stream: None,
        }
    }

    pub fn with_constraints(mut self, constraints: VideoConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    /// Tracks held by this capture surface (0 unless `Active`)
    pub fn live_tracks(&self) -> usize {
        self.stream.as_ref().map(|s| s.live_tracks()).unwrap_or(0)
    }

    /// Open the capture surface and request the camera
    ///
    /// A no-op when already `Active`. On denial or device failure the camera
    /// returns to `Closed` and a user-facing permission error is reported.
    pub async fn open(&mut self) -> Result<(), AcquisitionError> {
        if self.state == CameraState::Active {
            return Ok(());
        }

        self.state = CameraState::Requesting;
        tracing::debug!(
            width = self.constraints.ideal_width,
            height = self.constraints.ideal_height,
            "Requesting camera stream"
        );

        match self.devices.open_video(&self.constraints).await {
            Ok(stream) => {
                tracing::info!(tracks = stream.live_tracks(), "Camera stream active");
                self.stream = Some(stream);
                self.state = CameraState::Active;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Camera access failed");
                self.state = CameraState::Closed;
                Err(AcquisitionError::Permission(PERMISSION_ERROR_MESSAGE.to_string()))
            }
        }
    }

    /// Capture the current frame as a JPEG candidate and close the camera
    ///
    /// If the frame cannot be read or encoded the camera stays `Active` so the
    /// user can try again.
    pub fn capture(&mut self) -> Result<CandidateImage, AcquisitionError> {
        let stream = match (self.state, self.stream.as_mut()) {
            (CameraState::Active, Some(stream)) => stream,
            _ => {
                return Err(AcquisitionError::InvalidState(format!(
                    "capture requires an active camera (camera is {})",
                    self.state
                )))
            }
        };

        let frame = stream
            .grab_frame()
            .map_err(|e| AcquisitionError::Device(e.to_string()))?;
        let jpeg = encode_jpeg(&frame, self.jpeg_quality)?;

        let candidate = CandidateImage::new(
            jpeg,
            CAPTURE_MIME,
            capture_file_name(chrono::Utc::now()),
            ImageSource::Camera,
        );
        tracing::info!(
            width = frame.width,
            height = frame.height,
            bytes = candidate.len(),
            "Captured camera frame"
        );

        self.release("capture");
        Ok(candidate)
    }

    /// Close the capture surface without capturing
    pub fn cancel(&mut self) {
        self.release("cancel");
    }

    fn release(&mut self, reason: &'static str) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop_tracks();
            tracing::debug!(reason, remaining = stream.live_tracks(), "Camera stream released");
        }
        self.state = CameraState::Closed;
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        self.release("teardown");
    }
}

/// Encode a raw RGB frame as JPEG
pub fn encode_jpeg(frame: &VideoFrame, quality: u8) -> Result<Vec<u8>, AcquisitionError> {
    let expected = frame.width as usize * frame.height as usize * 3;
    if frame.width == 0 || frame.height == 0 || frame.rgb.len() != expected {
        return Err(AcquisitionError::Encode(format!(
            "frame {}x{} has {} bytes, expected {}",
            frame.width,
            frame.height,
            frame.rgb.len(),
            expected
        )));
    }

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode(&frame.rgb, frame.width, frame.height, ExtendedColorType::Rgb8)
        .map_err(|e| AcquisitionError::Encode(e.to_string()))?;
    Ok(out)
}

/// `camera-capture-<unix-millis>.jpg`
pub fn capture_file_name(at: chrono::DateTime<chrono::Utc>) -> String {
    format!("camera-capture-{}.jpg", at.timestamp_millis())
}
