//! Error types for bva-client
//!
//! Each pipeline boundary has its own error enum. [`ErrorKind`] is the shared
//! taxonomy the presentation layer uses to explain what kind of failure
//! occurred.

use bva_common::events::SessionPhase;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// User-facing failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Non-image file selected; never reaches the network
    Validation,
    /// Selected file could not be read
    FileAccess,
    /// Camera access denied or unavailable
    Permission,
    /// Credential missing or rejected by the backend
    Auth,
    /// Backend answered with a failure
    Server,
    /// No response received
    Connection,
    /// Autoplay or play request rejected; never changes session state
    SoftPlayback,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation error",
            ErrorKind::FileAccess => "file access error",
            ErrorKind::Permission => "permission error",
            ErrorKind::Auth => "authentication error",
            ErrorKind::Server => "server error",
            ErrorKind::Connection => "connection error",
            ErrorKind::SoftPlayback => "playback error",
        };
        f.write_str(s)
    }
}

/// Image acquisition errors (camera or upload)
///
/// Resolved at the acquisition boundary; these never enter the prediction
/// pipeline.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    /// Selected file is not an image
    #[error("{0}")]
    Validation(String),

    /// Camera permission denied or device could not be opened
    #[error("{0}")]
    Permission(String),

    /// Device misbehaved after it was opened
    #[error("Camera device error: {0}")]
    Device(String),

    /// Frame could not be encoded
    #[error("Image encode error: {0}")]
    Encode(String),

    /// Operation not valid in the current camera state
    #[error("Invalid camera state: {0}")]
    InvalidState(String),

    /// File read error
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AcquisitionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AcquisitionError::Validation(_) => ErrorKind::Validation,
            AcquisitionError::Io(_) => ErrorKind::FileAccess,
            AcquisitionError::Permission(_)
            | AcquisitionError::Device(_)
            | AcquisitionError::Encode(_)
            | AcquisitionError::InvalidState(_) => ErrorKind::Permission,
        }
    }
}

/// Prediction call failures
///
/// Auth/server failures (a response arrived) stay distinguishable from
/// connection failures (no response at all).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    /// Credential missing locally or rejected by the backend (401/403)
    #[error("{0}")]
    Auth(String),

    /// Backend returned a non-success response or an unreadable body
    #[error("{message}")]
    Server { status: Option<u16>, message: String },

    /// No response was received
    #[error("{0}")]
    Connection(String),
}

impl PredictionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PredictionError::Auth(_) => ErrorKind::Auth,
            PredictionError::Server { .. } => ErrorKind::Server,
            PredictionError::Connection(_) => ErrorKind::Connection,
        }
    }

    /// Human-readable message for the user
    pub fn message(&self) -> &str {
        match self {
            PredictionError::Auth(message)
            | PredictionError::Server { message, .. }
            | PredictionError::Connection(message) => message,
        }
    }
}

/// Session state machine misuse
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Cannot {action} while session is {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: SessionPhase,
    },
}

/// Soft playback failures; logged and absorbed, never surfaced as session errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// Platform refused to start playback without prior user interaction
    #[error("Autoplay rejected: {0}")]
    AutoplayRejected(String),

    /// Platform refused an explicit play request
    #[error("Play rejected: {0}")]
    PlayRejected(String),
}

impl PlaybackError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::SoftPlayback
    }
}

/// Terminal failure attached to a `Failed` session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&PredictionError> for ErrorInfo {
    fn from(err: &PredictionError) -> Self {
        ErrorInfo {
            kind: err.kind(),
            message: err.message().to_string(),
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
