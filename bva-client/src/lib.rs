//! # BVA Client Library (bva-client)
//!
//! Client-side recognition pipeline for the banknote voice assistant.
//!
//! **Purpose:** Acquire a banknote image (camera or file), submit it to the
//! recognition service, and present the result both visually and as spoken
//! audio.
//!
//! **Architecture:** One cycle flows
//! `media → session → api::prediction → session → {results, playback}`.
//! `api::health` runs independently and only publishes a status. All
//! process-wide state hangs off [`AppContext`].

pub mod api;
pub mod error;
pub mod media;
pub mod playback;
pub mod results;
pub mod session;
pub mod state;

pub use error::{AcquisitionError, ErrorInfo, ErrorKind, PlaybackError, PredictionError, SessionError};
pub use session::{RequestToken, Resolution, SessionOrchestrator, SessionState};
pub use state::AppContext;
