//! Recognition service contract
//!
//! Wire types and endpoint paths of the banknote recognition backend, shared by
//! the client library and by anything that needs to speak the same protocol
//! (fake backends in tests included).
//!
//! # Design Principle
//!
//! This module contains ONLY serde types and pure helpers. The HTTP transport
//! lives in `bva-client`.

pub mod types;

pub use types::{Detection, ErrorBody, PredictionResult};

/// Prediction endpoint (multipart POST)
pub const PREDICT_PATH: &str = "/api/v1/predict";

/// Health endpoint (GET)
pub const HEALTH_PATH: &str = "/api/v1/health";

/// Multipart field carrying the binary image
pub const FILE_FIELD: &str = "file";

/// Multipart field (and query parameter) requesting inline base64 audio
pub const INCLUDE_BASE64_FIELD: &str = "include_base64";
