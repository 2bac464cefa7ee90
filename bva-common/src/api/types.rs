//! Recognition service request/response types
//!
//! Field names follow the backend's JSON contract (`snake_case`). Successful
//! responses are carried through unmodified; presentation shaping happens in
//! the client's result normalizer.

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ========================================
// Prediction Types
// ========================================

/// One recognized banknote instance
///
/// Immutable once received. The order of detections in a [`PredictionResult`]
/// is the order the backend returned them in, which is not sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Denomination code (e.g. "S20")
    pub class: String,

    /// Recognizer confidence in [0, 1]
    pub confidence: f64,

    /// `[x0, y0, x1, y1]` in source-image pixel coordinates
    pub bbox: [f64; 4],

    /// Raw recognizer record, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_pred: Option<Value>,
}

/// Successful prediction response
///
/// # Examples
///
/// ```
/// use bva_common::api::PredictionResult;
///
/// let body = r#"{
///     "ok": true,
///     "text": "Detectado S/ 20",
///     "audio_url": "https://x/a.mp3",
///     "detections": [{"class": "S20", "confidence": 0.97, "bbox": [1, 2, 3, 4]}],
///     "total_amount": 20
/// }"#;
///
/// let result: PredictionResult = serde_json::from_str(body).unwrap();
/// assert!(result.has_audio());
/// assert_eq!(result.total_amount, 20.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub ok: bool,

    /// Human-readable summary (also the text that was spoken into the audio)
    pub text: String,

    /// Fetchable URL of the spoken summary
    #[serde(default)]
    pub audio_url: String,

    /// Inline audio, present when requested and the backend could encode it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,

    #[serde(default)]
    pub detections: Vec<Detection>,

    /// Sum of denomination values as computed by the backend.
    ///
    /// Trusted as-is: it may legitimately differ from what the detections list
    /// alone would imply (server-side filtering), so it is never recomputed.
    #[serde(default)]
    pub total_amount: f64,
}

impl PredictionResult {
    /// Whether the result carries a non-empty audio URL
    pub fn has_audio(&self) -> bool {
        !self.audio_url.trim().is_empty()
    }

    /// Decode the inline audio payload, if any
    ///
    /// Returns `None` when the backend did not include inline audio (or sent
    /// an empty string).
    pub fn decode_inline_audio(&self) -> Option<Result<Vec<u8>, base64::DecodeError>> {
        self.audio_base64
            .as_deref()
            .filter(|encoded| !encoded.is_empty())
            .map(|encoded| general_purpose::STANDARD.decode(encoded))
    }
}

// ========================================
// Error Response Types
// ========================================

/// Structured error body returned on non-success responses
///
/// The backend reports a human-readable `detail` (preferred) or `message`.
/// Either may also be a non-string JSON value (validation errors report a
/// list), in which case it is skipped.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,

    #[serde(default)]
    pub message: Option<Value>,
}

impl ErrorBody {
    /// Human-readable message: `detail` first, then `message`
    pub fn message(&self) -> Option<String> {
        [&self.detail, &self.message]
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// Parse a raw response body; `None` if it is not a JSON object
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }
}
