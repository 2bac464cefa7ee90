//! Result normalization
//!
//! Pure mapping from a [`PredictionResult`] to a presentation-ready view. No
//! state, no I/O. Unknown denomination codes map to the neutral style.

use bva_common::api::{Detection, PredictionResult};
use bva_common::denomination::CURRENCY_PREFIX;
use bva_common::{Denomination, DenominationStyle};
use serde::Serialize;

/// One detection, ready to display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionView {
    /// Denomination code rendered with the currency prefix ("S/ 20")
    pub label: String,
    pub style: DenominationStyle,
    /// Percentage with one decimal ("97.0%")
    pub confidence: String,
    /// `[x0, y0, x1, y1]` with one decimal per coordinate
    pub bbox: String,
    pub denomination: Option<Denomination>,
}

/// Presentation view of a prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultView {
    /// Nothing recognized: render a "no banknotes detected" state
    NoDetections { text: String },

    Detected {
        text: String,
        /// In backend order
        entries: Vec<DetectionView>,
        /// "N banknote(s) detected"
        summary: String,
        /// Backend total, rendered ("S/ 30")
        total_label: String,
        total_amount: f64,
        /// Count per known denomination, ascending by value
        breakdown: Vec<(Denomination, usize)>,
    },
}

impl ResultView {
    pub fn is_empty(&self) -> bool {
        matches!(self, ResultView::NoDetections { .. })
    }
}

/// Map a prediction result to its view
pub fn normalize(result: &PredictionResult) -> ResultView {
    if result.detections.is_empty() {
        return ResultView::NoDetections {
            text: result.text.clone(),
        };
    }

    let entries: Vec<DetectionView> = result.detections.iter().map(normalize_detection).collect();

    let breakdown = Denomination::ALL
        .into_iter()
        .map(|d| (d, entries.iter().filter(|e| e.denomination == Some(d)).count()))
        .filter(|(_, count)| *count > 0)
        .collect();

    ResultView::Detected {
        text: result.text.clone(),
        summary: format!("{} banknote(s) detected", entries.len()),
        entries,
        total_label: format_amount(result.total_amount),
        total_amount: result.total_amount,
        breakdown,
    }
}

pub fn normalize_detection(detection: &Detection) -> DetectionView {
    DetectionView {
        label: denomination_label(&detection.class),
        style: DenominationStyle::for_code(&detection.class),
        confidence: format_confidence(detection.confidence),
        bbox: format_bbox(&detection.bbox),
        denomination: Denomination::from_code(&detection.class),
    }
}

/// "S20" → "S/ 20"; codes without the leading "S" are shown as-is
pub fn denomination_label(code: &str) -> String {
    match code.strip_prefix('S') {
        Some(rest) if !rest.is_empty() => format!("{} {}", CURRENCY_PREFIX, rest),
        _ => code.to_string(),
    }
}

/// Confidence in [0, 1] as a percentage rounded to one decimal
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.1}%", confidence * 100.0)
}

/// Total with currency prefix; whole amounts render without decimals
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 && amount.is_finite() {
        format!("{} {}", CURRENCY_PREFIX, amount as i64)
    } else {
        format!("{} {:.2}", CURRENCY_PREFIX, amount)
    }
}

pub fn format_bbox(bbox: &[f64; 4]) -> String {
    format!(
        "[{:.1}, {:.1}, {:.1}, {:.1}]",
        bbox[0], bbox[1], bbox[2], bbox[3]
    )
}
