//! Banknote denomination catalog
//!
//! Maps the recognizer's class codes to monetary values and display styles.
//! Lookups by code are total: unknown codes yield `None` (or the neutral
//! style), never a panic.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency prefix used for labels and totals
pub const CURRENCY_PREFIX: &str = "S/";

/// Known banknote classes returned by the recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Denomination {
    S10,
    S20,
    S50,
    S100,
    S200,
}

impl Denomination {
    /// All denominations in ascending value order
    pub const ALL: [Denomination; 5] = [
        Denomination::S10,
        Denomination::S20,
        Denomination::S50,
        Denomination::S100,
        Denomination::S200,
    ];

    /// Look up a denomination by its class code (exact match)
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.code() == code)
    }

    /// Class code as sent by the recognizer
    pub fn code(self) -> &'static str {
        match self {
            Denomination::S10 => "S10",
            Denomination::S20 => "S20",
            Denomination::S50 => "S50",
            Denomination::S100 => "S100",
            Denomination::S200 => "S200",
        }
    }

    /// Face value in currency units
    pub fn value(self) -> u32 {
        match self {
            Denomination::S10 => 10,
            Denomination::S20 => 20,
            Denomination::S50 => 50,
            Denomination::S100 => 100,
            Denomination::S200 => 200,
        }
    }

    /// Display style keyed by denomination
    pub fn style(self) -> DenominationStyle {
        match self {
            Denomination::S10 => DenominationStyle::Green,
            Denomination::S20 => DenominationStyle::Blue,
            Denomination::S50 => DenominationStyle::Purple,
            Denomination::S100 => DenominationStyle::Yellow,
            Denomination::S200 => DenominationStyle::Red,
        }
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", CURRENCY_PREFIX, self.value())
    }
}

/// Categorical color class for a detection badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DenominationStyle {
    Green,
    Blue,
    Purple,
    Yellow,
    Red,
    /// Fallback for unrecognized class codes
    Neutral,
}

impl DenominationStyle {
    /// Style for a raw class code; unknown codes map to [`DenominationStyle::Neutral`]
    pub fn for_code(code: &str) -> Self {
        Denomination::from_code(code)
            .map(Denomination::style)
            .unwrap_or(DenominationStyle::Neutral)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DenominationStyle::Green => "green",
            DenominationStyle::Blue => "blue",
            DenominationStyle::Purple => "purple",
            DenominationStyle::Yellow => "yellow",
            DenominationStyle::Red => "red",
            DenominationStyle::Neutral => "neutral",
        }
    }
}

impl fmt::Display for DenominationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
