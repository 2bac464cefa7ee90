//! Recognition service availability

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tri-state availability of the recognition service
///
/// Starts as `Unknown` until the first probe completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    #[default]
    Unknown,
    Up,
    Down,
}

impl HealthStatus {
    /// Classify an HTTP status code: any 2xx is `Up`, everything else `Down`
    pub fn from_http_status(code: u16) -> Self {
        if (200..300).contains(&code) {
            HealthStatus::Up
        } else {
            HealthStatus::Down
        }
    }

    pub fn is_up(self) -> bool {
        self == HealthStatus::Up
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Unknown => write!(f, "unknown"),
            HealthStatus::Up => write!(f, "up"),
            HealthStatus::Down => write!(f, "down"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unknown() {
        assert_eq!(HealthStatus::default(), HealthStatus::Unknown);
    }

    #[test]
    fn test_from_http_status() {
        assert_eq!(HealthStatus::from_http_status(200), HealthStatus::Up);
        assert_eq!(HealthStatus::from_http_status(204), HealthStatus::Up);
        assert_eq!(HealthStatus::from_http_status(301), HealthStatus::Down);
        assert_eq!(HealthStatus::from_http_status(401), HealthStatus::Down);
        assert_eq!(HealthStatus::from_http_status(503), HealthStatus::Down);
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&HealthStatus::Up).unwrap(), "\"up\"");
        let parsed: HealthStatus = serde_json::from_str("\"down\"").unwrap();
        assert_eq!(parsed, HealthStatus::Down);
    }
}
