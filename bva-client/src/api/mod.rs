//! Recognition service clients
//!
//! - [`prediction`]: authenticated multipart submission of a candidate image
//! - [`health`]: availability probe, independent of predictions
//!
//! Both share one `reqwest::Client` built from the resolved configuration.

pub mod health;
pub mod prediction;

use bva_common::ClientConfig;

use crate::error::PredictionError;

pub use health::HealthMonitor;
pub use prediction::{PredictionClient, Recognizer};

const USER_AGENT: &str = concat!("bva/", env!("CARGO_PKG_VERSION"));

/// Build the shared HTTP client
pub fn build_http_client(config: &ClientConfig) -> Result<reqwest::Client, PredictionError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| PredictionError::Connection(e.to_string()))
}
