//! Prediction client
//!
//! One authenticated multipart POST per submission, single attempt, no retry.
//!
//! Failure translation:
//! - no response at all → [`PredictionError::Connection`] with a generic message
//! - 401/403, or no credential configured → [`PredictionError::Auth`]
//! - any other non-success → [`PredictionError::Server`]
//!
//! For responses, the message comes from the structured body (`detail`, then
//! `message`), falling back to a generic server-error message.

use async_trait::async_trait;
use bva_common::api::{
    ErrorBody, PredictionResult, FILE_FIELD, INCLUDE_BASE64_FIELD, PREDICT_PATH,
};
use bva_common::ClientConfig;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;

use crate::error::PredictionError;
use crate::media::CandidateImage;

pub const SERVER_ERROR_MESSAGE: &str = "Server error";
pub const CONNECTION_ERROR_MESSAGE: &str = "Could not connect to the server";
pub const MISSING_CREDENTIAL_MESSAGE: &str = "API credential is not configured";
const INVALID_RESPONSE_MESSAGE: &str = "Invalid response from server";

/// Submits candidate images for recognition
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Submit one image; resolves to the backend's result or a typed failure
    async fn submit(&self, image: &CandidateImage) -> Result<PredictionResult, PredictionError>;
}

/// HTTP recognizer backed by the prediction endpoint
pub struct PredictionClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl PredictionClient {
    pub fn new(config: &ClientConfig) -> Result<Self, PredictionError> {
        let http_client = super::build_http_client(config)?;
        Ok(Self::with_http_client(http_client, config))
    }

    /// Reuse an existing HTTP client (shared with the health monitor)
    pub fn with_http_client(http_client: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            http_client,
            endpoint: config.endpoint(PREDICT_PATH),
            api_key: config.api_key.clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Recognizer for PredictionClient {
    async fn submit(&self, image: &CandidateImage) -> Result<PredictionResult, PredictionError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PredictionError::Auth(MISSING_CREDENTIAL_MESSAGE.to_string()))?;

        let part = Part::bytes(image.data().to_vec())
            .file_name(image.file_name().to_string())
            .mime_str(image.mime())
            .map_err(|e| PredictionError::Server {
                status: None,
                message: format!("Invalid image type {:?}: {}", image.mime(), e),
            })?;
        let form = Form::new()
            .part(FILE_FIELD, part)
            .text(INCLUDE_BASE64_FIELD, "true");

        tracing::debug!(
            endpoint = %self.endpoint,
            source = %image.source(),
            bytes = image.len(),
            "Submitting image for prediction"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            // Flag goes in both the query string and the form
            .query(&[(INCLUDE_BASE64_FIELD, "true")])
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Prediction request failed before a response");
                PredictionError::Connection(CONNECTION_ERROR_MESSAGE.to_string())
            })?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = classify_failure(status, &body);
            tracing::warn!(status = status.as_u16(), error = %error, "Prediction rejected");
            return Err(error);
        }

        let result: PredictionResult = response.json().await.map_err(|e| {
            tracing::warn!(error = %e, "Prediction response could not be parsed");
            PredictionError::Server {
                status: Some(status.as_u16()),
                message: INVALID_RESPONSE_MESSAGE.to_string(),
            }
        })?;

        tracing::info!(
            ok = result.ok,
            detections = result.detections.len(),
            total_amount = result.total_amount,
            "Prediction received"
        );

        Ok(result)
    }
}

/// Translate a non-success response into a typed failure
pub fn classify_failure(status: StatusCode, body: &str) -> PredictionError {
    let message = extract_error_message(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PredictionError::Auth(message),
        _ => PredictionError::Server {
            status: Some(status.as_u16()),
            message,
        },
    }
}

/// Message from a structured error body, or the generic server-error message
pub fn extract_error_message(body: &str) -> String {
    ErrorBody::parse(body)
        .and_then(|b| b.message())
        .unwrap_or_else(|| SERVER_ERROR_MESSAGE.to_string())
}
