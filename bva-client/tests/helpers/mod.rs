//! Test helpers for bva-client integration tests
//!
//! - FakeBackend: in-process recognition service (axum) on an ephemeral port
//! - sample payloads and config builders

#![allow(dead_code)]

use axum::extract::{Multipart, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use bva_common::api::{HEALTH_PATH, PREDICT_PATH};
use bva_common::ClientConfig;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const TEST_API_KEY: &str = "test-key";

/// Smallest byte sequence `infer` recognizes as JPEG
pub const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

/// Body of the single-S20 success scenario
pub fn s20_success_body() -> String {
    serde_json::json!({
        "ok": true,
        "text": "Detectado S/ 20",
        "audio_url": "https://x/a.mp3",
        "detections": [
            {"class": "S20", "confidence": 0.97, "bbox": [1, 2, 3, 4]}
        ],
        "total_amount": 20
    })
    .to_string()
}

/// How the fake backend answers
#[derive(Debug, Clone)]
pub struct Behavior {
    pub predict_status: StatusCode,
    pub predict_body: String,
    pub predict_content_type: &'static str,
    pub health_status: StatusCode,
}

impl Behavior {
    pub fn success(body: String) -> Self {
        Self {
            predict_status: StatusCode::OK,
            predict_body: body,
            predict_content_type: "application/json",
            health_status: StatusCode::OK,
        }
    }

    pub fn failure(status: StatusCode, body: &str) -> Self {
        Self {
            predict_status: status,
            predict_body: body.to_string(),
            ..Self::success(String::new())
        }
    }

    pub fn unstructured(status: StatusCode, body: &str) -> Self {
        Self {
            predict_content_type: "text/html",
            ..Self::failure(status, body)
        }
    }

    pub fn health(status: StatusCode) -> Self {
        Self {
            health_status: status,
            ..Self::success(s20_success_body())
        }
    }
}

/// One multipart field as received
#[derive(Debug, Clone)]
pub struct RecordedField {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl RecordedField {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// One prediction request as received
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub authorization: Option<String>,
    pub query: Option<String>,
    pub fields: Vec<RecordedField>,
}

impl RecordedRequest {
    pub fn field(&self, name: &str) -> Option<&RecordedField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Clone)]
struct BackendState {
    behavior: Arc<Behavior>,
    predict_calls: Arc<AtomicUsize>,
    health_calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// In-process recognition service
pub struct FakeBackend {
    pub base_url: String,
    state: BackendState,
    server: JoinHandle<()>,
}

impl FakeBackend {
    pub async fn start(behavior: Behavior) -> Self {
        let state = BackendState {
            behavior: Arc::new(behavior),
            predict_calls: Arc::new(AtomicUsize::new(0)),
            health_calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        };

        let app = Router::new()
            .route(PREDICT_PATH, post(predict))
            .route(HEALTH_PATH, get(health))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            server,
        }
    }

    /// Client config pointing at this backend
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            api_url: self.base_url.clone(),
            api_key: Some(TEST_API_KEY.to_string()),
            request_timeout: Duration::from_secs(5),
            ..ClientConfig::default()
        }
    }

    pub fn predict_calls(&self) -> usize {
        self.state.predict_calls.load(Ordering::SeqCst)
    }

    pub fn health_calls(&self) -> usize {
        self.state.health_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Base URL nothing listens on
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn predict(
    State(state): State<BackendState>,
    headers: HeaderMap,
    uri: Uri,
    mut multipart: Multipart,
) -> Response {
    state.predict_calls.fetch_add(1, Ordering::SeqCst);

    let mut fields = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        fields.push(RecordedField {
            name,
            file_name,
            content_type,
            data,
        });
    }

    state.requests.lock().unwrap().push(RecordedRequest {
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        query: uri.query().map(str::to_string),
        fields,
    });

    let behavior = &state.behavior;
    (
        behavior.predict_status,
        [(header::CONTENT_TYPE, behavior.predict_content_type)],
        behavior.predict_body.clone(),
    )
        .into_response()
}

async fn health(State(state): State<BackendState>) -> StatusCode {
    state.health_calls.fetch_add(1, Ordering::SeqCst);
    state.behavior.health_status
}
