//! Application context
//!
//! The single initialization point for process-wide client state. Session and
//! health state are independent objects, each with its own owner:
//!
//! - [`SessionOrchestrator`]: session state, preview handles, audio feedback
//! - [`HealthMonitor`]: recognition service availability
//!
//! Both publish through watch channels and share one [`EventBus`]. Nothing
//! here is global; the presentation layer receives the context explicitly.

use bva_common::events::EventBus;
use bva_common::ClientConfig;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::{build_http_client, HealthMonitor, PredictionClient, Recognizer};
use crate::error::PredictionError;
use crate::media::PreviewRegistry;
use crate::playback::MediaElement;
use crate::session::SessionOrchestrator;

/// Event bus capacity
const EVENT_CAPACITY: usize = 100;

pub struct AppContext {
    pub config: ClientConfig,
    pub events: EventBus,
    pub previews: PreviewRegistry,
    pub health: Arc<HealthMonitor>,
    pub session: Arc<SessionOrchestrator>,
}

impl AppContext {
    /// Build the context with the HTTP recognizer
    pub fn new(config: ClientConfig, element: Box<dyn MediaElement>) -> Result<Self, PredictionError> {
        let http_client = build_http_client(&config)?;
        let recognizer = Arc::new(PredictionClient::with_http_client(http_client.clone(), &config));
        Ok(Self::assemble(config, http_client, recognizer, element))
    }

    /// Build the context around a caller-supplied recognizer
    pub fn with_recognizer(
        config: ClientConfig,
        recognizer: Arc<dyn Recognizer>,
        element: Box<dyn MediaElement>,
    ) -> Result<Self, PredictionError> {
        let http_client = build_http_client(&config)?;
        Ok(Self::assemble(config, http_client, recognizer, element))
    }

    fn assemble(
        config: ClientConfig,
        http_client: reqwest::Client,
        recognizer: Arc<dyn Recognizer>,
        element: Box<dyn MediaElement>,
    ) -> Self {
        let events = EventBus::new(EVENT_CAPACITY);
        let previews = PreviewRegistry::new();
        let health = Arc::new(HealthMonitor::new(http_client, &config, events.clone()));
        let session = Arc::new(SessionOrchestrator::new(
            recognizer,
            previews.clone(),
            element,
            config.autoplay,
            events.clone(),
        ));

        tracing::debug!(
            api_url = %config.api_url,
            autoplay = config.autoplay,
            has_api_key = config.api_key.is_some(),
            "Application context initialized"
        );

        Self {
            config,
            events,
            previews,
            health,
            session,
        }
    }

    /// Check service health in the background, then keep polling if an
    /// interval is configured
    ///
    /// Returns immediately; the task ends when `cancel` fires, or after the
    /// startup check when polling is off. Session work never waits on it.
    pub fn start_health(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let health = Arc::clone(&self.health);
        let poll_interval = self.config.health_poll_interval;

        tokio::spawn(async move {
            tokio::select! {
                status = health.probe() => {
                    tracing::info!(%status, "Startup health check finished");
                }
                _ = cancel.cancelled() => {
                    tracing::debug!("Startup health check cancelled");
                    return;
                }
            }

            if let Some(interval) = poll_interval {
                tracing::info!(interval_secs = interval.as_secs(), "Health polling enabled");
                if let Err(e) = health.spawn_polling(interval, cancel).await {
                    tracing::warn!(error = %e, "Health polling task failed");
                }
            }
        })
    }
}
