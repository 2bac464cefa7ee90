//! Service health monitor
//!
//! A single round-trip probe of the health endpoint. Any 2xx is `Up`; any other
//! status or a transport failure is `Down`. The result is published to a watch
//! channel the presentation layer reads; it never blocks or aborts predictions.
//!
//! Probing happens once at startup. Periodic re-probing is opt-in via
//! [`HealthMonitor::spawn_polling`] (driven by `health_poll_interval`).

use bva_common::api::HEALTH_PATH;
use bva_common::events::{EventBus, SessionEvent};
use bva_common::{ClientConfig, HealthStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Probes the recognition service and owns the process-wide [`HealthStatus`]
pub struct HealthMonitor {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    status_tx: watch::Sender<HealthStatus>,
    events: EventBus,
}

impl HealthMonitor {
    pub fn new(http_client: reqwest::Client, config: &ClientConfig, events: EventBus) -> Self {
        let (status_tx, _) = watch::channel(HealthStatus::Unknown);
        Self {
            http_client,
            endpoint: config.endpoint(HEALTH_PATH),
            api_key: config.api_key.clone(),
            status_tx,
            events,
        }
    }

    /// Probe once and publish the result
    pub async fn probe(&self) -> HealthStatus {
        let mut request = self.http_client.get(&self.endpoint);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let status = match request.send().await {
            Ok(response) => HealthStatus::from_http_status(response.status().as_u16()),
            Err(e) => {
                tracing::debug!(endpoint = %self.endpoint, error = %e, "Health probe failed");
                HealthStatus::Down
            }
        };

        self.publish(status);
        status
    }

    /// Last published status (`Unknown` before the first probe)
    pub fn status(&self) -> HealthStatus {
        *self.status_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<HealthStatus> {
        self.status_tx.subscribe()
    }

    /// Re-probe every `interval` until `cancel` fires
    ///
    /// The first probe happens one full interval after spawning.
    pub fn spawn_polling(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval() fires immediately; the startup probe already covers that
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("Health polling stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        monitor.probe().await;
                    }
                }
            }
        })
    }

    fn publish(&self, status: HealthStatus) {
        let old_status = self.status_tx.send_replace(status);
        if old_status != status {
            tracing::info!(%old_status, new_status = %status, "Recognition service status changed");
            self.events.emit_lossy(SessionEvent::HealthChanged {
                old_status,
                new_status: status,
                timestamp: chrono::Utc::now(),
            });
        }
    }
}
