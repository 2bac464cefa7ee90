//! Event types for the BVA event system
//!
//! Provides the session event definitions and the EventBus that carries them
//! to presentation-layer subscribers.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

use crate::health::HealthStatus;

/// Phase of a recognition session, without the attached payload
///
/// Mirrors the session state machine: `Idle → Acquiring → Submitting →
/// Success | Failed`, with `clear` returning to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Idle,
    Acquiring,
    Submitting,
    Success,
    Failed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "idle"),
            SessionPhase::Acquiring => write!(f, "acquiring"),
            SessionPhase::Submitting => write!(f, "submitting"),
            SessionPhase::Success => write!(f, "success"),
            SessionPhase::Failed => write!(f, "failed"),
        }
    }
}

/// BVA event types
///
/// Events are broadcast via EventBus and can be serialized for a UI bridge.
/// All events use this central enum for exhaustive matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// Session moved between phases
    SessionStateChanged {
        old_phase: SessionPhase,
        new_phase: SessionPhase,
        /// Request token the transition belongs to, if any
        request: Option<u64>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A prediction resolved after a newer request superseded it
    StaleResultDiscarded {
        /// Token of the discarded resolution
        request: u64,
        /// Token of the request that currently owns the session
        current: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Recognition service availability changed
    HealthChanged {
        old_status: HealthStatus,
        new_status: HealthStatus,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Audio feedback playback state changed
    AudioStateChanged {
        source_url: Option<String>,
        is_loading: bool,
        is_playing: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl SessionEvent {
    /// Event type name (matches the serde tag)
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::SessionStateChanged { .. } => "SessionStateChanged",
            SessionEvent::StaleResultDiscarded { .. } => "StaleResultDiscarded",
            SessionEvent::HealthChanged { .. } => "HealthChanged",
            SessionEvent::AudioStateChanged { .. } => "AudioStateChanged",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for application-wide events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use bva_common::events::{EventBus, SessionEvent, SessionPhase};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(SessionEvent::SessionStateChanged {
///     old_phase: SessionPhase::Idle,
///     new_phase: SessionPhase::Submitting,
///     request: Some(1),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: SessionEvent,
    ) -> Result<usize, broadcast::error::SendError<SessionEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
