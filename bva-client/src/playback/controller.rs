//! Audio feedback controller
//!
//! Owns the playback state of the single spoken-result source. The source
//! changes whenever a session succeeds with a non-empty audio URL.
//!
//! Rules enforced here:
//! - assigning a source always enters `Loading`, whatever was playing before
//! - each assignment starts a new source generation; events tagged with an
//!   older generation belong to a replaced source and are dropped
//! - readiness comes only from the element's `LoadedData` event
//! - autoplay is attempted once the new source is ready; a rejection is a soft
//!   failure, logged and absorbed, leaving the control `ReadyPaused`
//! - toggling while `Loading` is a no-op
//! - displayed state follows element events, never the request itself

use bva_common::events::{EventBus, SessionEvent};

use super::state::{AudioInput, AudioPlaybackState, AudioState, ElementEvent, MediaEvent};
use crate::error::PlaybackError;

/// Platform audio element
///
/// Requests are fire-and-forget; the element reports what actually happened
/// through [`ElementEvent`]s fed back into the controller. Every event must
/// carry the generation of the source it was raised for.
pub trait MediaElement: Send {
    /// Replace the current source; fetching starts as a side effect
    fn set_source(&mut self, url: &str, generation: u64);

    fn clear_source(&mut self);

    /// Request playback; acknowledged later by a `Play` event
    fn play(&mut self) -> Result<(), PlaybackError>;

    /// Request pause; acknowledged later by a `Pause` event
    fn pause(&mut self);
}

impl<T: MediaElement + ?Sized> MediaElement for Box<T> {
    fn set_source(&mut self, url: &str, generation: u64) {
        (**self).set_source(url, generation)
    }

    fn clear_source(&mut self) {
        (**self).clear_source()
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        (**self).play()
    }

    fn pause(&mut self) {
        (**self).pause()
    }
}

pub struct AudioFeedbackController<E: MediaElement> {
    element: E,
    state: AudioState,
    /// Generation of the current source (0 = none assigned yet)
    generation: u64,
    autoplay: bool,
    autoplay_pending: bool,
    events: Option<EventBus>,
}

impl<E: MediaElement> AudioFeedbackController<E> {
    pub fn new(element: E, autoplay: bool) -> Self {
        Self {
            element,
            state: AudioState::NoSource,
            generation: 0,
            autoplay,
            autoplay_pending: false,
            events: None,
        }
    }

    /// Publish state changes on an event bus
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Assign a new source; empty URLs are ignored
    ///
    /// Returns true if the source was assigned.
    pub fn assign_source(&mut self, url: &str) -> bool {
        let url = url.trim();
        if url.is_empty() {
            tracing::debug!("Ignoring empty audio source");
            return false;
        }

        self.generation += 1;
        self.apply(AudioInput::Assign(url.to_string()));
        self.autoplay_pending = self.autoplay;
        self.element.set_source(url, self.generation);
        true
    }

    pub fn clear(&mut self) {
        self.generation += 1;
        self.autoplay_pending = false;
        self.apply(AudioInput::Clear);
        self.element.clear_source();
    }

    /// Feed a lifecycle event from the media element
    ///
    /// Events for a replaced source are ignored.
    pub fn handle_event(&mut self, signal: ElementEvent) {
        if signal.generation != self.generation {
            tracing::debug!(
                generation = signal.generation,
                current = self.generation,
                event = ?signal.event,
                "Ignoring event for replaced audio source"
            );
            return;
        }

        let event = signal.event;
        self.apply(AudioInput::Media(event));

        if event == MediaEvent::LoadedData && self.autoplay_pending {
            self.autoplay_pending = false;
            if matches!(self.state, AudioState::ReadyPaused { .. }) {
                if let Err(e) = self.element.play() {
                    tracing::warn!(error = %e, "Autoplay rejected, audio stays paused");
                }
            }
        }
    }

    /// Play/pause toggle
    ///
    /// Returns false (and does nothing) while there is no ready source.
    pub fn toggle(&mut self) -> bool {
        match self.state {
            AudioState::ReadyPlaying { .. } => {
                self.element.pause();
                true
            }
            AudioState::ReadyPaused { .. } => {
                if let Err(e) = self.element.play() {
                    tracing::warn!(error = %e, "Play request rejected");
                }
                true
            }
            AudioState::Loading { .. } | AudioState::NoSource => {
                tracing::debug!(state = ?self.state, "Toggle ignored, audio not ready");
                false
            }
        }
    }

    pub fn state(&self) -> &AudioState {
        &self.state
    }

    pub fn snapshot(&self) -> AudioPlaybackState {
        self.state.snapshot()
    }

    /// Generation of the current source
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn element(&self) -> &E {
        &self.element
    }

    fn apply(&mut self, input: AudioInput) {
        let before = self.state.snapshot();
        let previous = std::mem::replace(&mut self.state, AudioState::NoSource);
        self.state = previous.reduce(input);
        let after = self.state.snapshot();

        if before != after {
            tracing::debug!(
                source_url = ?after.source_url,
                is_loading = after.is_loading,
                is_playing = after.is_playing,
                "Audio state changed"
            );
            if let Some(events) = &self.events {
                events.emit_lossy(SessionEvent::AudioStateChanged {
                    source_url: after.source_url,
                    is_loading: after.is_loading,
                    is_playing: after.is_playing,
                    timestamp: chrono::Utc::now(),
                });
            }
        }
    }
}
