//! Headless media element
//!
//! A [`MediaElement`] with no audio output, for terminals and tests. Every
//! request is acknowledged by pushing the matching lifecycle events into a
//! channel; the owner pumps them back into the controller. Playback completes
//! immediately (`Play` followed by `Ended`).
//!
//! Events are tagged with the generation of the source current when they were
//! raised, so events queued for a replaced source stay recognizable.

use tokio::sync::mpsc;

use super::controller::MediaElement;
use super::state::{ElementEvent, MediaEvent};
use crate::error::PlaybackError;

pub struct HeadlessElement {
    tx: mpsc::UnboundedSender<ElementEvent>,
    source: Option<String>,
    generation: u64,
}

impl HeadlessElement {
    /// Create the element and the receiving end of its event stream
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ElementEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                source: None,
                generation: 0,
            },
            rx,
        )
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn send(&self, event: MediaEvent) {
        // Receiver gone means nobody is listening any more
        let _ = self.tx.send(ElementEvent {
            generation: self.generation,
            event,
        });
    }
}

impl MediaElement for HeadlessElement {
    fn set_source(&mut self, url: &str, generation: u64) {
        self.source = Some(url.to_string());
        self.generation = generation;
        self.send(MediaEvent::LoadStart);
        self.send(MediaEvent::LoadedData);
    }

    fn clear_source(&mut self) {
        self.source = None;
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        if self.source.is_none() {
            return Err(PlaybackError::PlayRejected("no source".to_string()));
        }
        self.send(MediaEvent::Play);
        self.send(MediaEvent::Ended);
        Ok(())
    }

    fn pause(&mut self) {
        self.send(MediaEvent::Pause);
    }
}
