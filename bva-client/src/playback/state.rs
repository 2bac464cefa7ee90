//! Audio feedback state machine
//!
//! States: `NoSource → Loading → ReadyPaused ⇄ ReadyPlaying`.
//!
//! [`AudioState::reduce`] is the only way state changes. Inputs are either a
//! source assignment from the controller or a lifecycle event reported by the
//! media element. Playing/paused is taken from element events only, never set
//! ahead of the element's acknowledgement.

use serde::{Deserialize, Serialize};

/// Lifecycle events reported by the media element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaEvent {
    /// Element started fetching its source
    LoadStart,
    /// First frame of audio data is available
    LoadedData,
    Play,
    Pause,
    Ended,
}

/// A lifecycle event tagged with the source it belongs to
///
/// `generation` is the value the controller handed to
/// [`MediaElement::set_source`](super::MediaElement::set_source) for that
/// source. Events from a replaced source carry an older generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementEvent {
    pub generation: u64,
    pub event: MediaEvent,
}

/// Reducer input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioInput {
    /// New non-empty source assigned
    Assign(String),
    /// Source removed
    Clear,
    Media(MediaEvent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioState {
    NoSource,
    Loading {
        url: String,
        /// Element reported `play` before data was loaded
        playing_when_ready: bool,
    },
    ReadyPaused {
        url: String,
    },
    ReadyPlaying {
        url: String,
    },
}

impl AudioState {
    /// Apply one input and return the next state
    pub fn reduce(self, input: AudioInput) -> AudioState {
        use AudioState::*;

        match (self, input) {
            (_, AudioInput::Assign(url)) => Loading {
                url,
                playing_when_ready: false,
            },
            (_, AudioInput::Clear) => NoSource,

            (NoSource, AudioInput::Media(_)) => NoSource,

            (Loading { url, playing_when_ready }, AudioInput::Media(event)) => match event {
                MediaEvent::LoadedData if playing_when_ready => ReadyPlaying { url },
                MediaEvent::LoadedData => ReadyPaused { url },
                MediaEvent::Play => Loading {
                    url,
                    playing_when_ready: true,
                },
                MediaEvent::Pause | MediaEvent::Ended => Loading {
                    url,
                    playing_when_ready: false,
                },
                MediaEvent::LoadStart => Loading {
                    url,
                    playing_when_ready,
                },
            },

            (ReadyPaused { url }, AudioInput::Media(event)) => match event {
                MediaEvent::Play => ReadyPlaying { url },
                MediaEvent::LoadStart => Loading {
                    url,
                    playing_when_ready: false,
                },
                MediaEvent::LoadedData | MediaEvent::Pause | MediaEvent::Ended => ReadyPaused { url },
            },

            (ReadyPlaying { url }, AudioInput::Media(event)) => match event {
                MediaEvent::Pause | MediaEvent::Ended => ReadyPaused { url },
                MediaEvent::LoadStart => Loading {
                    url,
                    playing_when_ready: false,
                },
                MediaEvent::LoadedData | MediaEvent::Play => ReadyPlaying { url },
            },
        }
    }

    pub fn source_url(&self) -> Option<&str> {
        match self {
            AudioState::NoSource => None,
            AudioState::Loading { url, .. }
            | AudioState::ReadyPaused { url }
            | AudioState::ReadyPlaying { url } => Some(url),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, AudioState::Loading { .. })
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, AudioState::ReadyPlaying { .. })
    }

    /// Play/pause is actionable only once loading has completed
    pub fn can_toggle(&self) -> bool {
        matches!(
            self,
            AudioState::ReadyPaused { .. } | AudioState::ReadyPlaying { .. }
        )
    }

    pub fn snapshot(&self) -> AudioPlaybackState {
        AudioPlaybackState {
            source_url: self.source_url().map(str::to_string),
            is_loading: self.is_loading(),
            is_playing: self.is_playing(),
        }
    }
}

/// Flattened view for the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioPlaybackState {
    pub source_url: Option<String>,
    pub is_loading: bool,
    pub is_playing: bool,
}
