//! Spoken-result audio feedback

pub mod controller;
pub mod headless;
pub mod state;

pub use controller::{AudioFeedbackController, MediaElement};
pub use headless::HeadlessElement;
pub use state::{AudioPlaybackState, AudioState, ElementEvent, MediaEvent};
