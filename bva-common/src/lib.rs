//! # BVA Common Library
//!
//! Shared code for the banknote voice assistant client including:
//! - Recognition service wire types (Detection, PredictionResult)
//! - Denomination catalog and display styles
//! - Service health status
//! - Session event types (SessionEvent enum) and the EventBus
//! - Configuration resolution

pub mod api;
pub mod config;
pub mod denomination;
pub mod error;
pub mod events;
pub mod health;

pub use config::ClientConfig;
pub use denomination::{Denomination, DenominationStyle};
pub use error::{Error, Result};
pub use health::HealthStatus;
