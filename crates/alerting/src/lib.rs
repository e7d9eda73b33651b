//! # Alerting
//!
//! Severity classification and alert escalation.
//!
//! - [`classify`]: keyword match of a line to a [`Severity`](core_types::Severity)
//! - [`AlertEngine`]: drives the host's [`FeedbackChannels`] per severity and
//!   owns the single "critical alert active" flag
//! - [`AlertActor`]: runs the engine on the actor runtime, fed by the link

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod alert_actor;
pub mod classifier;
pub mod config;
pub mod constants;
pub mod engine;
pub mod feedback;

pub use alert_actor::AlertActor;
pub use classifier::classify;
pub use config::AlertConfig;
pub use engine::AlertEngine;
pub use feedback::{
    FeedbackChannels, FeedbackError, Notification, NotificationChannel, Priority,
    VibrationPattern,
};
