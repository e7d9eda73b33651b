//! Error messages say what failed and, when known, why and what to do next:
//!
//! - ✅ "Failed to open /dev/ttyUSB0: Device busy. Close other programs and retry."
//! - ❌ "open failed"

use core_types::TransportError;
use thiserror::Error;

use crate::state::ConnectionState;

/// Unified error type for actor operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActorError {
    /// State transition was rejected by the FSM
    #[error("Invalid state transition: {from} → {to}")]
    InvalidTransition {
        from: ConnectionState,
        to: ConnectionState,
    },

    /// Communication channel closed
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// Receiver alive but its queue is full; retrying later can succeed
    #[error("Queue full: {0}")]
    QueueFull(String),

    /// Timeout waiting for an operation to complete
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// Transport layer error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Feedback channel (vibration, audio, notification...) failed
    #[error("Feedback error: {0}")]
    Feedback(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for ActorError {
    fn from(s: String) -> Self {
        ActorError::Other(s)
    }
}

impl From<&str> for ActorError {
    fn from(s: &str) -> Self {
        ActorError::Other(s.to_string())
    }
}
