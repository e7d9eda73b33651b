use core_types::Severity;
use serde::{Deserialize, Serialize};

use crate::state::ConnectionState;

/// Events from the actor system to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SystemEvent {
    /// Connection state has changed
    StateChanged { state: ConnectionState },

    /// A complete, non-blank line arrived from the device
    LineReceived { line: String },

    /// Human-readable status line for the console
    Log { message: String },

    /// Error occurred
    Error { message: String },

    /// The alert engine escalated a line
    AlertTriggered { message: String, severity: Severity },

    /// An active critical alert was acknowledged
    AlertStopped,
}

impl SystemEvent {
    pub fn log(message: impl Into<String>) -> Self {
        Self::Log {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
