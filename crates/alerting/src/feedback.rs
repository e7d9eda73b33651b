//! Side-effect capabilities the escalation engine drives.
//!
//! The host implements [`FeedbackChannels`] over whatever it has: a phone
//! vibrator and torch, a desktop notification daemon, or the console.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_types::Severity;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedbackError {
    #[error("Capability unavailable: {0}")]
    Unavailable(&'static str),
    #[error("Feedback failed: {0}")]
    Failed(String),
}

/// Off/on timings in milliseconds, starting with an off period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VibrationPattern {
    pub timings_ms: Vec<u64>,
    /// Index to loop back to after the last timing; `None` plays once
    pub repeat: Option<usize>,
}

impl VibrationPattern {
    pub fn once(timings_ms: Vec<u64>) -> Self {
        Self {
            timings_ms,
            repeat: None,
        }
    }

    pub fn is_continuous(&self) -> bool {
        self.repeat.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Default,
    Max,
}

/// One notification channel per severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Info,
    Warning,
    Critical,
}

impl NotificationChannel {
    pub fn for_severity(severity: Severity) -> Self {
        match severity {
            Severity::Info => Self::Info,
            Severity::Warning => Self::Warning,
            Severity::Critical => Self::Critical,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Critical => "CRITICAL ALERT",
        }
    }

    pub fn priority(&self) -> Priority {
        match self {
            Self::Info => Priority::Low,
            Self::Warning => Priority::Default,
            Self::Critical => Priority::Max,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub channel: NotificationChannel,
    pub priority: Priority,
    pub title: String,
    pub text: String,
    /// Stays until cancelled; the user cannot swipe it away
    pub persistent: bool,
    /// Ask the host to show it over the lock screen
    pub full_screen: bool,
}

impl Notification {
    /// Auto-dismissing notification on the severity's channel.
    pub fn transient(channel: NotificationChannel, text: impl Into<String>) -> Self {
        Self {
            channel,
            priority: channel.priority(),
            title: channel.title().to_string(),
            text: text.into(),
            persistent: false,
            full_screen: false,
        }
    }

    /// The ongoing, full-screen critical notification.
    pub fn critical(text: impl Into<String>) -> Self {
        Self {
            persistent: true,
            full_screen: true,
            ..Self::transient(NotificationChannel::Critical, text)
        }
    }
}

/// Feedback capabilities of the host.
///
/// Calls are short and non-blocking (start or stop something, then return).
/// Errors are logged by the engine and never abort an escalation step.
pub trait FeedbackChannels: Send + Sync + 'static {
    fn vibrate(&self, pattern: &VibrationPattern) -> Result<(), FeedbackError>;

    fn cancel_vibration(&self) -> Result<(), FeedbackError>;

    /// Start `source` looping until [`FeedbackChannels::stop_audio`].
    fn play_loop(&self, source: &str) -> Result<(), FeedbackError>;

    /// Stop and release the player.
    fn stop_audio(&self) -> Result<(), FeedbackError>;

    fn set_strobe(&self, on: bool) -> Result<(), FeedbackError>;

    /// Post or replace the notification of `notification.channel`.
    fn post_notification(&self, notification: &Notification) -> Result<(), FeedbackError>;

    fn cancel_notification(&self, channel: NotificationChannel) -> Result<(), FeedbackError>;

    /// Bring the alert view to the foreground, over the lock screen if possible.
    fn request_foreground(&self, message: &str) -> Result<(), FeedbackError>;
}
