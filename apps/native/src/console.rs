//! Console presentation: event rendering and terminal feedback channels.

use std::io::Write;
use std::sync::{Mutex, PoisonError};

use actor_protocol::SystemEvent;
use alerting::{
    FeedbackChannels, FeedbackError, Notification, NotificationChannel, VibrationPattern,
};
use chrono::NaiveTime;

const BELL: &str = "\x07";

/// One console line per event, prefixed with the local time.
pub fn render_event(event: &SystemEvent, at: NaiveTime) -> String {
    let ts = at.format("%H:%M:%S");
    match event {
        SystemEvent::StateChanged { state } => format!("[{}] ● {}", ts, state.status_text()),
        SystemEvent::LineReceived { line } => format!("[{}] RX: {}", ts, line),
        SystemEvent::Log { message } => format!("[{}] {}", ts, message),
        SystemEvent::Error { message } => format!("[{}] ERROR: {}", ts, message),
        SystemEvent::AlertTriggered { severity, .. } => {
            format!("{} Level detected: {}", severity.icon(), severity.label())
        }
        SystemEvent::AlertStopped => format!("[{}] Alert acknowledged", ts),
    }
}

/// Feedback on a plain terminal.
///
/// Vibration and notifications become printed lines, the strobe rings the
/// terminal bell on every "on" phase, and a foreground request prints a
/// banner.
pub struct ConsoleFeedback {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleFeedback {
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    fn emit(&self, text: &str) -> Result<(), FeedbackError> {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        out.write_all(text.as_bytes())
            .and_then(|()| out.flush())
            .map_err(|e| FeedbackError::Failed(e.to_string()))
    }
}

impl FeedbackChannels for ConsoleFeedback {
    fn vibrate(&self, pattern: &VibrationPattern) -> Result<(), FeedbackError> {
        let timings: Vec<String> = pattern.timings_ms.iter().map(u64::to_string).collect();
        let mode = if pattern.is_continuous() { "looping" } else { "once" };
        self.emit(&format!("[vibrate] {} ms, {}\n", timings.join("/"), mode))
    }

    fn cancel_vibration(&self) -> Result<(), FeedbackError> {
        self.emit("[vibrate] off\n")
    }

    fn play_loop(&self, source: &str) -> Result<(), FeedbackError> {
        self.emit(&format!("{}[audio] looping {}\n", BELL, source))
    }

    fn stop_audio(&self) -> Result<(), FeedbackError> {
        self.emit("[audio] stopped\n")
    }

    fn set_strobe(&self, on: bool) -> Result<(), FeedbackError> {
        if on {
            self.emit(BELL)
        } else {
            Ok(())
        }
    }

    fn post_notification(&self, notification: &Notification) -> Result<(), FeedbackError> {
        let hint = if notification.persistent {
            "  (type !ack to acknowledge)"
        } else {
            ""
        };
        self.emit(&format!(
            "[{}] {}{}\n",
            notification.title, notification.text, hint
        ))
    }

    fn cancel_notification(&self, channel: NotificationChannel) -> Result<(), FeedbackError> {
        self.emit(&format!("[{}] cleared\n", channel.title()))
    }

    fn request_foreground(&self, message: &str) -> Result<(), FeedbackError> {
        let rule = "=".repeat(48);
        self.emit(&format!(
            "{rule}\n  CRITICAL ALERT\n  {message}\n{rule}\n",
            rule = rule,
            message = message
        ))
    }
}
