//! Recording feedback sink for alerting tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use alerting::{
    FeedbackChannels, FeedbackError, Notification, NotificationChannel, VibrationPattern,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Vibrate(VibrationPattern),
    CancelVibration,
    PlayLoop(String),
    StopAudio,
    Strobe(bool),
    Notify(Notification),
    CancelNotification(NotificationChannel),
    Foreground(String),
}

/// Records every call in order. Optionally fails one capability to check
/// that the engine carries on.
#[derive(Default)]
pub struct RecordingFeedback {
    calls: Mutex<Vec<Call>>,
    fail_audio: Mutex<bool>,
}

impl RecordingFeedback {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_audio(&self) {
        *self.fail_audio.lock().unwrap() = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn strobe_toggles(&self) -> Vec<bool> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                Call::Strobe(on) => Some(*on),
                _ => None,
            })
            .collect()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                Call::Notify(n) => Some(n.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl FeedbackChannels for RecordingFeedback {
    fn vibrate(&self, pattern: &VibrationPattern) -> Result<(), FeedbackError> {
        self.record(Call::Vibrate(pattern.clone()));
        Ok(())
    }

    fn cancel_vibration(&self) -> Result<(), FeedbackError> {
        self.record(Call::CancelVibration);
        Ok(())
    }

    fn play_loop(&self, source: &str) -> Result<(), FeedbackError> {
        if *self.fail_audio.lock().unwrap() {
            return Err(FeedbackError::Unavailable("audio"));
        }
        self.record(Call::PlayLoop(source.to_string()));
        Ok(())
    }

    fn stop_audio(&self) -> Result<(), FeedbackError> {
        self.record(Call::StopAudio);
        Ok(())
    }

    fn set_strobe(&self, on: bool) -> Result<(), FeedbackError> {
        self.record(Call::Strobe(on));
        Ok(())
    }

    fn post_notification(&self, notification: &Notification) -> Result<(), FeedbackError> {
        self.record(Call::Notify(notification.clone()));
        Ok(())
    }

    fn cancel_notification(&self, channel: NotificationChannel) -> Result<(), FeedbackError> {
        self.record(Call::CancelNotification(channel));
        Ok(())
    }

    fn request_foreground(&self, message: &str) -> Result<(), FeedbackError> {
        self.record(Call::Foreground(message.to_string()));
        Ok(())
    }
}
