use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use actor_runtime::{actor_debug, actor_info, actor_warn};
use core_types::Severity;

use crate::classifier::classify;
use crate::config::AlertConfig;
use crate::feedback::{FeedbackChannels, FeedbackError, Notification, NotificationChannel};

/// The one piece of state shared between the engine and its strobe loop.
///
/// `active == false` means every feedback channel is stopped. `epoch`
/// increments on each activation so a strobe loop from an earlier alert
/// exits even if a new alert starts before it wakes up.
#[derive(Debug, Default)]
struct AlertState {
    active: bool,
    epoch: u64,
    strobe_on: bool,
    message: Option<String>,
}

/// Turns classified messages into feedback.
///
/// Info and Warning produce one-shot feedback. Critical escalates to every
/// channel and keeps them running until [`AlertEngine::stop`]. All mutation
/// of the alert state and the feedback calls that go with it happen under a
/// single lock, so `trigger` and `stop` can race from any task without
/// leaving a channel running while the flag is down.
///
/// Cloning is cheap and clones share the same alert.
#[derive(Clone)]
pub struct AlertEngine {
    feedback: Arc<dyn FeedbackChannels>,
    config: Arc<AlertConfig>,
    state: Arc<Mutex<AlertState>>,
}

impl std::fmt::Debug for AlertEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn report(what: &str, result: Result<(), FeedbackError>) {
    if let Err(e) = result {
        actor_warn!("{} failed: {}", what, e);
    }
}

impl AlertEngine {
    pub fn new(feedback: Arc<dyn FeedbackChannels>, config: AlertConfig) -> Self {
        Self {
            feedback,
            config: Arc::new(config),
            state: Arc::new(Mutex::new(AlertState::default())),
        }
    }

    // A panic inside a feedback call must not wedge stop(), so poisoning is ignored
    fn lock(&self) -> MutexGuard<'_, AlertState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    /// Text of the active critical alert, latest trigger wins.
    pub fn active_message(&self) -> Option<String> {
        self.lock().message.clone()
    }

    /// Classify `line` and trigger at that severity.
    pub fn process_line(&self, line: &str) -> Severity {
        let severity = classify(line);
        self.trigger(line, severity);
        severity
    }

    pub fn trigger(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info => {
                let notification = Notification::transient(NotificationChannel::Info, message);
                report("info notification", self.feedback.post_notification(&notification));
            }
            Severity::Warning => {
                let notification = Notification::transient(NotificationChannel::Warning, message);
                report(
                    "warning notification",
                    self.feedback.post_notification(&notification),
                );
                report("vibration", self.feedback.vibrate(&self.config.warning_vibration()));
            }
            Severity::Critical => self.trigger_critical(message),
        }
    }

    fn trigger_critical(&self, message: &str) {
        let mut state = self.lock();
        let notification = Notification::critical(message);

        if state.active {
            // Already escalated: only the text changes
            state.message = Some(message.to_string());
            report(
                "critical notification",
                self.feedback.post_notification(&notification),
            );
            actor_debug!("Critical alert updated: {}", message);
            return;
        }

        state.active = true;
        state.epoch = state.epoch.wrapping_add(1);
        state.message = Some(message.to_string());
        actor_info!("Critical alert raised: {}", message);

        report(
            "critical notification",
            self.feedback.post_notification(&notification),
        );
        report(
            "vibration",
            self.feedback.vibrate(&self.config.critical_vibration()),
        );
        report("audio", self.feedback.play_loop(&self.config.audio_source));

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(strobe_loop(self.clone(), state.epoch));
            }
            Err(_) => {
                let engine = self.clone();
                let epoch = state.epoch;
                let spawned = std::thread::Builder::new()
                    .name("strobe".into())
                    .spawn(move || strobe_thread(engine, epoch));
                if let Err(e) = spawned {
                    actor_warn!("Strobe thread failed to start: {}", e);
                }
            }
        }

        report("foreground request", self.feedback.request_foreground(message));
    }

    /// End the critical alert. Returns false, doing nothing, if none is active.
    pub fn stop(&self) -> bool {
        let mut state = self.lock();
        if !state.active {
            return false;
        }

        state.active = false;
        state.message = None;
        report("vibration cancel", self.feedback.cancel_vibration());
        report("audio stop", self.feedback.stop_audio());
        // The strobe loop sees the flag down on its next tick and exits without toggling
        state.strobe_on = false;
        report("strobe", self.feedback.set_strobe(false));
        report(
            "notification cancel",
            self.feedback.cancel_notification(NotificationChannel::Critical),
        );
        actor_info!("Critical alert stopped");
        true
    }
}

impl AlertEngine {
    /// Flip the strobe if the alert of `epoch` is still the active one.
    fn strobe_tick(&self, epoch: u64) -> bool {
        let mut state = self.lock();
        if !state.active || state.epoch != epoch {
            return false;
        }
        state.strobe_on = !state.strobe_on;
        report("strobe", self.feedback.set_strobe(state.strobe_on));
        true
    }
}

/// Toggle the strobe every interval while the alert of `epoch` is active.
async fn strobe_loop(engine: AlertEngine, epoch: u64) {
    let interval = engine.config.strobe_interval();
    while engine.strobe_tick(epoch) {
        tokio::time::sleep(interval).await;
    }
    actor_debug!("Strobe loop {} exited", epoch);
}

/// Same loop on a plain thread, for callers outside any tokio runtime.
fn strobe_thread(engine: AlertEngine, epoch: u64) {
    let interval = engine.config.strobe_interval();
    while engine.strobe_tick(epoch) {
        std::thread::sleep(interval);
    }
    actor_debug!("Strobe thread {} exited", epoch);
}
