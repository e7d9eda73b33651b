use actor_protocol::{ActorError, SystemEvent};
use actor_runtime::{actor_warn, Actor, AlertMessage};
use futures_channel::mpsc;

use crate::engine::AlertEngine;

/// Actor front end of the [`AlertEngine`].
///
/// Consumes lines forwarded by the link actor, classifies and escalates
/// them, and publishes `AlertTriggered`/`AlertStopped` for the
/// presentation layer.
pub struct AlertActor {
    engine: AlertEngine,
    event_tx: mpsc::Sender<SystemEvent>,
}

impl AlertActor {
    pub fn new(engine: AlertEngine, event_tx: mpsc::Sender<SystemEvent>) -> Self {
        Self { engine, event_tx }
    }

    pub fn engine(&self) -> &AlertEngine {
        &self.engine
    }

    fn send_ui_event(&self, event: SystemEvent) {
        if let Err(e) = self.event_tx.clone().try_send(event) {
            actor_warn!("UI event dropped: {:?}", e.into_inner());
        }
    }
}

impl Actor for AlertActor {
    type Message = AlertMessage;

    fn name(&self) -> &'static str {
        "AlertActor"
    }

    async fn handle(&mut self, msg: AlertMessage) -> Result<(), ActorError> {
        match msg {
            AlertMessage::Line { line } => {
                let severity = self.engine.process_line(&line);
                self.send_ui_event(SystemEvent::AlertTriggered {
                    message: line,
                    severity,
                });
            }
            AlertMessage::Trigger { message, severity } => {
                self.engine.trigger(&message, severity);
                self.send_ui_event(SystemEvent::AlertTriggered { message, severity });
            }
            AlertMessage::Stop => {
                if self.engine.stop() {
                    self.send_ui_event(SystemEvent::AlertStopped);
                }
            }
        }
        Ok(())
    }

    async fn shutdown(&mut self) {
        if self.engine.stop() {
            self.send_ui_event(SystemEvent::AlertStopped);
        }
    }
}
