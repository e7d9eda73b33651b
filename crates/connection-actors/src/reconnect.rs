use std::time::Duration;

use actor_runtime::{actor_debug, spawn_timeout, LinkMessage, TimeoutHandle};
use futures_channel::mpsc;

/// Single outstanding reconnect timer.
///
/// Arming replaces (and so cancels) the previous timer. Each timer carries an
/// id; [`ReconnectScheduler::fire`] accepts only the id of the timer that is
/// currently armed, so a firing that raced with a re-arm or a cancel is
/// recognized as stale.
#[derive(Debug)]
pub struct ReconnectScheduler {
    delay: Duration,
    armed: Option<(u32, TimeoutHandle)>,
    timer_sequence: u32,
    arm_count: u64,
}

impl ReconnectScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            armed: None,
            timer_sequence: 0,
            arm_count: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm the timer, cancelling any prior instance. Returns the new timer id.
    pub fn arm(&mut self, link_tx: mpsc::Sender<LinkMessage>) -> u32 {
        self.cancel();

        self.timer_sequence = self.timer_sequence.wrapping_add(1);
        let timer_id = self.timer_sequence;
        let handle = spawn_timeout(
            link_tx,
            LinkMessage::ReconnectTimerFired { timer_id },
            self.delay,
        );
        self.armed = Some((timer_id, handle));
        self.arm_count += 1;

        actor_debug!(
            "Reconnect timer {} armed ({} ms)",
            timer_id,
            self.delay.as_millis()
        );
        timer_id
    }

    /// Returns whether a timer was armed.
    pub fn cancel(&mut self) -> bool {
        match self.armed.take() {
            Some((timer_id, handle)) => {
                handle.cancel();
                actor_debug!("Reconnect timer {} cancelled", timer_id);
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Consume a firing. `true` only for the currently armed timer.
    pub fn fire(&mut self, timer_id: u32) -> bool {
        match &self.armed {
            Some((armed_id, _)) if *armed_id == timer_id => {
                self.armed = None;
                true
            }
            _ => {
                actor_debug!("Ignoring stale reconnect timer {}", timer_id);
                false
            }
        }
    }

    /// Total number of times a timer was armed.
    pub fn arm_count(&self) -> u64 {
        self.arm_count
    }
}
