/// Supervision utilities for actor operations
///
/// Single-shot timers that post a message back into an actor's queue.
/// Used for the connect watchdog and the reconnect timer.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_channel::mpsc;

/// Handle to cancel a timeout operation
///
/// When dropped or explicitly cancelled, the timeout task will not send
/// its message, preventing spurious timeouts after operations complete.
pub struct TimeoutHandle {
    cancelled: Arc<AtomicBool>,
    task: Option<tokio::task::AbortHandle>,
}

impl TimeoutHandle {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    /// Cancel the timeout, preventing it from firing
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for TimeoutHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for TimeoutHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeoutHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Timeout configuration for supervised operations
#[derive(Debug, Clone)]
pub struct SupervisionConfig {
    /// Timeout for connection operations (open + parameter negotiation)
    pub connect_timeout_secs: u64,
    /// Timeout for tearing down the read loop and writer on disconnect
    pub disconnect_timeout_ms: u64,
}

impl Default for SupervisionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10, // 10s for port opening
            disconnect_timeout_ms: 500,
        }
    }
}

impl SupervisionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn disconnect_timeout(&self) -> Duration {
        Duration::from_millis(self.disconnect_timeout_ms)
    }
}

/// Spawn a task that posts `msg` to `tx` after `delay`.
///
/// Returns a TimeoutHandle that can be used to cancel the timeout. If the
/// handle is dropped or explicitly cancelled before the delay elapses, no
/// message is sent. Must be called from within a tokio runtime.
pub fn spawn_timeout<M>(tx: mpsc::Sender<M>, msg: M, delay: Duration) -> TimeoutHandle
where
    M: Send + 'static,
{
    let mut handle = TimeoutHandle::new();
    let cancel_flag = handle.cancelled.clone();
    let mut tx = tx;

    let task = tokio::spawn(async move {
        tokio::time::sleep(delay).await;

        // Final check before sending timeout message
        if !cancel_flag.load(Ordering::Acquire) {
            let _ = tx.try_send(msg);
        }
    });
    handle.task = Some(task.abort_handle());

    handle
}
