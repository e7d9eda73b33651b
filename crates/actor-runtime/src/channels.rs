use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use actor_protocol::{ActorError, ConnectionState, SystemEvent};
use core_types::{DeviceDescriptor, LinkParams, Severity, SharedChannel, TransportError};
use futures_channel::{mpsc, oneshot};

/// Inbound events for the link actor.
///
/// Public operations, platform callbacks (attach, detach, permission result)
/// and completions from the actor's own background work all arrive here, so
/// the actor sees one ordered stream of typed events.
pub enum LinkMessage {
    /// Enumerate attached devices
    Discover {
        reply: oneshot::Sender<Result<Vec<DeviceDescriptor>, TransportError>>,
    },
    Connect {
        device: DeviceDescriptor,
        params: LinkParams,
        reply: Option<oneshot::Sender<bool>>,
    },
    Disconnect {
        explicit: bool,
        reply: Option<oneshot::Sender<()>>,
    },
    /// Write one line; the terminator is appended by the actor
    Send {
        line: String,
        reply: Option<oneshot::Sender<bool>>,
    },
    RequestAccess {
        device: DeviceDescriptor,
    },
    /// Discover and connect to the first authorized device
    AutoConnect,

    /// Platform callback: a compatible device was plugged in
    DeviceAttached,
    /// Platform callback: the device was unplugged
    DeviceDetached,
    /// Platform callback: outcome of a `RequestAccess`
    AccessResult {
        device: DeviceDescriptor,
        granted: bool,
    },

    /// Blocking open + negotiate finished
    OpenCompleted {
        /// Operation sequence number to match against the pending connect
        operation_id: u32,
        result: Result<SharedChannel, TransportError>,
    },
    /// Connect watchdog fired
    OperationTimeout {
        operation_id: u32,
    },
    /// Bytes from the read loop of session `session_id`
    BytesReceived {
        session_id: u32,
        data: Vec<u8>,
    },
    /// The read loop or writer of session `session_id` hit an I/O error
    SessionFailed {
        session_id: u32,
        reason: String,
    },
    ReconnectTimerFired {
        timer_id: u32,
    },

    /// Explicit disconnect, then stop the actor
    Shutdown {
        reply: Option<oneshot::Sender<()>>,
    },
}

// Manual Debug implementation: channels and reply senders are opaque
impl std::fmt::Debug for LinkMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Discover { .. } => write!(f, "Discover"),
            Self::Connect { device, params, .. } => f
                .debug_struct("Connect")
                .field("device", &device.path)
                .field("params", params)
                .finish(),
            Self::Disconnect { explicit, .. } => f
                .debug_struct("Disconnect")
                .field("explicit", explicit)
                .finish(),
            Self::Send { line, .. } => f.debug_struct("Send").field("line", line).finish(),
            Self::RequestAccess { device } => f
                .debug_struct("RequestAccess")
                .field("device", &device.path)
                .finish(),
            Self::AutoConnect => write!(f, "AutoConnect"),
            Self::DeviceAttached => write!(f, "DeviceAttached"),
            Self::DeviceDetached => write!(f, "DeviceDetached"),
            Self::AccessResult { device, granted } => f
                .debug_struct("AccessResult")
                .field("device", &device.path)
                .field("granted", granted)
                .finish(),
            Self::OpenCompleted {
                operation_id,
                result,
            } => f
                .debug_struct("OpenCompleted")
                .field("operation_id", operation_id)
                .field("ok", &result.is_ok())
                .finish(),
            Self::OperationTimeout { operation_id } => f
                .debug_struct("OperationTimeout")
                .field("operation_id", operation_id)
                .finish(),
            Self::BytesReceived { session_id, data } => f
                .debug_struct("BytesReceived")
                .field("session_id", session_id)
                .field("len", &data.len())
                .finish(),
            Self::SessionFailed { session_id, reason } => f
                .debug_struct("SessionFailed")
                .field("session_id", session_id)
                .field("reason", reason)
                .finish(),
            Self::ReconnectTimerFired { timer_id } => f
                .debug_struct("ReconnectTimerFired")
                .field("timer_id", timer_id)
                .finish(),
            Self::Shutdown { .. } => write!(f, "Shutdown"),
        }
    }
}

/// Inbound events for the alert actor.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertMessage {
    /// A decoded line to classify and escalate
    Line { line: String },
    /// Escalate with an explicit severity, skipping classification
    Trigger { message: String, severity: Severity },
    /// Acknowledge the active critical alert
    Stop,
}

/// Lock-free mirror of the link state for synchronous readers.
///
/// Only the link actor writes it.
#[derive(Debug, Clone, Default)]
pub struct StateCell(Arc<AtomicU8>);

impl StateCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire)).unwrap_or_default()
    }

    pub fn set(&self, state: ConnectionState) {
        self.0.store(state.to_u8(), Ordering::Release);
    }
}

/// Handles for spawning actors
pub struct ActorHandles {
    pub link_rx: mpsc::Receiver<LinkMessage>,
    pub alert_rx: mpsc::UnboundedReceiver<AlertMessage>,
    pub event_tx: mpsc::Sender<SystemEvent>,
    pub state: StateCell,
}

/// Typed front door to the running actors.
///
/// Request/response operations (`connect`, `send`, `disconnect`, `discover`)
/// wait for the actor's reply; platform callbacks are fire-and-forget.
pub struct LinkHandle {
    // Bounded command queue; alert lines go through an unbounded one
    link_tx: mpsc::Sender<LinkMessage>,
    alert_tx: mpsc::UnboundedSender<AlertMessage>,
    state: StateCell,

    // Event receiver (NOT cloned, replaced with dummy in Clone impl)
    event_rx: mpsc::Receiver<SystemEvent>,
}

impl Clone for LinkHandle {
    fn clone(&self) -> Self {
        // Clone gets a disconnected receiver; take_event_receiver() first
        let (_dummy_tx, dummy_rx) = mpsc::channel(1);
        Self {
            link_tx: self.link_tx.clone(),
            alert_tx: self.alert_tx.clone(),
            state: self.state.clone(),
            event_rx: dummy_rx,
        }
    }
}

/// Channel capacities.
///
/// - link: 256, commands plus read-loop chunks
/// - event: 1024, state/log/line events for the presentation layer
///
/// The alert queue is unbounded: every received line must reach the alert
/// actor, however slow its feedback channels are.
const LINK_CHANNEL_CAPACITY: usize = 256;
const EVENT_CHANNEL_CAPACITY: usize = 1024;

impl LinkHandle {
    /// Create the channel infrastructure.
    ///
    /// Returns (LinkHandle for the host, ActorHandles for spawning actors)
    pub fn new() -> (Self, ActorHandles) {
        let (link_tx, link_rx) = mpsc::channel(LINK_CHANNEL_CAPACITY);
        let (alert_tx, alert_rx) = mpsc::unbounded();
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let state = StateCell::new();

        let handles = ActorHandles {
            link_rx,
            alert_rx,
            event_tx,
            state: state.clone(),
        };

        let handle = Self {
            link_tx,
            alert_tx,
            state,
            event_rx,
        };

        (handle, handles)
    }

    /// Current link state as last published by the link actor.
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    pub async fn discover(&self) -> Result<Vec<DeviceDescriptor>, ActorError> {
        let (reply, rx) = oneshot::channel();
        self.post(LinkMessage::Discover { reply })?;
        let listed = rx
            .await
            .map_err(|_| ActorError::ChannelClosed("LinkActor dropped discover reply".into()))?;
        Ok(listed?)
    }

    /// Open `device`. Resolves to `false` if another attempt is in flight,
    /// a session is already up, or the open fails.
    pub async fn connect(&self, device: DeviceDescriptor, params: LinkParams) -> bool {
        let (reply, rx) = oneshot::channel();
        let msg = LinkMessage::Connect {
            device,
            params,
            reply: Some(reply),
        };
        if self.post(msg).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Resolves once the read loop and session are torn down.
    pub async fn disconnect(&self, explicit: bool) {
        let (reply, rx) = oneshot::channel();
        let msg = LinkMessage::Disconnect {
            explicit,
            reply: Some(reply),
        };
        if self.post(msg).is_ok() {
            let _ = rx.await;
        }
    }

    pub async fn send(&self, line: impl Into<String>) -> bool {
        let (reply, rx) = oneshot::channel();
        let msg = LinkMessage::Send {
            line: line.into(),
            reply: Some(reply),
        };
        if self.post(msg).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Send a modem command: `send_at("+CSQ")` writes `AT+CSQ\r\n`.
    pub async fn send_at(&self, command: &str) -> bool {
        self.send(format!("AT{}", command)).await
    }

    pub fn request_access(&self, device: DeviceDescriptor) -> Result<(), ActorError> {
        self.post(LinkMessage::RequestAccess { device })
    }

    pub fn auto_connect(&self) -> Result<(), ActorError> {
        self.post(LinkMessage::AutoConnect)
    }

    pub fn device_attached(&self) -> Result<(), ActorError> {
        self.post(LinkMessage::DeviceAttached)
    }

    pub fn device_detached(&self) -> Result<(), ActorError> {
        self.post(LinkMessage::DeviceDetached)
    }

    pub fn access_result(&self, device: DeviceDescriptor, granted: bool) -> Result<(), ActorError> {
        self.post(LinkMessage::AccessResult { device, granted })
    }

    /// Acknowledge the active critical alert.
    pub fn stop_alert(&self) -> Result<(), ActorError> {
        self.post_alert(AlertMessage::Stop)
    }

    pub fn post_alert(&self, msg: AlertMessage) -> Result<(), ActorError> {
        self.alert_tx
            .unbounded_send(msg)
            .map_err(|_| ActorError::ChannelClosed("AlertActor stopped".into()))
    }

    /// Explicit disconnect, then stop the link actor. Resolves after cleanup.
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.post(LinkMessage::Shutdown { reply: Some(reply) }).is_ok() {
            let _ = rx.await;
        }
        self.alert_tx.close_channel();
    }

    /// Take ownership of event receiver
    ///
    /// Should be called once; later calls get a receiver that never yields.
    pub fn take_event_receiver(&mut self) -> mpsc::Receiver<SystemEvent> {
        let (_new_tx, new_rx) = mpsc::channel(1);
        std::mem::replace(&mut self.event_rx, new_rx)
    }

    /// Clone senders for direct actor-to-actor communication
    pub fn link_sender(&self) -> mpsc::Sender<LinkMessage> {
        self.link_tx.clone()
    }

    pub fn alert_sender(&self) -> mpsc::UnboundedSender<AlertMessage> {
        self.alert_tx.clone()
    }

    fn post(&self, msg: LinkMessage) -> Result<(), ActorError> {
        self.link_tx.clone().try_send(msg).map_err(|e| {
            if e.is_full() {
                ActorError::QueueFull(
                    "System overloaded: too many pending link commands. Slow down and retry."
                        .into(),
                )
            } else {
                ActorError::ChannelClosed("LinkActor stopped".into())
            }
        })
    }
}
