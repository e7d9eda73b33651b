use std::collections::HashSet;
use std::sync::Arc;

use actor_protocol::{ActorError, ConnectionState, SystemEvent};
use actor_runtime::{
    actor_debug, actor_info, actor_warn, spawn_timeout, Actor, AlertMessage, LinkMessage,
    StateCell, SupervisionConfig, TimeoutHandle,
};
use core_types::{DeviceDescriptor, LinkParams, SerialProvider, SharedChannel, TransportError};
use framing::LineFramer;
use futures::SinkExt;
use futures_channel::{mpsc, oneshot};

use crate::config::LinkConfig;
use crate::constants::link;
use crate::reconnect::ReconnectScheduler;
use crate::session::LinkSession;

/// A connect whose blocking open has not reported back yet.
struct PendingConnect {
    operation_id: u32,
    device: DeviceDescriptor,
    params: LinkParams,
    reply: Option<oneshot::Sender<bool>>,
    // Cancelled on drop, i.e. as soon as the attempt resolves
    _watchdog: TimeoutHandle,
}

/// LinkActor owns the single serial link.
///
/// Responsibilities:
/// - Maintain the connection state machine (see `actor-protocol/src/state.rs`)
/// - Open, negotiate and close the one [`LinkSession`]
/// - Feed received bytes through the [`LineFramer`] and publish lines
/// - Arm the reconnect timer after every unrequested disconnect
///
/// Every input, including platform callbacks and completions of its own
/// background work, arrives as a [`LinkMessage`]. Nothing else mutates the
/// actor, so the invariants below hold between messages:
///
/// - at most one connect in flight (`pending`), never alongside a session
/// - at most one session; its id tags every read-loop message
/// - the framer is empty whenever there is no session
/// - at most one reconnect timer armed
pub struct LinkActor {
    provider: Arc<dyn SerialProvider>,
    config: LinkConfig,
    supervision: SupervisionConfig,

    state: ConnectionState,
    state_cell: StateCell,

    framer: LineFramer,
    session: Option<LinkSession>,
    pending: Option<PendingConnect>,
    reconnect: ReconnectScheduler,
    // Device paths with an access request outstanding
    pending_access: HashSet<String>,

    // Operation sequence tracking for detecting stale open completions
    operation_sequence: u32,
    session_sequence: u32,

    // Channel to send messages to self (timers, open completion, read loop)
    link_tx: mpsc::Sender<LinkMessage>,
    event_tx: mpsc::Sender<SystemEvent>,
    line_tx: Option<mpsc::UnboundedSender<AlertMessage>>,

    stopped: bool,
}

impl LinkActor {
    pub fn new(
        provider: Arc<dyn SerialProvider>,
        config: LinkConfig,
        state_cell: StateCell,
        link_tx: mpsc::Sender<LinkMessage>,
        event_tx: mpsc::Sender<SystemEvent>,
    ) -> Self {
        let supervision = SupervisionConfig {
            connect_timeout_secs: config.connect_timeout_secs,
            disconnect_timeout_ms: link::CLEANUP_TIMEOUT_MS,
        };
        state_cell.set(ConnectionState::Disconnected);

        Self {
            provider,
            reconnect: ReconnectScheduler::new(config.reconnect_delay()),
            config,
            supervision,
            state: ConnectionState::Disconnected,
            state_cell,
            framer: LineFramer::new(),
            session: None,
            pending: None,
            pending_access: HashSet::new(),
            operation_sequence: 0,
            session_sequence: 0,
            link_tx,
            event_tx,
            line_tx: None,
            stopped: false,
        }
    }

    /// Also deliver every received line to the alert actor.
    pub fn with_line_subscriber(mut self, line_tx: mpsc::UnboundedSender<AlertMessage>) -> Self {
        self.line_tx = Some(line_tx);
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_connect_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Device of the open session, if any.
    pub fn connected_device(&self) -> Option<&DeviceDescriptor> {
        self.session.as_ref().map(LinkSession::device)
    }

    pub fn session_params(&self) -> Option<&LinkParams> {
        self.session.as_ref().map(LinkSession::params)
    }

    /// Bytes of an unterminated line held by the framer.
    pub fn buffered_bytes(&self) -> usize {
        self.framer.buffered_len()
    }

    pub fn reconnect_armed(&self) -> bool {
        self.reconnect.is_armed()
    }

    pub fn reconnect_arm_count(&self) -> u64 {
        self.reconnect.arm_count()
    }

    fn next_operation_id(&mut self) -> u32 {
        self.operation_sequence = self.operation_sequence.wrapping_add(1);
        self.operation_sequence
    }

    fn next_session_id(&mut self) -> u32 {
        self.session_sequence = self.session_sequence.wrapping_add(1);
        self.session_sequence
    }

    /// UI events are best effort; a full event queue must not stall the link.
    fn send_ui_event(&self, event: SystemEvent) {
        if let Err(e) = self.event_tx.clone().try_send(event) {
            actor_warn!("UI event dropped: {:?}", e.into_inner());
        }
    }

    fn log(&self, message: impl Into<String>) {
        let message = message.into();
        actor_info!("{}", message);
        self.send_ui_event(SystemEvent::Log { message });
    }

    /// Attempt to transition to a new state
    ///
    /// Same-state transitions are silent no-ops.
    fn transition(&mut self, new_state: ConnectionState) -> Result<(), ActorError> {
        if self.state == new_state {
            return Ok(());
        }
        if !self.state.can_transition_to(new_state) {
            return Err(ActorError::InvalidTransition {
                from: self.state,
                to: new_state,
            });
        }

        actor_debug!("State: {:?} → {:?}", self.state, new_state);
        self.state = new_state;
        self.state_cell.set(new_state);
        self.send_ui_event(SystemEvent::StateChanged { state: new_state });
        Ok(())
    }

    fn schedule_reconnect(&mut self) {
        self.reconnect.arm(self.link_tx.clone());
        actor_debug!(
            "Reconnecting in {} ms",
            self.reconnect.delay().as_millis()
        );
    }

    async fn handle_connect(
        &mut self,
        device: DeviceDescriptor,
        params: LinkParams,
        reply: Option<oneshot::Sender<bool>>,
    ) -> Result<(), ActorError> {
        if self.pending.is_some() || self.session.is_some() {
            actor_debug!(
                "Rejecting connect to {}: link busy ({:?})",
                device.path,
                self.state
            );
            if let Some(reply) = reply {
                let _ = reply.send(false);
            }
            return Ok(());
        }

        self.reconnect.cancel();
        self.transition(ConnectionState::Connecting)?;

        let operation_id = self.next_operation_id();
        let watchdog = spawn_timeout(
            self.link_tx.clone(),
            LinkMessage::OperationTimeout { operation_id },
            self.supervision.connect_timeout(),
        );

        self.log(format!(
            "Connecting to {} ({} {})...",
            device.label(),
            params.baud_rate,
            params.framing()
        ));

        let provider = self.provider.clone();
        let mut link_tx = self.link_tx.clone();
        let open_device = device.clone();
        let open_params = params.clone();
        tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(move || {
                open_and_negotiate(provider.as_ref(), &open_device, &open_params)
            })
            .await
            .unwrap_or_else(|e| Err(TransportError::Io(format!("open task failed: {}", e))));

            // If the actor is gone the channel drops here and closes with it
            let _ = link_tx
                .send(LinkMessage::OpenCompleted {
                    operation_id,
                    result,
                })
                .await;
        });

        self.pending = Some(PendingConnect {
            operation_id,
            device,
            params,
            reply,
            _watchdog: watchdog,
        });
        Ok(())
    }

    async fn handle_open_completed(
        &mut self,
        operation_id: u32,
        result: Result<SharedChannel, TransportError>,
    ) -> Result<(), ActorError> {
        // Validate operation ID to prevent orphan ports from timed-out or cancelled attempts
        let current = self.pending.as_ref().map(|p| p.operation_id);
        if current != Some(operation_id) {
            actor_debug!(
                "Ignoring stale OpenCompleted (operation_id={}, expected={:?})",
                operation_id,
                current
            );
            if let Ok(channel) = result {
                channel.close();
            }
            return Ok(());
        }
        let Some(mut pending) = self.pending.take() else {
            return Ok(());
        };

        let channel = match result {
            Ok(channel) => channel,
            Err(TransportError::AccessDenied(reason)) => {
                self.deny_access(&pending.device, &reason)?;
                if let Some(reply) = pending.reply.take() {
                    let _ = reply.send(false);
                }
                return Ok(());
            }
            Err(e) => {
                self.fail_connect(pending, e.to_string())?;
                return Ok(());
            }
        };

        if let Err(e) = channel.set_control_lines(true, true) {
            actor_warn!("Could not assert DTR/RTS on {}: {}", pending.device.path, e);
        }

        if let Err(e) = self.transition(ConnectionState::Connected) {
            channel.close();
            if let Some(reply) = pending.reply.take() {
                let _ = reply.send(false);
            }
            return Err(e);
        }

        self.framer.reset();
        let session_id = self.next_session_id();
        let baud_rate = pending.params.baud_rate;
        self.session = Some(LinkSession::start(
            session_id,
            pending.device.clone(),
            pending.params.clone(),
            channel,
            self.config.write_timeout(),
            self.link_tx.clone(),
            self.event_tx.clone(),
        ));
        self.log(format!("Connected! Baud rate: {}", baud_rate));

        if let Some(reply) = pending.reply.take() {
            let _ = reply.send(true);
        }
        Ok(())
    }

    /// Open or negotiation failed: Error state, reconnect later.
    fn fail_connect(&mut self, pending: PendingConnect, reason: String) -> Result<(), ActorError> {
        self.transition(ConnectionState::Error)?;
        self.log(format!(
            "Connection to {} failed: {}",
            pending.device.path, reason
        ));
        self.schedule_reconnect();
        if let Some(reply) = pending.reply {
            let _ = reply.send(false);
        }
        Ok(())
    }

    async fn handle_operation_timeout(&mut self, operation_id: u32) -> Result<(), ActorError> {
        if self.pending.as_ref().map(|p| p.operation_id) != Some(operation_id) {
            actor_debug!("Ignoring stale connect timeout (operation_id={})", operation_id);
            return Ok(());
        }
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        let reason = format!(
            "open timed out after {}s",
            self.supervision.connect_timeout_secs
        );
        self.fail_connect(pending, reason)
    }

    /// Tear down whatever is open. Returns once the read loop has stopped.
    async fn handle_disconnect(&mut self, explicit: bool) -> Result<(), ActorError> {
        if explicit {
            self.reconnect.cancel();
        }

        let cancelled_connect = match self.pending.take() {
            Some(pending) => {
                actor_debug!("Cancelling connect to {}", pending.device.path);
                if let Some(reply) = pending.reply {
                    let _ = reply.send(false);
                }
                true
            }
            None => false,
        };

        let had_session = match self.session.take() {
            Some(session) => {
                session.close(self.supervision.disconnect_timeout()).await;
                true
            }
            None => false,
        };

        self.framer.reset();

        if self.state == ConnectionState::Disconnected && !cancelled_connect && !had_session {
            actor_debug!("Already disconnected");
            return Ok(());
        }

        self.transition(ConnectionState::Disconnected)?;
        self.log("Disconnected");

        if !explicit {
            self.schedule_reconnect();
        }
        Ok(())
    }

    async fn handle_send(
        &mut self,
        line: String,
        reply: Option<oneshot::Sender<bool>>,
    ) -> Result<(), ActorError> {
        let Some(session) = &self.session else {
            self.log("Send failed: Not connected");
            if let Some(reply) = reply {
                let _ = reply.send(false);
            }
            return Ok(());
        };

        if let Err((e, reply)) = session.transmit(line, reply) {
            self.log(format!("Send failed: {}", e));
            if let Some(reply) = reply {
                let _ = reply.send(false);
            }
        }
        Ok(())
    }

    async fn handle_bytes(&mut self, session_id: u32, data: Vec<u8>) -> Result<(), ActorError> {
        if self.session.as_ref().map(LinkSession::id) != Some(session_id) {
            actor_debug!(
                "Dropping {} bytes from stale session {}",
                data.len(),
                session_id
            );
            return Ok(());
        }

        let lines: Vec<String> = self.framer.ingest(&data).collect();
        for line in lines {
            actor_debug!("RX: {}", line);
            if let Some(line_tx) = &self.line_tx {
                if let Err(e) = line_tx.unbounded_send(AlertMessage::Line { line: line.clone() }) {
                    actor_warn!("Alert actor gone, line not classified: {:?}", e.into_inner());
                }
            }
            self.send_ui_event(SystemEvent::LineReceived { line });
        }
        Ok(())
    }

    async fn handle_session_failed(
        &mut self,
        session_id: u32,
        reason: String,
    ) -> Result<(), ActorError> {
        if self.session.as_ref().map(LinkSession::id) != Some(session_id) {
            actor_debug!("Ignoring failure of stale session {}: {}", session_id, reason);
            return Ok(());
        }
        self.log(format!("Connection lost: {}", reason));
        self.handle_disconnect(false).await
    }

    /// Discover and connect to the first device, requesting access if needed.
    async fn auto_connect(&mut self) -> Result<(), ActorError> {
        if self.pending.is_some() || self.session.is_some() {
            actor_debug!("Auto-connect skipped: link busy ({:?})", self.state);
            return Ok(());
        }

        let devices = match self.provider.list() {
            Ok(devices) => devices,
            Err(e) => {
                self.log(format!("Device discovery failed: {}", e));
                self.schedule_reconnect();
                return Ok(());
            }
        };

        let Some(device) = devices.into_iter().next() else {
            actor_debug!("No devices found, retrying later");
            self.transition(ConnectionState::Disconnected)?;
            self.schedule_reconnect();
            return Ok(());
        };

        if !self.provider.has_access(&device) {
            return self.handle_request_access(device).await;
        }

        let params = self.config.default_params.clone();
        self.handle_connect(device, params, None).await
    }

    async fn handle_request_access(&mut self, device: DeviceDescriptor) -> Result<(), ActorError> {
        if !self.pending_access.insert(device.path.clone()) {
            actor_debug!("Access request for {} already pending", device.path);
            return Ok(());
        }

        self.log(format!("Requesting access to {}", device.label()));
        if let Err(e) = self.provider.request_access(&device) {
            self.pending_access.remove(&device.path);
            self.deny_access(&device, &e.to_string())?;
        }
        Ok(())
    }

    async fn handle_access_result(
        &mut self,
        device: DeviceDescriptor,
        granted: bool,
    ) -> Result<(), ActorError> {
        self.pending_access.remove(&device.path);

        if !granted {
            return self.deny_access(&device, "permission denied");
        }

        self.log(format!("Access granted for {}", device.path));
        let params = self.config.default_params.clone();
        self.handle_connect(device, params, None).await
    }

    /// Permission problems need the user; no automatic retry.
    ///
    /// A denial only moves the link to Error when nothing else owns it. An
    /// open in flight for the denied device is abandoned; its completion is
    /// then stale and closes the channel.
    fn deny_access(&mut self, device: &DeviceDescriptor, reason: &str) -> Result<(), ActorError> {
        if self.pending.as_ref().is_some_and(|p| p.device.path == device.path) {
            if let Some(pending) = self.pending.take() {
                actor_debug!("Abandoning connect to {}", pending.device.path);
                if let Some(reply) = pending.reply {
                    let _ = reply.send(false);
                }
            }
        }

        if self.pending.is_none() && self.session.is_none() {
            self.reconnect.cancel();
            if self.state.can_transition_to(ConnectionState::Error) {
                self.transition(ConnectionState::Error)?;
            }
        }
        self.log(format!("Access to {} refused: {}", device.path, reason));
        self.send_ui_event(SystemEvent::error(format!(
            "No permission for {}. Grant access to the device and reconnect.",
            device.path
        )));
        Ok(())
    }

    async fn handle_reconnect_timer(&mut self, timer_id: u32) -> Result<(), ActorError> {
        if !self.reconnect.fire(timer_id) {
            return Ok(());
        }
        if self.state == ConnectionState::Connected || self.pending.is_some() {
            return Ok(());
        }
        actor_debug!("Reconnect timer {} fired", timer_id);
        self.auto_connect().await
    }
}

/// Runs on the blocking pool: open the device, then apply `params`.
fn open_and_negotiate(
    provider: &dyn SerialProvider,
    device: &DeviceDescriptor,
    params: &LinkParams,
) -> Result<SharedChannel, TransportError> {
    let channel: SharedChannel = Arc::from(provider.open(device)?);
    if let Err(e) = channel.configure(params) {
        channel.close();
        return Err(match e {
            TransportError::Negotiation(reason) => TransportError::Negotiation(reason),
            other => TransportError::Negotiation(other.to_string()),
        });
    }
    Ok(channel)
}

impl Actor for LinkActor {
    type Message = LinkMessage;

    fn name(&self) -> &'static str {
        "LinkActor"
    }

    async fn init(&mut self) -> Result<(), ActorError> {
        if self.config.auto_connect {
            self.auto_connect().await?;
        }
        Ok(())
    }

    async fn handle(&mut self, msg: LinkMessage) -> Result<(), ActorError> {
        match msg {
            LinkMessage::Discover { reply } => {
                let _ = reply.send(self.provider.list());
            }
            LinkMessage::Connect {
                device,
                params,
                reply,
            } => self.handle_connect(device, params, reply).await?,
            LinkMessage::Disconnect { explicit, reply } => {
                let result = self.handle_disconnect(explicit).await;
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
                result?
            }
            LinkMessage::Send { line, reply } => self.handle_send(line, reply).await?,
            LinkMessage::RequestAccess { device } => self.handle_request_access(device).await?,
            LinkMessage::AutoConnect => self.auto_connect().await?,
            LinkMessage::DeviceAttached => {
                if self.state != ConnectionState::Connected && self.pending.is_none() {
                    self.log("Device attached");
                    self.auto_connect().await?
                }
            }
            LinkMessage::DeviceDetached => {
                if self.session.is_some() || self.pending.is_some() {
                    self.log("Device detached");
                }
                self.handle_disconnect(false).await?
            }
            LinkMessage::AccessResult { device, granted } => {
                self.handle_access_result(device, granted).await?
            }
            LinkMessage::OpenCompleted {
                operation_id,
                result,
            } => self.handle_open_completed(operation_id, result).await?,
            LinkMessage::OperationTimeout { operation_id } => {
                self.handle_operation_timeout(operation_id).await?
            }
            LinkMessage::BytesReceived { session_id, data } => {
                self.handle_bytes(session_id, data).await?
            }
            LinkMessage::SessionFailed { session_id, reason } => {
                self.handle_session_failed(session_id, reason).await?
            }
            LinkMessage::ReconnectTimerFired { timer_id } => {
                self.handle_reconnect_timer(timer_id).await?
            }
            LinkMessage::Shutdown { reply } => {
                let result = self.handle_disconnect(true).await;
                self.stopped = true;
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
                result?
            }
        }
        Ok(())
    }

    async fn shutdown(&mut self) {
        if self.session.is_some() || self.pending.is_some() {
            if let Err(e) = self.handle_disconnect(true).await {
                actor_warn!("Disconnect during shutdown failed: {}", e);
            }
        }
        self.reconnect.cancel();
    }

    fn should_stop(&self) -> bool {
        self.stopped
    }
}
