//! Scripted in-memory transport for link actor tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actor_protocol::SystemEvent;
use actor_runtime::{Actor, AlertMessage, LinkMessage, StateCell};
use connection_actors::{LinkActor, LinkConfig};
use core_types::{
    DeviceDescriptor, LinkParams, SerialChannel, SerialProvider, TransportError,
};
use futures::stream::StreamExt;
use futures_channel::mpsc;

const MOCK_READ_WINDOW: Duration = Duration::from_millis(5);

/// Device side of a mock port. Tests push bytes or errors into it and
/// inspect what the link wrote.
pub struct MockChannel {
    rx: Mutex<std_mpsc::Receiver<Result<Vec<u8>, TransportError>>>,
    tx: Mutex<std_mpsc::Sender<Result<Vec<u8>, TransportError>>>,
    written: Mutex<Vec<u8>>,
    write_error: Mutex<Option<TransportError>>,
    params: Mutex<Option<LinkParams>>,
    control_lines: Mutex<Option<(bool, bool)>>,
    closed: AtomicBool,
}

impl MockChannel {
    fn new() -> Arc<Self> {
        let (tx, rx) = std_mpsc::channel();
        Arc::new(Self {
            rx: Mutex::new(rx),
            tx: Mutex::new(tx),
            written: Mutex::new(Vec::new()),
            write_error: Mutex::new(None),
            params: Mutex::new(None),
            control_lines: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    pub fn inject(&self, bytes: &[u8]) {
        let _ = self.tx.lock().unwrap().send(Ok(bytes.to_vec()));
    }

    pub fn inject_error(&self, err: TransportError) {
        let _ = self.tx.lock().unwrap().send(Err(err));
    }

    pub fn fail_writes_with(&self, err: TransportError) {
        *self.write_error.lock().unwrap() = Some(err);
    }

    pub fn written(&self) -> String {
        String::from_utf8_lossy(&self.written.lock().unwrap()).into_owned()
    }

    pub fn params(&self) -> Option<LinkParams> {
        self.params.lock().unwrap().clone()
    }

    pub fn control_lines(&self) -> Option<(bool, bool)> {
        *self.control_lines.lock().unwrap()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// What the provider hands to the link: a reference to the shared mock.
struct ChannelRef(Arc<MockChannel>);

impl SerialChannel for ChannelRef {
    fn configure(&self, params: &LinkParams) -> Result<(), TransportError> {
        *self.0.params.lock().unwrap() = Some(params.clone());
        Ok(())
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if self.0.is_closed() {
            return Err(TransportError::NotConnected);
        }
        match self.0.rx.lock().unwrap().recv_timeout(MOCK_READ_WINDOW) {
            Ok(Ok(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(0),
        }
    }

    fn write(&self, data: &[u8], timeout: Duration) -> Result<(), TransportError> {
        if self.0.is_closed() {
            return Err(TransportError::NotConnected);
        }
        if let Some(err) = self.0.write_error.lock().unwrap().clone() {
            if matches!(err, TransportError::Timeout(_)) {
                return Err(TransportError::Timeout(timeout));
            }
            return Err(err);
        }
        self.0.written.lock().unwrap().extend_from_slice(data);
        Ok(())
    }

    fn set_control_lines(&self, dtr: bool, rts: bool) -> Result<(), TransportError> {
        *self.0.control_lines.lock().unwrap() = Some((dtr, rts));
        Ok(())
    }

    fn close(&self) {
        self.0.closed.store(true, Ordering::Release);
    }
}

#[derive(Default)]
struct ProviderState {
    devices: Vec<DeviceDescriptor>,
    denied: HashSet<String>,
    open_error: Option<TransportError>,
    open_delay: Option<Duration>,
    access_requests: Vec<String>,
    opened: Vec<Arc<MockChannel>>,
}

/// Scripted provider: a list of attached devices, per-device access, an
/// optional open failure, and a record of every opened channel.
#[derive(Default)]
pub struct MockProvider {
    state: Mutex<ProviderState>,
    list_calls: AtomicUsize,
}

impl MockProvider {
    pub fn with_devices(paths: &[&str]) -> Arc<Self> {
        let provider = Self::default();
        provider.state.lock().unwrap().devices =
            paths.iter().map(|p| DeviceDescriptor::new(*p)).collect();
        Arc::new(provider)
    }

    pub fn set_devices(&self, paths: &[&str]) {
        self.state.lock().unwrap().devices =
            paths.iter().map(|p| DeviceDescriptor::new(*p)).collect();
    }

    pub fn deny_access(&self, path: &str) {
        self.state.lock().unwrap().denied.insert(path.to_string());
    }

    pub fn fail_open_with(&self, err: Option<TransportError>) {
        self.state.lock().unwrap().open_error = err;
    }

    /// Make every open block for `delay` before completing.
    pub fn delay_open_by(&self, delay: Duration) {
        self.state.lock().unwrap().open_delay = Some(delay);
    }

    pub fn access_requests(&self) -> Vec<String> {
        self.state.lock().unwrap().access_requests.clone()
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().unwrap().opened.len()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::Acquire)
    }

    /// Most recently opened channel.
    pub fn last_channel(&self) -> Arc<MockChannel> {
        self.state
            .lock()
            .unwrap()
            .opened
            .last()
            .cloned()
            .expect("no channel opened")
    }
}

impl SerialProvider for MockProvider {
    fn list(&self) -> Result<Vec<DeviceDescriptor>, TransportError> {
        self.list_calls.fetch_add(1, Ordering::AcqRel);
        Ok(self.state.lock().unwrap().devices.clone())
    }

    fn has_access(&self, device: &DeviceDescriptor) -> bool {
        !self.state.lock().unwrap().denied.contains(&device.path)
    }

    fn request_access(&self, device: &DeviceDescriptor) -> Result<(), TransportError> {
        self.state
            .lock()
            .unwrap()
            .access_requests
            .push(device.path.clone());
        Ok(())
    }

    fn open(&self, device: &DeviceDescriptor) -> Result<Box<dyn SerialChannel>, TransportError> {
        let delay = self.state.lock().unwrap().open_delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.open_error.clone() {
            return Err(err);
        }
        if !state.devices.iter().any(|d| d.path == device.path) {
            return Err(TransportError::ConnectionFailed(format!(
                "{}: no such device",
                device.path
            )));
        }
        let channel = MockChannel::new();
        state.opened.push(channel.clone());
        Ok(Box::new(ChannelRef(channel)))
    }
}

/// A link actor driven by hand: the test calls `handle` and pumps the
/// actor's self-addressed messages explicitly.
pub struct Harness {
    pub actor: LinkActor,
    pub link_rx: mpsc::Receiver<LinkMessage>,
    pub link_tx: mpsc::Sender<LinkMessage>,
    pub event_rx: mpsc::Receiver<SystemEvent>,
    pub state: StateCell,
}

pub fn test_config() -> LinkConfig {
    LinkConfig {
        reconnect_delay_ms: 60_000,
        write_timeout_ms: 50,
        read_timeout_ms: 5,
        connect_timeout_secs: 5,
        auto_connect: false,
        default_params: LinkParams::default(),
    }
}

impl Harness {
    pub fn new(provider: Arc<MockProvider>, config: LinkConfig) -> Self {
        let (link_tx, link_rx) = mpsc::channel(256);
        let (event_tx, event_rx) = mpsc::channel(1024);
        let state = StateCell::new();
        let actor = LinkActor::new(provider, config, state.clone(), link_tx.clone(), event_tx);
        Self {
            actor,
            link_rx,
            link_tx,
            event_rx,
            state,
        }
    }

    /// Route received lines to a queue the test reads.
    pub fn with_alert_queue(mut self) -> (Self, mpsc::UnboundedReceiver<AlertMessage>) {
        let (alert_tx, alert_rx) = mpsc::unbounded();
        self.actor = self.actor.with_line_subscriber(alert_tx);
        (self, alert_rx)
    }

    pub async fn handle(&mut self, msg: LinkMessage) {
        self.actor.handle(msg).await.expect("handler failed");
    }

    /// Wait for the next self-addressed message and feed it to the actor.
    pub async fn pump(&mut self) -> String {
        let msg = tokio::time::timeout(Duration::from_secs(2), self.link_rx.next())
            .await
            .expect("timed out waiting for link message")
            .expect("link channel closed");
        let name = format!("{:?}", msg);
        self.handle(msg).await;
        name
    }

    /// Pump until a message whose Debug output starts with `prefix` is handled.
    pub async fn pump_until(&mut self, prefix: &str) {
        for _ in 0..200 {
            if self.pump().await.starts_with(prefix) {
                return;
            }
        }
        panic!("never saw {}", prefix);
    }

    /// Connect with default params and complete the open.
    pub async fn connect(&mut self, path: &str) -> futures_channel::oneshot::Receiver<bool> {
        let (reply, rx) = futures_channel::oneshot::channel();
        self.handle(LinkMessage::Connect {
            device: DeviceDescriptor::new(path),
            params: LinkParams::default(),
            reply: Some(reply),
        })
        .await;
        self.pump_until("OpenCompleted").await;
        rx
    }

    pub fn drain_events(&mut self) -> Vec<SystemEvent> {
        let mut events = Vec::new();
        while let Ok(Some(event)) = self.event_rx.try_next() {
            events.push(event);
        }
        events
    }

    pub fn drain_logs(&mut self) -> Vec<String> {
        self.drain_events()
            .into_iter()
            .filter_map(|e| match e {
                SystemEvent::Log { message } => Some(message),
                _ => None,
            })
            .collect()
    }
}
