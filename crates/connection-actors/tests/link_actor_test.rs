//! Link actor lifecycle, driven message by message against a mock transport.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

mod common;

use std::time::Duration;

use actor_protocol::{ConnectionState, SystemEvent};
use actor_runtime::{Actor, AlertMessage, LinkMessage};
use common::{test_config, Harness, MockProvider};
use core_types::{DeviceDescriptor, LinkParams, TransportError};
use futures_channel::oneshot;

async fn reply_within<T>(rx: oneshot::Receiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(2), rx)
        .await
        .expect("reply timed out")
        .expect("reply dropped")
}

fn lines(events: &[SystemEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            SystemEvent::LineReceived { line } => Some(line.clone()),
            _ => None,
        })
        .collect()
}

fn states(events: &[SystemEvent]) -> Vec<ConnectionState> {
    events
        .iter()
        .filter_map(|e| match e {
            SystemEvent::StateChanged { state } => Some(*state),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_initial_state() {
    let h = Harness::new(MockProvider::with_devices(&["/dev/ttyUSB0"]), test_config());
    assert_eq!(h.actor.state(), ConnectionState::Disconnected);
    assert_eq!(h.state.get(), ConnectionState::Disconnected);
    assert!(!h.actor.has_session());
    assert!(!h.actor.reconnect_armed());
}

#[tokio::test]
async fn test_connect_opens_session() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0"]);
    let mut h = Harness::new(provider.clone(), test_config());

    let reply = h.connect("/dev/ttyUSB0").await;
    assert!(reply_within(reply).await);

    assert_eq!(h.actor.state(), ConnectionState::Connected);
    assert_eq!(h.state.get(), ConnectionState::Connected);
    assert_eq!(
        h.actor.connected_device().map(|d| d.path.as_str()),
        Some("/dev/ttyUSB0")
    );

    let channel = provider.last_channel();
    assert_eq!(channel.params(), Some(LinkParams::new_8n1(9600)));
    assert_eq!(channel.control_lines(), Some((true, true)));

    let events = h.drain_events();
    assert_eq!(
        states(&events),
        vec![ConnectionState::Connecting, ConnectionState::Connected]
    );
    assert!(events.contains(&SystemEvent::log("Connected! Baud rate: 9600")));
}

#[tokio::test]
async fn test_second_connect_rejected_while_first_in_flight() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0", "/dev/ttyUSB1"]);
    let mut h = Harness::new(provider.clone(), test_config());

    let (first_reply, first_rx) = oneshot::channel();
    h.handle(LinkMessage::Connect {
        device: DeviceDescriptor::new("/dev/ttyUSB0"),
        params: LinkParams::default(),
        reply: Some(first_reply),
    })
    .await;
    assert_eq!(h.actor.state(), ConnectionState::Connecting);
    let before = h.drain_events();

    let (second_reply, second_rx) = oneshot::channel();
    h.handle(LinkMessage::Connect {
        device: DeviceDescriptor::new("/dev/ttyUSB1"),
        params: LinkParams::new_8n1(115200),
        reply: Some(second_reply),
    })
    .await;

    // rejected with no state mutation
    assert!(!reply_within(second_rx).await);
    assert_eq!(h.actor.state(), ConnectionState::Connecting);
    assert!(states(&h.drain_events()).is_empty());
    assert_eq!(states(&before), vec![ConnectionState::Connecting]);

    h.pump_until("OpenCompleted").await;
    assert!(reply_within(first_rx).await);
    assert_eq!(h.actor.state(), ConnectionState::Connected);
    assert_eq!(provider.open_count(), 1);
    assert_eq!(h.actor.session_params().map(|p| p.baud_rate), Some(9600));
}

#[tokio::test]
async fn test_connect_rejected_while_connected() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0"]);
    let mut h = Harness::new(provider.clone(), test_config());
    assert!(reply_within(h.connect("/dev/ttyUSB0").await).await);
    h.drain_events();

    let (reply, rx) = oneshot::channel();
    h.handle(LinkMessage::Connect {
        device: DeviceDescriptor::new("/dev/ttyUSB0"),
        params: LinkParams::default(),
        reply: Some(reply),
    })
    .await;

    assert!(!reply_within(rx).await);
    assert_eq!(h.actor.state(), ConnectionState::Connected);
    assert!(h.drain_events().is_empty());
    assert_eq!(provider.open_count(), 1);
}

#[tokio::test]
async fn test_received_bytes_become_lines() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0"]);
    let mut h = Harness::new(provider.clone(), test_config());
    assert!(reply_within(h.connect("/dev/ttyUSB0").await).await);
    h.drain_events();

    let channel = provider.last_channel();
    channel.inject(b"SOS may");
    h.pump_until("BytesReceived").await;
    assert!(lines(&h.drain_events()).is_empty());
    assert_eq!(h.actor.buffered_bytes(), 7);

    channel.inject(b"day\r\n  \r\nstatus ok\n");
    h.pump_until("BytesReceived").await;

    assert_eq!(lines(&h.drain_events()), vec!["SOS mayday", "status ok"]);
    assert_eq!(h.actor.buffered_bytes(), 0);
}

#[tokio::test]
async fn test_disconnect_clears_framer_and_closes_port() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0"]);
    let mut h = Harness::new(provider.clone(), test_config());
    assert!(reply_within(h.connect("/dev/ttyUSB0").await).await);

    let channel = provider.last_channel();
    channel.inject(b"partial line without end");
    h.pump_until("BytesReceived").await;
    assert!(h.actor.buffered_bytes() > 0);
    h.drain_events();

    let (reply, rx) = oneshot::channel();
    h.handle(LinkMessage::Disconnect {
        explicit: true,
        reply: Some(reply),
    })
    .await;
    reply_within(rx).await;

    assert_eq!(h.actor.state(), ConnectionState::Disconnected);
    assert_eq!(h.actor.buffered_bytes(), 0);
    assert!(!h.actor.has_session());
    assert!(channel.is_closed());
    // explicit: no reconnect
    assert!(!h.actor.reconnect_armed());

    let events = h.drain_events();
    assert_eq!(states(&events), vec![ConnectionState::Disconnected]);
    assert!(events.contains(&SystemEvent::log("Disconnected")));
}

#[tokio::test]
async fn test_disconnect_when_disconnected_is_noop() {
    let mut h = Harness::new(MockProvider::with_devices(&[]), test_config());

    h.handle(LinkMessage::Disconnect {
        explicit: true,
        reply: None,
    })
    .await;
    h.handle(LinkMessage::Disconnect {
        explicit: false,
        reply: None,
    })
    .await;

    assert_eq!(h.actor.state(), ConnectionState::Disconnected);
    assert!(h.drain_events().is_empty());
    assert!(!h.actor.reconnect_armed());
}

#[tokio::test]
async fn test_unplug_arms_exactly_one_reconnect_timer() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0"]);
    let mut h = Harness::new(provider.clone(), test_config());
    assert!(reply_within(h.connect("/dev/ttyUSB0").await).await);
    assert_eq!(h.actor.reconnect_arm_count(), 0);

    h.handle(LinkMessage::DeviceDetached).await;
    assert_eq!(h.actor.state(), ConnectionState::Disconnected);
    assert!(h.actor.reconnect_armed());
    assert_eq!(h.actor.reconnect_arm_count(), 1);
    assert!(provider.last_channel().is_closed());

    // repeated unplug before the timer fires
    h.handle(LinkMessage::DeviceDetached).await;
    assert_eq!(h.actor.state(), ConnectionState::Disconnected);
    assert!(h.actor.reconnect_armed());
    assert_eq!(h.actor.reconnect_arm_count(), 1);
}

#[tokio::test]
async fn test_read_error_is_implicit_disconnect() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0"]);
    let mut h = Harness::new(provider.clone(), test_config());
    assert!(reply_within(h.connect("/dev/ttyUSB0").await).await);
    h.drain_events();

    provider
        .last_channel()
        .inject_error(TransportError::Io("device reports an error".into()));
    h.pump_until("SessionFailed").await;

    assert_eq!(h.actor.state(), ConnectionState::Disconnected);
    assert!(h.actor.reconnect_armed());
    let logs = h.drain_logs();
    assert!(logs
        .iter()
        .any(|l| l.starts_with("Connection lost: IO Error: device reports an error")));
}

#[tokio::test]
async fn test_explicit_disconnect_cancels_pending_reconnect() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0"]);
    let mut h = Harness::new(provider, test_config());
    assert!(reply_within(h.connect("/dev/ttyUSB0").await).await);

    h.handle(LinkMessage::DeviceDetached).await;
    assert!(h.actor.reconnect_armed());

    h.handle(LinkMessage::Disconnect {
        explicit: true,
        reply: None,
    })
    .await;
    assert!(!h.actor.reconnect_armed());
    assert_eq!(h.actor.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_open_failure_enters_error_and_schedules_reconnect() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0"]);
    provider.fail_open_with(Some(TransportError::ConnectionFailed("Device busy".into())));
    let mut h = Harness::new(provider, test_config());

    let reply = h.connect("/dev/ttyUSB0").await;
    assert!(!reply_within(reply).await);

    assert_eq!(h.actor.state(), ConnectionState::Error);
    assert!(!h.actor.has_session());
    assert!(h.actor.reconnect_armed());
    let events = h.drain_events();
    assert_eq!(
        states(&events),
        vec![ConnectionState::Connecting, ConnectionState::Error]
    );
}

#[tokio::test]
async fn test_connect_cancels_pending_reconnect_timer() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0"]);
    provider.fail_open_with(Some(TransportError::ConnectionFailed("busy".into())));
    let mut h = Harness::new(provider.clone(), test_config());
    assert!(!reply_within(h.connect("/dev/ttyUSB0").await).await);
    assert!(h.actor.reconnect_armed());

    provider.fail_open_with(None);
    assert!(reply_within(h.connect("/dev/ttyUSB0").await).await);
    assert!(!h.actor.reconnect_armed());
    assert_eq!(h.actor.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn test_reconnect_timer_reconnects() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0"]);
    provider.fail_open_with(Some(TransportError::ConnectionFailed("busy".into())));
    let mut config = test_config();
    config.reconnect_delay_ms = 20;
    let mut h = Harness::new(provider.clone(), config);

    assert!(!reply_within(h.connect("/dev/ttyUSB0").await).await);
    provider.fail_open_with(None);

    h.pump_until("ReconnectTimerFired").await;
    assert_eq!(h.actor.state(), ConnectionState::Connecting);
    h.pump_until("OpenCompleted").await;

    assert_eq!(h.actor.state(), ConnectionState::Connected);
    assert_eq!(provider.open_count(), 1);
}

#[tokio::test]
async fn test_auto_connect_without_devices_rearms() {
    let provider = MockProvider::with_devices(&[]);
    let mut config = test_config();
    config.reconnect_delay_ms = 20;
    let mut h = Harness::new(provider.clone(), config);

    h.handle(LinkMessage::AutoConnect).await;
    assert_eq!(h.actor.state(), ConnectionState::Disconnected);
    assert!(h.actor.reconnect_armed());

    // fires, finds nothing, re-arms
    h.pump_until("ReconnectTimerFired").await;
    assert!(h.actor.reconnect_armed());
    assert_eq!(h.actor.reconnect_arm_count(), 2);
    assert_eq!(provider.list_calls(), 2);

    provider.set_devices(&["/dev/ttyACM0"]);
    h.pump_until("ReconnectTimerFired").await;
    h.pump_until("OpenCompleted").await;
    assert_eq!(h.actor.state(), ConnectionState::Connected);
    assert_eq!(
        h.actor.connected_device().map(|d| d.path.as_str()),
        Some("/dev/ttyACM0")
    );
}

#[tokio::test]
async fn test_init_auto_connects() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0"]);
    let mut config = test_config();
    config.auto_connect = true;
    config.default_params = LinkParams::new_8n1(115200);
    let mut h = Harness::new(provider.clone(), config);

    h.actor.init().await.unwrap();
    assert_eq!(h.actor.state(), ConnectionState::Connecting);
    h.pump_until("OpenCompleted").await;

    assert_eq!(h.actor.state(), ConnectionState::Connected);
    assert_eq!(
        provider.last_channel().params().map(|p| p.baud_rate),
        Some(115200)
    );
}

#[tokio::test]
async fn test_device_attached_triggers_auto_connect() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0"]);
    let mut h = Harness::new(provider.clone(), test_config());

    h.handle(LinkMessage::DeviceAttached).await;
    h.pump_until("OpenCompleted").await;
    assert_eq!(h.actor.state(), ConnectionState::Connected);

    // ignored while connected
    h.handle(LinkMessage::DeviceAttached).await;
    assert_eq!(provider.open_count(), 1);
}

#[tokio::test]
async fn test_access_request_is_not_duplicated() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0"]);
    provider.deny_access("/dev/ttyUSB0");
    let mut h = Harness::new(provider.clone(), test_config());

    h.handle(LinkMessage::AutoConnect).await;
    h.handle(LinkMessage::AutoConnect).await;
    h.handle(LinkMessage::RequestAccess {
        device: DeviceDescriptor::new("/dev/ttyUSB0"),
    })
    .await;

    assert_eq!(provider.access_requests(), vec!["/dev/ttyUSB0"]);
    assert_eq!(provider.open_count(), 0);
    assert_eq!(h.actor.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_access_denied_enters_error_without_retry() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0"]);
    provider.deny_access("/dev/ttyUSB0");
    let mut h = Harness::new(provider.clone(), test_config());

    h.handle(LinkMessage::AutoConnect).await;
    h.handle(LinkMessage::AccessResult {
        device: DeviceDescriptor::new("/dev/ttyUSB0"),
        granted: false,
    })
    .await;

    assert_eq!(h.actor.state(), ConnectionState::Error);
    assert!(!h.actor.reconnect_armed());
    let events = h.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, SystemEvent::Error { message } if message.contains("No permission"))));

    // a new request is allowed once the previous one resolved
    h.handle(LinkMessage::AutoConnect).await;
    assert_eq!(provider.access_requests().len(), 2);
}

#[tokio::test]
async fn test_access_granted_connects() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0"]);
    provider.deny_access("/dev/ttyUSB0");
    let mut h = Harness::new(provider.clone(), test_config());

    h.handle(LinkMessage::AutoConnect).await;
    h.handle(LinkMessage::AccessResult {
        device: DeviceDescriptor::new("/dev/ttyUSB0"),
        granted: true,
    })
    .await;
    h.pump_until("OpenCompleted").await;

    assert_eq!(h.actor.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn test_send_appends_crlf_and_echoes() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0"]);
    let mut h = Harness::new(provider.clone(), test_config());
    assert!(reply_within(h.connect("/dev/ttyUSB0").await).await);
    h.drain_events();

    let (reply, rx) = oneshot::channel();
    h.handle(LinkMessage::Send {
        line: "ATZ".into(),
        reply: Some(reply),
    })
    .await;
    assert!(reply_within(rx).await);

    assert_eq!(provider.last_channel().written(), "ATZ\r\n");
    assert!(h.drain_logs().contains(&"TX: ATZ".to_string()));
}

#[tokio::test]
async fn test_send_without_session_fails() {
    let mut h = Harness::new(MockProvider::with_devices(&[]), test_config());

    let (reply, rx) = oneshot::channel();
    h.handle(LinkMessage::Send {
        line: "hello".into(),
        reply: Some(reply),
    })
    .await;

    assert!(!reply_within(rx).await);
    assert_eq!(h.drain_logs(), vec!["Send failed: Not connected"]);
    assert_eq!(h.actor.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_write_timeout_is_reported_not_fatal() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0"]);
    let mut h = Harness::new(provider.clone(), test_config());
    assert!(reply_within(h.connect("/dev/ttyUSB0").await).await);
    h.drain_events();

    provider
        .last_channel()
        .fail_writes_with(TransportError::Timeout(Duration::ZERO));

    let (reply, rx) = oneshot::channel();
    h.handle(LinkMessage::Send {
        line: "ping".into(),
        reply: Some(reply),
    })
    .await;
    assert!(!reply_within(rx).await);

    assert_eq!(h.actor.state(), ConnectionState::Connected);
    assert!(h
        .drain_logs()
        .iter()
        .any(|l| l.starts_with("Send failed: Write timed out")));
}

#[tokio::test]
async fn test_stale_bytes_after_disconnect_are_dropped() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0"]);
    let mut h = Harness::new(provider, test_config());
    assert!(reply_within(h.connect("/dev/ttyUSB0").await).await);

    h.handle(LinkMessage::Disconnect {
        explicit: true,
        reply: None,
    })
    .await;
    h.drain_events();

    h.handle(LinkMessage::BytesReceived {
        session_id: 1,
        data: b"late line\n".to_vec(),
    })
    .await;

    assert!(lines(&h.drain_events()).is_empty());
    assert_eq!(h.actor.buffered_bytes(), 0);
}

#[tokio::test]
async fn test_disconnect_cancels_in_flight_connect() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0"]);
    let mut h = Harness::new(provider.clone(), test_config());

    let (reply, rx) = oneshot::channel();
    h.handle(LinkMessage::Connect {
        device: DeviceDescriptor::new("/dev/ttyUSB0"),
        params: LinkParams::default(),
        reply: Some(reply),
    })
    .await;
    h.handle(LinkMessage::Disconnect {
        explicit: true,
        reply: None,
    })
    .await;
    assert!(!reply_within(rx).await);
    assert_eq!(h.actor.state(), ConnectionState::Disconnected);

    // the open still completes in the background and is discarded
    h.pump_until("OpenCompleted").await;
    assert_eq!(h.actor.state(), ConnectionState::Disconnected);
    assert!(!h.actor.has_session());
    assert!(provider.last_channel().is_closed());
}

#[tokio::test]
async fn test_open_denied_is_a_permission_error() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0"]);
    provider.fail_open_with(Some(TransportError::AccessDenied(
        "/dev/ttyUSB0: Permission denied".into(),
    )));
    let mut h = Harness::new(provider, test_config());

    assert!(!reply_within(h.connect("/dev/ttyUSB0").await).await);

    assert_eq!(h.actor.state(), ConnectionState::Error);
    // needs the user, so no automatic retry
    assert!(!h.actor.reconnect_armed());
    let events = h.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, SystemEvent::Error { message } if message.contains("/dev/ttyUSB0"))));
}

#[tokio::test]
async fn test_denial_for_other_device_leaves_connect_in_flight() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0", "/dev/ttyUSB1"]);
    let mut h = Harness::new(provider.clone(), test_config());

    let (reply, rx) = oneshot::channel();
    h.handle(LinkMessage::Connect {
        device: DeviceDescriptor::new("/dev/ttyUSB0"),
        params: LinkParams::default(),
        reply: Some(reply),
    })
    .await;
    h.handle(LinkMessage::AccessResult {
        device: DeviceDescriptor::new("/dev/ttyUSB1"),
        granted: false,
    })
    .await;

    assert_eq!(h.actor.state(), ConnectionState::Connecting);
    assert!(h.actor.is_connect_pending());
    let events = h.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, SystemEvent::Error { message } if message.contains("/dev/ttyUSB1"))));

    h.pump_until("OpenCompleted").await;
    assert!(reply_within(rx).await);
    assert_eq!(h.actor.state(), ConnectionState::Connected);
    assert_eq!(h.state.get(), ConnectionState::Connected);
    assert!(h.actor.has_session());
    assert!(!provider.last_channel().is_closed());
}

#[tokio::test]
async fn test_denial_for_device_being_opened_fails_connect() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0"]);
    let mut h = Harness::new(provider.clone(), test_config());

    let (reply, rx) = oneshot::channel();
    h.handle(LinkMessage::Connect {
        device: DeviceDescriptor::new("/dev/ttyUSB0"),
        params: LinkParams::default(),
        reply: Some(reply),
    })
    .await;
    h.handle(LinkMessage::AccessResult {
        device: DeviceDescriptor::new("/dev/ttyUSB0"),
        granted: false,
    })
    .await;

    assert!(!reply_within(rx).await);
    assert_eq!(h.actor.state(), ConnectionState::Error);
    assert!(!h.actor.is_connect_pending());
    assert!(!h.actor.reconnect_armed());

    // the abandoned open still completes and its port is released
    h.pump_until("OpenCompleted").await;
    assert!(!h.actor.has_session());
    assert_eq!(h.actor.state(), ConnectionState::Error);
    assert!(provider.last_channel().is_closed());

    assert!(reply_within(h.connect("/dev/ttyUSB0").await).await);
    assert_eq!(h.actor.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn test_denial_while_connected_keeps_session() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0", "/dev/ttyUSB1"]);
    let mut h = Harness::new(provider.clone(), test_config());
    assert!(reply_within(h.connect("/dev/ttyUSB0").await).await);
    h.drain_events();

    h.handle(LinkMessage::AccessResult {
        device: DeviceDescriptor::new("/dev/ttyUSB1"),
        granted: false,
    })
    .await;

    assert_eq!(h.actor.state(), ConnectionState::Connected);
    assert!(h.actor.has_session());
    assert!(states(&h.drain_events()).is_empty());
}

#[tokio::test]
async fn test_every_line_reaches_alert_queue() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0"]);
    let (mut h, mut alert_rx) = Harness::new(provider, test_config()).with_alert_queue();
    assert!(reply_within(h.connect("/dev/ttyUSB0").await).await);

    // far more lines than any bounded alert queue would hold, nobody consuming
    let mut data = "status ok\n".repeat(1000).into_bytes();
    data.extend_from_slice(b"SOS mayday\n");
    h.handle(LinkMessage::BytesReceived {
        session_id: 1,
        data,
    })
    .await;

    let mut received = Vec::new();
    while let Ok(Some(msg)) = alert_rx.try_next() {
        received.push(msg);
    }
    assert_eq!(received.len(), 1001);
    assert_eq!(
        received.last(),
        Some(&AlertMessage::Line {
            line: "SOS mayday".into()
        })
    );
}

#[tokio::test]
async fn test_hung_open_times_out_into_error_with_reconnect() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0"]);
    provider.delay_open_by(Duration::from_millis(1500));
    let mut config = test_config();
    config.connect_timeout_secs = 1;
    let mut h = Harness::new(provider.clone(), config);

    let (reply, rx) = oneshot::channel();
    h.handle(LinkMessage::Connect {
        device: DeviceDescriptor::new("/dev/ttyUSB0"),
        params: LinkParams::default(),
        reply: Some(reply),
    })
    .await;
    h.pump_until("OperationTimeout").await;

    assert!(!reply_within(rx).await);
    assert_eq!(h.actor.state(), ConnectionState::Error);
    assert!(!h.actor.is_connect_pending());
    assert!(h.actor.reconnect_armed());
    assert!(h
        .drain_logs()
        .contains(&"Connection to /dev/ttyUSB0 failed: open timed out after 1s".to_string()));
}

#[tokio::test]
async fn test_open_completing_after_timeout_is_closed() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0"]);
    provider.delay_open_by(Duration::from_millis(1500));
    let mut config = test_config();
    config.connect_timeout_secs = 1;
    let mut h = Harness::new(provider.clone(), config);

    h.handle(LinkMessage::Connect {
        device: DeviceDescriptor::new("/dev/ttyUSB0"),
        params: LinkParams::default(),
        reply: None,
    })
    .await;
    h.pump_until("OperationTimeout").await;
    h.pump_until("OpenCompleted").await;

    assert_eq!(provider.open_count(), 1);
    assert!(provider.last_channel().is_closed());
    assert!(!h.actor.has_session());
    assert_eq!(h.actor.state(), ConnectionState::Error);
    assert!(h.actor.reconnect_armed());
}

#[tokio::test]
async fn test_write_error_is_implicit_disconnect() {
    let provider = MockProvider::with_devices(&["/dev/ttyUSB0"]);
    let mut h = Harness::new(provider.clone(), test_config());
    assert!(reply_within(h.connect("/dev/ttyUSB0").await).await);
    h.drain_events();

    let channel = provider.last_channel();
    channel.fail_writes_with(TransportError::Io("device unplugged".into()));

    let (reply, rx) = oneshot::channel();
    h.handle(LinkMessage::Send {
        line: "ATI".into(),
        reply: Some(reply),
    })
    .await;
    assert!(!reply_within(rx).await);
    h.pump_until("SessionFailed").await;

    assert_eq!(h.actor.state(), ConnectionState::Disconnected);
    assert!(!h.actor.has_session());
    assert!(h.actor.reconnect_armed());
    assert!(channel.is_closed());
    let logs = h.drain_logs();
    assert!(logs.contains(&"Send failed: IO Error: device unplugged".to_string()));
    assert!(logs.contains(&"Connection lost: IO Error: device unplugged".to_string()));
}
