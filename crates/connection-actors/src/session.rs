//! One open connection: the channel plus its read loop and writer thread.
//!
//! Both loops block on the channel, so they run on tokio's blocking pool and
//! talk to the link actor through its queue. The actor drops anything tagged
//! with a session id other than the current one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::time::Duration;

use actor_protocol::SystemEvent;
use actor_runtime::{actor_debug, actor_warn, LinkMessage};
use core_types::{DeviceDescriptor, LinkParams, SharedChannel, TransportError};
use futures_channel::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::constants::{io, LINE_TERMINATOR};

/// A line waiting for the writer thread.
pub(crate) struct TransmitRequest {
    line: String,
    reply: Option<oneshot::Sender<bool>>,
}

pub(crate) struct LinkSession {
    id: u32,
    device: DeviceDescriptor,
    params: LinkParams,
    channel: SharedChannel,
    cancel_flag: Arc<AtomicBool>,
    transmit_tx: Option<std_mpsc::SyncSender<TransmitRequest>>,
    reader: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
}

impl LinkSession {
    /// Start the read loop and the writer on an already configured channel.
    pub(crate) fn start(
        id: u32,
        device: DeviceDescriptor,
        params: LinkParams,
        channel: SharedChannel,
        write_timeout: Duration,
        link_tx: mpsc::Sender<LinkMessage>,
        event_tx: mpsc::Sender<SystemEvent>,
    ) -> Self {
        let cancel_flag = Arc::new(AtomicBool::new(false));
        let (transmit_tx, transmit_rx) =
            std_mpsc::sync_channel::<TransmitRequest>(io::TRANSMIT_QUEUE_DEPTH);

        let reader = {
            let channel = channel.clone();
            let cancel_flag = cancel_flag.clone();
            let link_tx = link_tx.clone();
            tokio::task::spawn_blocking(move || read_loop(id, channel, cancel_flag, link_tx))
        };

        let writer = {
            let channel = channel.clone();
            let cancel_flag = cancel_flag.clone();
            tokio::task::spawn_blocking(move || {
                write_loop(
                    id,
                    channel,
                    transmit_rx,
                    write_timeout,
                    cancel_flag,
                    link_tx,
                    event_tx,
                )
            })
        };

        Self {
            id,
            device,
            params,
            channel,
            cancel_flag,
            transmit_tx: Some(transmit_tx),
            reader: Some(reader),
            writer: Some(writer),
        }
    }

    pub(crate) fn id(&self) -> u32 {
        self.id
    }

    pub(crate) fn device(&self) -> &DeviceDescriptor {
        &self.device
    }

    pub(crate) fn params(&self) -> &LinkParams {
        &self.params
    }

    /// Queue a line for the writer. Never blocks; a full queue fails the send.
    pub(crate) fn transmit(
        &self,
        line: String,
        reply: Option<oneshot::Sender<bool>>,
    ) -> Result<(), (TransportError, Option<oneshot::Sender<bool>>)> {
        let Some(tx) = &self.transmit_tx else {
            return Err((TransportError::NotConnected, reply));
        };
        tx.try_send(TransmitRequest { line, reply }).map_err(|e| match e {
            std_mpsc::TrySendError::Full(req) => (
                TransportError::Io("transmit queue full".into()),
                req.reply,
            ),
            std_mpsc::TrySendError::Disconnected(req) => (TransportError::NotConnected, req.reply),
        })
    }

    /// Stop both loops and release the channel.
    ///
    /// Waits up to `timeout` per loop. A loop that does not exit in time is
    /// detached; it observes the cancel flag and emits nothing further.
    pub(crate) async fn close(mut self, timeout: Duration) {
        self.cancel_flag.store(true, Ordering::Release);
        // Writer drains its queue (replying false) and exits once the sender is gone
        self.transmit_tx.take();

        for (name, handle) in [("read loop", self.reader.take()), ("writer", self.writer.take())] {
            let Some(handle) = handle else { continue };
            match tokio::time::timeout(timeout, handle).await {
                Ok(Ok(())) => actor_debug!("Session {}: {} stopped", self.id, name),
                Ok(Err(e)) => actor_warn!("Session {}: {} task failed: {}", self.id, name, e),
                Err(_) => actor_warn!(
                    "Session {}: {} still running after {} ms, detaching",
                    self.id,
                    name,
                    timeout.as_millis()
                ),
            }
        }

        self.channel.close();
    }
}

impl Drop for LinkSession {
    fn drop(&mut self) {
        // Covers sessions dropped without close(), e.g. when the actor stops
        if !self.cancel_flag.swap(true, Ordering::AcqRel) {
            self.channel.close();
        }
    }
}

/// Post to the actor, waiting out a full queue instead of dropping data.
///
/// Returns false once the session is cancelled or the actor is gone.
fn forward(
    link_tx: &mut mpsc::Sender<LinkMessage>,
    cancel_flag: &AtomicBool,
    msg: LinkMessage,
) -> bool {
    let mut msg = msg;
    loop {
        match link_tx.try_send(msg) {
            Ok(()) => return true,
            Err(e) if e.is_full() => {
                if cancel_flag.load(Ordering::Acquire) {
                    return false;
                }
                msg = e.into_inner();
                std::thread::sleep(Duration::from_millis(io::BACKPRESSURE_RETRY_MS));
            }
            Err(_) => return false,
        }
    }
}

fn read_loop(
    session_id: u32,
    channel: SharedChannel,
    cancel_flag: Arc<AtomicBool>,
    mut link_tx: mpsc::Sender<LinkMessage>,
) {
    let mut buf = vec![0u8; io::READ_CHUNK_BYTES];

    while !cancel_flag.load(Ordering::Acquire) {
        match channel.read(&mut buf) {
            Ok(0) => continue,
            Ok(n) => {
                let data = buf.get(..n).map(<[u8]>::to_vec).unwrap_or_default();
                let msg = LinkMessage::BytesReceived { session_id, data };
                if !forward(&mut link_tx, &cancel_flag, msg) {
                    break;
                }
            }
            Err(e) => {
                if !cancel_flag.load(Ordering::Acquire) {
                    let msg = LinkMessage::SessionFailed {
                        session_id,
                        reason: e.to_string(),
                    };
                    forward(&mut link_tx, &cancel_flag, msg);
                }
                break;
            }
        }
    }

    // The read loop owns the port lifetime: whoever ends the loop, the port closes
    channel.close();
    actor_debug!("Session {}: read loop exited", session_id);
}

fn write_loop(
    session_id: u32,
    channel: SharedChannel,
    transmit_rx: std_mpsc::Receiver<TransmitRequest>,
    write_timeout: Duration,
    cancel_flag: Arc<AtomicBool>,
    mut link_tx: mpsc::Sender<LinkMessage>,
    mut event_tx: mpsc::Sender<SystemEvent>,
) {
    while let Ok(TransmitRequest { line, reply }) = transmit_rx.recv() {
        if cancel_flag.load(Ordering::Acquire) {
            if let Some(reply) = reply {
                let _ = reply.send(false);
            }
            continue;
        }

        let mut payload = line.clone();
        payload.push_str(LINE_TERMINATOR);

        let ok = match channel.write(payload.as_bytes(), write_timeout) {
            Ok(()) => {
                let _ = event_tx.try_send(SystemEvent::log(format!("TX: {}", line)));
                true
            }
            Err(e) => {
                actor_warn!("Session {}: send failed: {}", session_id, e);
                if !cancel_flag.load(Ordering::Acquire) {
                    let _ = event_tx.try_send(SystemEvent::log(format!("Send failed: {}", e)));
                    // A stalled device only fails this write; anything else means the port is gone
                    if !matches!(e, TransportError::Timeout(_)) {
                        let msg = LinkMessage::SessionFailed {
                            session_id,
                            reason: e.to_string(),
                        };
                        forward(&mut link_tx, &cancel_flag, msg);
                    }
                }
                false
            }
        };

        if let Some(reply) = reply {
            let _ = reply.send(ok);
        }
    }

    actor_debug!("Session {}: writer exited", session_id);
}
