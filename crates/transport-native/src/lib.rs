//! # Native Transport
//!
//! [`SerialProvider`] over the `serialport` crate for Linux, macOS and
//! Windows.
//!
//! Desktop systems grant device access at `open()` time (group membership
//! on Linux, driver install on Windows), so there is no runtime permission
//! prompt: [`NativeSerialProvider::has_access`] is optimistic and a denied
//! open surfaces as [`TransportError::AccessDenied`].

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod convert;
pub mod hotplug;

use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use actor_runtime::actor_debug;
use core_types::{DeviceDescriptor, LinkParams, SerialChannel, SerialProvider, TransportError};
use serialport::{SerialPort, SerialPortType};

use crate::convert::{
    map_serial_error, to_serialport_data_bits, to_serialport_parity, to_serialport_stop_bits,
};

pub use hotplug::spawn_hotplug_watcher;

/// Which enumerated ports count as candidate devices.
#[derive(Debug, Clone, Default)]
pub struct DeviceFilter {
    /// Only USB serial adapters (the default); otherwise every port
    pub include_non_usb: bool,
    /// Restrict to these (vid, pid) pairs when non-empty
    pub usb_ids: Vec<(u16, u16)>,
    /// Only this port, USB or not; overrides the other fields
    pub only_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NativeSerialProvider {
    filter: DeviceFilter,
    read_timeout: Duration,
}

impl NativeSerialProvider {
    pub fn new(read_timeout: Duration) -> Self {
        Self {
            filter: DeviceFilter::default(),
            read_timeout,
        }
    }

    pub fn with_filter(mut self, filter: DeviceFilter) -> Self {
        self.filter = filter;
        self
    }

    fn accepts(&self, port: &serialport::SerialPortInfo) -> bool {
        // macOS lists each device twice; tty.* blocks on open waiting for carrier detect
        if let Some(path) = &self.filter.only_path {
            return &port.port_name == path;
        }
        if cfg!(target_os = "macos") && port.port_name.starts_with("/dev/tty.") {
            return false;
        }
        match &port.port_type {
            SerialPortType::UsbPort(usb) => {
                self.filter.usb_ids.is_empty()
                    || self.filter.usb_ids.contains(&(usb.vid, usb.pid))
            }
            _ => self.filter.include_non_usb && self.filter.usb_ids.is_empty(),
        }
    }
}

impl SerialProvider for NativeSerialProvider {
    fn list(&self) -> Result<Vec<DeviceDescriptor>, TransportError> {
        let ports = serialport::available_ports()
            .map_err(|e| TransportError::Io(format!("Failed to enumerate ports: {}", e)))?;

        Ok(ports
            .into_iter()
            .filter(|p| self.accepts(p))
            .map(|p| match p.port_type {
                SerialPortType::UsbPort(usb) => {
                    let mut device = DeviceDescriptor::new(p.port_name)
                        .with_usb_ids(usb.vid, usb.pid);
                    device.product = usb.product;
                    device
                }
                _ => DeviceDescriptor::new(p.port_name),
            })
            .collect())
    }

    fn has_access(&self, _device: &DeviceDescriptor) -> bool {
        true
    }

    fn request_access(&self, device: &DeviceDescriptor) -> Result<(), TransportError> {
        Err(TransportError::Unsupported(format!(
            "{}: access is granted by the operating system (on Linux, join the dialout group)",
            device.path
        )))
    }

    fn open(&self, device: &DeviceDescriptor) -> Result<Box<dyn SerialChannel>, TransportError> {
        let open_error = |e| map_serial_error(&device.path, e);
        let reader = serialport::new(&device.path, LinkParams::default().baud_rate)
            .timeout(self.read_timeout)
            .open()
            .map_err(open_error)?;
        // Separate handle so a write never waits behind a blocking read
        let writer = reader.try_clone().map_err(open_error)?;

        actor_debug!("Opened {}", device.path);
        Ok(Box::new(NativeChannel::from_ports(
            &device.path,
            reader,
            writer,
            self.read_timeout,
        )))
    }
}

type PortSlot = Mutex<Option<Box<dyn SerialPort>>>;

fn lock(slot: &PortSlot) -> MutexGuard<'_, Option<Box<dyn SerialPort>>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An open OS serial port. Dropping both handles closes the device.
pub struct NativeChannel {
    path: String,
    read_timeout: Duration,
    reader: PortSlot,
    writer: PortSlot,
    closed: AtomicBool,
}

impl NativeChannel {
    fn from_ports(
        path: &str,
        reader: Box<dyn SerialPort>,
        writer: Box<dyn SerialPort>,
        read_timeout: Duration,
    ) -> Self {
        Self {
            path: path.to_string(),
            read_timeout,
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
            closed: AtomicBool::new(false),
        }
    }

    fn io_error(&self, e: std::io::Error) -> TransportError {
        TransportError::Io(format!("{}: {}", self.path, e))
    }
}

impl SerialChannel for NativeChannel {
    fn configure(&self, params: &LinkParams) -> Result<(), TransportError> {
        let mut guard = lock(&self.writer);
        let port = guard.as_mut().ok_or(TransportError::NotConnected)?;
        let negotiate = |e: serialport::Error| TransportError::Negotiation(e.to_string());

        port.set_baud_rate(params.baud_rate).map_err(negotiate)?;
        port.set_data_bits(to_serialport_data_bits(params.data_bits)?)
            .map_err(negotiate)?;
        port.set_stop_bits(to_serialport_stop_bits(params.stop_bits)?)
            .map_err(negotiate)?;
        port.set_parity(to_serialport_parity(params.parity))
            .map_err(negotiate)?;
        Ok(())
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::NotConnected);
        }
        let mut guard = lock(&self.reader);
        let port = guard.as_mut().ok_or(TransportError::NotConnected)?;
        match port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => Ok(0),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn write(&self, data: &[u8], timeout: Duration) -> Result<(), TransportError> {
        let mut guard = lock(&self.writer);
        let port = guard.as_mut().ok_or(TransportError::NotConnected)?;
        let settings = |e: serialport::Error| TransportError::Io(e.to_string());

        port.set_timeout(timeout).map_err(settings)?;
        let written = port.write_all(data).and_then(|()| port.flush());
        // On Windows a cloned port shares the OS handle, and with it the timeout
        let restored = port.set_timeout(self.read_timeout);

        written.map_err(|e| match e.kind() {
            ErrorKind::TimedOut => TransportError::Timeout(timeout),
            _ => self.io_error(e),
        })?;
        restored.map_err(settings)
    }

    fn set_control_lines(&self, dtr: bool, rts: bool) -> Result<(), TransportError> {
        let mut guard = lock(&self.writer);
        let port = guard.as_mut().ok_or(TransportError::NotConnected)?;
        port.write_data_terminal_ready(dtr)
            .and_then(|()| port.write_request_to_send(rts))
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        lock(&self.writer).take();
        // Waits for an in-flight read, bounded by the read timeout
        lock(&self.reader).take();
        actor_debug!("Closed {}", self.path);
    }
}
