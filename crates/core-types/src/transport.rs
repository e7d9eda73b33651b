use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::{DeviceDescriptor, LinkParams};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("IO Error: {0}")]
    Io(String),
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Parameter negotiation failed: {0}")]
    Negotiation(String),
    #[error("Write timed out after {0:?}")]
    Timeout(Duration),
    #[error("Access denied: {0}")]
    AccessDenied(String),
    #[error("Not supported: {0}")]
    Unsupported(String),
    #[error("Not connected")]
    NotConnected,
}

/// An open byte channel to a device.
///
/// Methods take `&self` so one channel can be shared between the read loop
/// and the writer; implementations serialize access internally.
pub trait SerialChannel: Send + Sync {
    /// Apply connection parameters. Called once right after `open`.
    fn configure(&self, params: &LinkParams) -> Result<(), TransportError>;

    /// Read available bytes into `buf`.
    ///
    /// Blocks for at most the channel's read timeout; `Ok(0)` means nothing
    /// arrived in that window and is not an error.
    fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Write all of `data`, failing with [`TransportError::Timeout`] if the
    /// device does not accept it within `timeout`.
    fn write(&self, data: &[u8], timeout: Duration) -> Result<(), TransportError>;

    /// Assert or clear the DTR/RTS modem control lines. Best effort.
    fn set_control_lines(&self, _dtr: bool, _rts: bool) -> Result<(), TransportError> {
        Ok(())
    }

    /// Release the device handle. Further reads return `NotConnected`.
    fn close(&self);
}

pub type SharedChannel = Arc<dyn SerialChannel>;

/// Device discovery, authorization and opening, implemented by the host.
///
/// Calls may block briefly (enumeration, `open`); the link manager runs
/// `open` on a blocking worker so the actor loop never stalls on it.
pub trait SerialProvider: Send + Sync + 'static {
    /// Currently attached compatible devices.
    fn list(&self) -> Result<Vec<DeviceDescriptor>, TransportError>;

    fn has_access(&self, device: &DeviceDescriptor) -> bool;

    /// Start an asynchronous authorization request. The outcome is delivered
    /// back to the link manager as an `AccessResult` event.
    fn request_access(&self, device: &DeviceDescriptor) -> Result<(), TransportError>;

    fn open(&self, device: &DeviceDescriptor) -> Result<Box<dyn SerialChannel>, TransportError>;
}
