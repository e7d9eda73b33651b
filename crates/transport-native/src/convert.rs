//! Conversions between link parameters and the serialport crate's types.

use core_types::{Parity, TransportError};
use serialport::{DataBits, Parity as SpParity, StopBits};

pub fn to_serialport_parity(parity: Parity) -> SpParity {
    match parity {
        Parity::None => SpParity::None,
        Parity::Odd => SpParity::Odd,
        Parity::Even => SpParity::Even,
    }
}

pub fn to_serialport_data_bits(bits: u8) -> Result<DataBits, TransportError> {
    match bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        other => Err(TransportError::Negotiation(format!(
            "unsupported data bits: {}",
            other
        ))),
    }
}

pub fn to_serialport_stop_bits(bits: u8) -> Result<StopBits, TransportError> {
    match bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        other => Err(TransportError::Negotiation(format!(
            "unsupported stop bits: {}",
            other
        ))),
    }
}

/// Map a serialport error, keeping permission problems distinguishable.
pub fn map_serial_error(path: &str, e: serialport::Error) -> TransportError {
    match e.kind() {
        serialport::ErrorKind::NoDevice => {
            TransportError::ConnectionFailed(format!("{}: device not found", path))
        }
        serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => {
            TransportError::AccessDenied(format!("{}: {}", path, e))
        }
        serialport::ErrorKind::InvalidInput => TransportError::Negotiation(e.to_string()),
        _ => TransportError::ConnectionFailed(format!("{}: {}", path, e)),
    }
}
