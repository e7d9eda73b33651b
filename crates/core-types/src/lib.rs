//! # Core Types
//!
//! Plain data shared by every crate in the workspace: device descriptors,
//! link parameters, the severity scale and the transport traits that a host
//! platform implements to give the link manager access to real hardware.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

use serde::{Deserialize, Serialize};

pub mod transport;
pub use transport::{SerialChannel, SerialProvider, SharedChannel, TransportError};

/// A serial device as reported by the transport provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DeviceDescriptor {
    /// OS path or platform identifier (e.g. `/dev/ttyUSB0`, `COM3`).
    pub path: String,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub product: Option<String>,
}

impl DeviceDescriptor {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            vid: None,
            pid: None,
            product: None,
        }
    }

    pub fn with_usb_ids(mut self, vid: u16, pid: u16) -> Self {
        self.vid = Some(vid);
        self.pid = Some(pid);
        self
    }

    /// Short human-readable label, e.g. `/dev/ttyUSB0 (1A86:7523)`.
    pub fn label(&self) -> String {
        match (self.vid, self.pid) {
            (Some(vid), Some(pid)) => format!("{} ({:04X}:{:04X})", self.path, vid, pid),
            _ => self.path.clone(),
        }
    }
}

/// Parity setting for serial port configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

/// Connection-time parameters negotiated when a session opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkParams {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
}

impl Default for LinkParams {
    fn default() -> Self {
        Self::new_8n1(9600)
    }
}

impl LinkParams {
    /// Create a standard 8N1 configuration at specified baud rate
    pub fn new_8n1(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
        }
    }

    /// Parse a compact framing string like "8N1" (data bits, parity, stop bits).
    pub fn from_framing(framing: &str, baud_rate: u32) -> Result<Self, String> {
        let chars: Vec<char> = framing.chars().collect();
        if chars.len() != 3 {
            return Err(format!(
                "Invalid framing format '{}': must be 3 characters (e.g., '8N1')",
                framing
            ));
        }

        let data_bits = match chars.first() {
            Some(c @ '5'..='8') => *c as u8 - b'0',
            Some(c) => return Err(format!("Invalid data bits '{}': must be 5 to 8", c)),
            None => return Err("Internal error: framing string unexpectedly empty".into()),
        };

        let parity = match chars.get(1).map(|c| c.to_ascii_uppercase()) {
            Some('N') => Parity::None,
            Some('E') => Parity::Even,
            Some('O') => Parity::Odd,
            Some(c) => return Err(format!("Invalid parity '{}': must be N, E, or O", c)),
            None => return Err("Internal error: missing parity character".into()),
        };

        let stop_bits = match chars.get(2) {
            Some('1') => 1,
            Some('2') => 2,
            Some(c) => return Err(format!("Invalid stop bits '{}': must be 1 or 2", c)),
            None => return Err("Internal error: missing stop bits character".into()),
        };

        Ok(Self {
            baud_rate,
            data_bits,
            stop_bits,
            parity,
        })
    }

    /// Compact framing notation, the inverse of [`LinkParams::from_framing`].
    pub fn framing(&self) -> String {
        let parity = match self.parity {
            Parity::None => 'N',
            Parity::Even => 'E',
            Parity::Odd => 'O',
        };
        format!("{}{}{}", self.data_bits, parity, self.stop_bits)
    }
}

/// Severity of an inbound line. Ordered: `Info < Warning < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
        }
    }

    /// Console marker shown next to classified lines.
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Info => "🟢",
            Self::Warning => "🟡",
            Self::Critical => "🔴",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
