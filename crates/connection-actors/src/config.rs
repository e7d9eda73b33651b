use std::time::Duration;

use core_types::LinkParams;
use serde::{Deserialize, Serialize};

use crate::constants::link;

/// Runtime settings of the link actor.
///
/// Every field has a default, so a config file only lists what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub reconnect_delay_ms: u64,
    pub write_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub connect_timeout_secs: u64,
    /// Run auto-connect as soon as the actor starts
    pub auto_connect: bool,
    /// Parameters used by auto-connect and reconnection
    pub default_params: LinkParams,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: link::RECONNECT_DELAY_MS,
            write_timeout_ms: link::WRITE_TIMEOUT_MS,
            read_timeout_ms: link::READ_TIMEOUT_MS,
            connect_timeout_secs: link::CONNECT_TIMEOUT_SECS,
            auto_connect: true,
            default_params: LinkParams::default(),
        }
    }
}

impl LinkConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}
