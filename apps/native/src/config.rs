//! `linkalert.toml` loading and CLI overrides.

use std::path::{Path, PathBuf};

use alerting::AlertConfig;
use connection_actors::LinkConfig;
use core_types::LinkParams;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_HOTPLUG_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid framing: {0}")]
    Framing(String),
}

/// Whole-application settings. Every section is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Watch only this port; otherwise the first USB serial adapter found
    pub port: Option<String>,
    pub hotplug_interval_ms: u64,
    pub link: LinkConfig,
    pub alert: AlertConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: None,
            hotplug_interval_ms: DEFAULT_HOTPLUG_INTERVAL_MS,
            link: LinkConfig::default(),
            alert: AlertConfig::default(),
        }
    }
}

/// Values from the command line; `None` keeps the file value.
#[derive(Debug, Default)]
pub struct Overrides {
    pub port: Option<String>,
    pub baud: Option<u32>,
    pub framing: Option<String>,
    pub no_auto_connect: bool,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply(&mut self, overrides: Overrides) -> Result<(), ConfigError> {
        if let Some(port) = overrides.port {
            self.port = Some(port);
        }
        let baud = overrides
            .baud
            .unwrap_or(self.link.default_params.baud_rate);
        match overrides.framing {
            Some(framing) => {
                self.link.default_params =
                    LinkParams::from_framing(&framing, baud).map_err(ConfigError::Framing)?;
            }
            None => self.link.default_params.baud_rate = baud,
        }
        if overrides.no_auto_connect {
            self.link.auto_connect = false;
        }
        Ok(())
    }
}
