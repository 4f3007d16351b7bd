//! Client configuration.
//!
//! # Design
//! Every field has a default matching the stats transport this client was
//! written for, so `ClientConfig::default()` is what `http_get` and
//! `http_post_snapshot` use. The struct derives serde so a host application
//! can embed it in its own configuration file; timeouts are whole seconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = "GameSpyHTTP/1.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Upper bound on the TCP handshake, in seconds.
    pub connect_timeout_secs: u64,
    /// Read and write timeout applied to every socket operation, in seconds.
    pub io_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_TIMEOUT_SECS,
            io_timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs.max(1))
    }
}
