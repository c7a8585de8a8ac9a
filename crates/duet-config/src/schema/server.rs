//! Listener and connection-liveness settings.

use serde::{Deserialize, Serialize};

/// WebSocket listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u32,
    /// Seconds between keepalive pings (valid range: 5-300).
    pub ping_interval: u32,
    /// Seconds a connection may stay unjoined before it is dropped. 0 disables.
    pub join_timeout: u32,
    /// Use the first `X-Forwarded-For` entry as the origin address.
    pub trust_forwarded_for: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 3000,
            ping_interval: 30,
            join_timeout: 0,
            trust_forwarded_for: false,
        }
    }
}

impl ServerConfig {
    /// `bind:port` suitable for `TcpListener::bind`.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
