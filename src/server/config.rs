//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Default listen port
pub const DEFAULT_PORT: u16 = 8000;

/// Default WebSocket upgrade path
pub const DEFAULT_CHANNEL_PATH: &str = "/channel";

/// Environment variables read by [`ServerConfig::from_env`], first match wins
pub const PORT_ENV_VARS: [&str; 2] = ["PORT", "port"];

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Only requests for this path are upgraded; others get 404
    pub channel_path: String,

    /// WebSocket upgrade must complete within this time
    pub handshake_timeout: Duration,

    /// Largest accepted signaling message in bytes
    pub max_message_size: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            max_connections: 0, // Unlimited
            channel_path: DEFAULT_CHANNEL_PATH.to_string(),
            handshake_timeout: Duration::from_secs(10),
            max_message_size: 256 * 1024, // SDP offers are a few KB
            tcp_nodelay: true,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Default config with the port taken from the environment
    ///
    /// Unset or unparsable values keep the default port.
    pub fn from_env() -> Self {
        let port = port_var(&[], |name| std::env::var(name).ok());
        Self::default().port_from(port.as_deref())
    }

    /// Like [`from_env`](Self::from_env), with variables from a `.env` file
    ///
    /// Process environment values take precedence over the file. A missing
    /// or unreadable file is the same as an empty one.
    pub fn from_env_file(path: impl AsRef<Path>) -> Self {
        let file = read_env_file(path.as_ref());
        let port = port_var(&file, |name| std::env::var(name).ok());
        Self::default().port_from(port.as_deref())
    }

    fn port_from(mut self, value: Option<&str>) -> Self {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return self;
        };
        match value.parse::<u16>() {
            Ok(port) => self.bind_addr.set_port(port),
            Err(e) => tracing::warn!(value = %value, error = %e, "Ignoring invalid port"),
        }
        self
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the WebSocket upgrade path
    pub fn channel_path(mut self, path: impl Into<String>) -> Self {
        self.channel_path = path.into();
        self
    }

    /// Set handshake timeout
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set maximum message size
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }
}

/// First port variable set in `env`, falling back to `file` per name
fn port_var(file: &[(String, String)], env: impl Fn(&str) -> Option<String>) -> Option<String> {
    PORT_ENV_VARS.iter().find_map(|name| {
        env(name).or_else(|| {
            file.iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
        })
    })
}

fn read_env_file(path: &Path) -> Vec<(String, String)> {
    match dotenvy::from_path_iter(path) {
        Ok(iter) => iter
            .filter_map(|item| match item {
                Ok(pair) => Some(pair),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping bad .env line");
                    None
                }
            })
            .collect(),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "No .env file loaded");
            Vec::new()
        }
    }
}
