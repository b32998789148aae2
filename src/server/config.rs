//! Server configuration.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use log::warn;

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The address to bind to.
    pub addr: SocketAddr,
    /// The maximum number of concurrent connections.
    pub max_connections: usize,
    /// The read buffer size.
    pub read_buffer_size: usize,
    /// The largest request body accepted, in bytes.
    pub max_body_size: usize,
    /// When set, `/a` and `/a/` are different paths.
    pub strict_matching: bool,
    /// Directory to load pages from. When unset, `./pages`, `./src/pages`
    /// and `./dist/pages` are probed in that order.
    pub pages_dir: Option<PathBuf>,
    /// How long `stop` waits for in-flight connections.
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_connections: 1024,
            read_buffer_size: 8192,
            max_body_size: 1024 * 1024,
            strict_matching: false,
            pages_dir: None,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Defaults, overridden by `PORT` and `STRICT_MATCHING` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(port) = env::var("PORT") {
            match port.parse::<u16>() {
                Ok(port) => config.addr.set_port(port),
                Err(e) => warn!("Ignoring invalid PORT {port:?}: {e}"),
            }
        }

        if let Ok(strict) = env::var("STRICT_MATCHING") {
            config.strict_matching = matches!(strict.trim().to_ascii_lowercase().as_str(), "1" | "true");
        }

        config
    }

    /// Bind to `addr` instead.
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    /// Load pages from `dir` instead of probing the default locations.
    pub fn with_pages_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.pages_dir = Some(dir.into());
        self
    }
}
