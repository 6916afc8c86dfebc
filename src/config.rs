//! Listener configuration

use std::time::Duration;

use clap::Parser;

use crate::types::ServerError;

/// Default bind host (all interfaces)
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default bind port
pub const DEFAULT_PORT: u16 = 3000;

/// Default time a client gets to deliver one complete request (30 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Where the server listens
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "mango-server", version, about = "Mango Cipher MCP server over HTTP JSON-RPC")]
pub struct ServerConfig {
    /// Host or IP address to bind
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// TCP port to bind
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Milliseconds a connection may take to send its request; also bounds
    /// the drain of open connections at shutdown
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_MS)]
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl ServerConfig {
    /// Create a config with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Builder: set port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Builder: set request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// `host:port` string suitable for binding; IPv6 literals get brackets
    pub fn bind_addr(&self) -> Result<String, ServerError> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(ServerError::InvalidAddress(self.host.clone()));
        }
        if host.contains(':') && !host.starts_with('[') {
            Ok(format!("[{}]:{}", host, self.port))
        } else {
            Ok(format!("{}:{}", host, self.port))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.bind_addr().unwrap(), "0.0.0.0:3000");
    }

    #[test]
    fn test_builder_pattern() {
        let config = ServerConfig::new()
            .with_host("127.0.0.1")
            .with_port(8080)
            .with_request_timeout(Duration::from_millis(250));
        assert_eq!(config.bind_addr().unwrap(), "127.0.0.1:8080");
        assert_eq!(config.request_timeout_ms, 250);
    }

    #[test]
    fn test_ipv6_host_is_bracketed() {
        let config = ServerConfig::new().with_host("::1");
        assert_eq!(config.bind_addr().unwrap(), "[::1]:3000");
    }

    #[test]
    fn test_empty_host_is_rejected() {
        let config = ServerConfig::new().with_host("  ");
        assert!(matches!(
            config.bind_addr(),
            Err(ServerError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_cli_defaults() {
        let config = ServerConfig::parse_from(["mango-server"]);
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_cli_overrides() {
        let config = ServerConfig::parse_from([
            "mango-server",
            "--host",
            "localhost",
            "--port",
            "4100",
            "--request-timeout-ms",
            "5000",
        ]);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 4100);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
    }
}
