//! Bind configuration for the HTTP and WebSocket servers

use crate::error::{Result, ServerError};
use std::net::SocketAddr;

/// Default port assignments
pub mod ports {
    /// Request/response API
    pub const DEFAULT_HTTP: u16 = 5000;
    /// Live price push
    pub const DEFAULT_WS: u16 = 5001;
}

/// Host and optional ports for each protocol.
///
/// A `None` port disables that server.
///
/// ```
/// use server::config::ServerConfig;
///
/// let both = ServerConfig::new("0.0.0.0", 5000, 5001);
/// let api = ServerConfig::http_only("127.0.0.1", 5000);
/// assert!(both.has_servers() && api.websocket_port.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: Option<u16>,
    pub websocket_port: Option<u16>,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, http: u16, ws: u16) -> Self {
        Self {
            host: host.into(),
            http_port: Some(http),
            websocket_port: Some(ws),
        }
    }

    pub fn http_only(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            http_port: Some(port),
            websocket_port: None,
        }
    }

    pub fn websocket_only(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            http_port: None,
            websocket_port: Some(port),
        }
    }

    pub fn http_addr(&self) -> Option<Result<SocketAddr>> {
        self.http_port.map(|p| self.parse_addr(p))
    }

    pub fn websocket_addr(&self) -> Option<Result<SocketAddr>> {
        self.websocket_port.map(|p| self.parse_addr(p))
    }

    pub fn has_servers(&self) -> bool {
        self.http_port.is_some() || self.websocket_port.is_some()
    }

    fn parse_addr(&self, port: u16) -> Result<SocketAddr> {
        format!("{}:{}", self.host, port)
            .parse()
            .map_err(|_| ServerError::InvalidAddress(format!("{}:{}", self.host, port)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("0.0.0.0", ports::DEFAULT_HTTP, ports::DEFAULT_WS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.http_port, Some(5000));
        assert_eq!(config.websocket_port, Some(5001));
        assert!(config.has_servers());
    }

    #[test]
    fn test_websocket_only() {
        let config = ServerConfig::websocket_only("127.0.0.1", 7000);
        assert_eq!(config.http_port, None);
        assert!(config.http_addr().is_none());
        assert_eq!(
            config.websocket_addr().unwrap().unwrap(),
            "127.0.0.1:7000".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_invalid_host() {
        let config = ServerConfig::http_only("not a host", 5000);
        assert!(matches!(
            config.http_addr(),
            Some(Err(ServerError::InvalidAddress(_)))
        ));
    }
}
