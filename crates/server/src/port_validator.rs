//! Port checks run before the servers bind
//!
//! A successful check does not reserve the port; the real bind can still fail.

use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};

/// Reject port 0, a port shared by both servers, and ports already taken
pub async fn validate_ports_available(config: &ServerConfig) -> Result<()> {
    validate_config_ports(config)?;

    let ports: Vec<(&str, u16)> = [("HTTP", config.http_port), ("WebSocket", config.websocket_port)]
        .into_iter()
        .filter_map(|(protocol, port)| port.map(|p| (protocol, p)))
        .collect();

    if ports.is_empty() {
        warn!("No ports configured for server");
        return Ok(());
    }

    for (protocol, port) in ports {
        let addr = format!("{}:{}", config.host, port);
        debug!(protocol, port, "Checking port");

        if let Err(e) = TcpListener::bind(&addr).await {
            error!(protocol, port, %e, "Port is not available");
            return Err(ServerError::port_in_use(port, e.to_string()));
        }
    }

    info!("All server ports validated successfully");
    Ok(())
}

/// Static checks that need no sockets
fn validate_config_ports(config: &ServerConfig) -> Result<()> {
    for port in [config.http_port, config.websocket_port].into_iter().flatten() {
        if port == 0 {
            return Err(ServerError::ConfigError("port cannot be 0".to_string()));
        }
        if port < 1024 {
            warn!(port, "Privileged port, binding may require elevated permissions");
        }
    }

    if let (Some(http), Some(ws)) = (config.http_port, config.websocket_port) {
        if http == ws {
            return Err(ServerError::ConfigError(format!(
                "HTTP and WebSocket servers cannot share port {}",
                http
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_config_ports() {
        assert!(validate_config_ports(&ServerConfig::new("127.0.0.1", 5000, 5001)).is_ok());
        assert!(validate_config_ports(&ServerConfig::new("127.0.0.1", 5000, 5000)).is_err());
        assert!(validate_config_ports(&ServerConfig::http_only("127.0.0.1", 0)).is_err());
        assert!(validate_config_ports(&ServerConfig::http_only("127.0.0.1", 80)).is_ok());
    }

    #[tokio::test]
    async fn test_taken_port_is_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let result = validate_ports_available(&ServerConfig::http_only("127.0.0.1", port)).await;
        assert!(matches!(result, Err(ServerError::PortInUse { .. })));
    }
}
