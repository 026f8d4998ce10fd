//! Server infrastructure for oiwatch
//!
//! An HTTP server (Axum) for request/response traffic and a WebSocket server
//! (tokio-tungstenite) for push, both behind the [`Server`] trait and stopped
//! through a shared `CancellationToken`.
//!
//! ```ignore
//! use server::{AppServer, ServerConfig, ServerExt};
//!
//! let server = AppServer::new("oiwatch", ServerConfig::default())
//!     .with_http_router(router)
//!     .with_ws_handler(handler);
//! server.run_with_ctrl_c().await?;
//! ```

// Tungstenite's error type is large
#![allow(clippy::result_large_err)]

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod port_validator;
pub mod shutdown;
pub mod traits;
pub mod websocket;

pub use config::{ports, ServerConfig};
pub use error::{Result, ServerError};
pub use health::{health_routes, HealthState, HealthStatus};
pub use http::HttpServer;
pub use port_validator::validate_ports_available;
pub use shutdown::ShutdownController;
pub use traits::{Server, ServerExt};
pub use websocket::{ConnectionId, MessageHandler, WebSocketServer};

/// Time allowed for both servers to stop after cancellation
const SHUTDOWN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Runs the HTTP and WebSocket servers side by side.
///
/// A server is started only when both its port is configured and its
/// router/handler has been supplied. If either exits on its own the other is
/// cancelled.
pub struct AppServer {
    name: String,
    config: ServerConfig,
    http_server: Option<HttpServer>,
    ws_server: Option<WebSocketServer>,
}

impl AppServer {
    pub fn new(name: impl Into<String>, config: ServerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            http_server: None,
            ws_server: None,
        }
    }

    pub fn with_http_router(mut self, router: axum::Router) -> Self {
        self.http_server = self
            .config
            .http_port
            .map(|_| HttpServer::new(self.config.clone(), router));
        self
    }

    pub fn with_ws_handler(mut self, handler: Arc<dyn MessageHandler>) -> Self {
        self.ws_server = self
            .config
            .websocket_port
            .map(|_| WebSocketServer::with_shared_handler(self.config.clone(), handler));
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub async fn validate_ports(&self) -> Result<()> {
        validate_ports_available(&self.config).await
    }
}

#[async_trait::async_trait]
impl Server for AppServer {
    fn name(&self) -> &str {
        &self.name
    }

    fn address(&self) -> Option<std::net::SocketAddr> {
        self.http_server
            .as_ref()
            .and_then(|s| s.address())
            .or_else(|| self.ws_server.as_ref().and_then(|s| s.address()))
    }

    fn is_running(&self) -> bool {
        self.http_server.as_ref().is_some_and(|s| s.is_running())
            || self.ws_server.as_ref().is_some_and(|s| s.is_running())
    }

    async fn run(&self, shutdown_token: CancellationToken) -> Result<()> {
        info!(server = %self.name, "Starting servers");

        let mut handles: Vec<JoinHandle<Result<()>>> = Vec::new();

        if let Some(http) = self.http_server.clone() {
            let token = shutdown_token.child_token();
            handles.push(tokio::spawn(async move { http.run(token).await }));
        }

        if let Some(ws) = self.ws_server.clone() {
            let token = shutdown_token.child_token();
            handles.push(tokio::spawn(async move { ws.run(token).await }));
        }

        if handles.is_empty() {
            warn!("No servers configured to start");
            return Ok(());
        }

        let mut first_error = None;
        let mut finished = None;
        tokio::select! {
            _ = shutdown_token.cancelled() => {
                info!("Shutdown signal received");
            }
            (result, index, _) = futures::future::select_all(handles.iter_mut()) => {
                finished = Some(index);
                match result {
                    Ok(Ok(())) => warn!("A server exited unexpectedly"),
                    Ok(Err(e)) => {
                        error!(%e, "A server exited with error");
                        first_error = Some(e);
                    }
                    Err(e) => error!(%e, "A server task panicked"),
                }
                shutdown_token.cancel();
            }
        }

        // A completed JoinHandle must not be polled again
        if let Some(index) = finished {
            handles.remove(index);
        }

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, futures::future::join_all(handles)).await {
            Ok(results) => {
                let errors: Vec<String> = results
                    .into_iter()
                    .filter_map(|r| match r {
                        Ok(Ok(())) => None,
                        Ok(Err(e)) => Some(e.to_string()),
                        Err(e) => Some(format!("task panicked: {}", e)),
                    })
                    .collect();
                if !errors.is_empty() {
                    warn!(?errors, "Servers reported errors during shutdown");
                }
            }
            Err(_) => warn!("Timed out waiting for servers to shut down"),
        }

        info!(server = %self.name, "Shutdown complete");
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_tungstenite::tungstenite::Message;

    struct Silent;

    impl MessageHandler for Silent {
        fn handle(&self, _conn_id: ConnectionId, _message: Message) -> Option<Message> {
            None
        }
    }

    #[tokio::test]
    async fn test_app_server_shutdown() {
        let server = AppServer::new("test", ServerConfig::new("127.0.0.1", 0, 0))
            .with_http_router(axum::Router::new())
            .with_ws_handler(Arc::new(Silent));
        let (handle, token) = server.spawn();

        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();

        let result = tokio::time::timeout(Duration::from_secs(10), handle).await;
        assert!(result.is_ok(), "Server should shutdown within timeout");
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let server = AppServer::new("test", ServerConfig::http_only("127.0.0.1", port))
            .with_http_router(axum::Router::new());
        let result = tokio::time::timeout(Duration::from_secs(5), server.run(CancellationToken::new()))
            .await
            .unwrap();

        assert!(matches!(result, Err(ServerError::BindError { .. })));
    }

    #[test]
    fn test_unsupplied_server_is_skipped() {
        let server = AppServer::new("test", ServerConfig::default());
        assert!(!server.is_running());
        assert!(server.address().is_none());
    }
}
