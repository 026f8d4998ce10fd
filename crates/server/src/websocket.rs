//! WebSocket server using tokio-tungstenite
//!
//! Connections are tracked by id. A [`MessageHandler`] answers inbound frames
//! and may attach an outbound stream to each connection, which is how server
//! push (price updates) reaches clients.

use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::{SinkExt, StreamExt};
use observability::ServerMetrics;
use parking_lot::RwLock as SyncRwLock;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::traits::Server;

pub type ConnectionId = u64;

#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    pub peer_addr: SocketAddr,
    pub connected_at: std::time::Instant,
}

/// Per-connection behaviour of a [`WebSocketServer`]
///
/// ```ignore
/// struct Ticker(broadcast::Sender<String>);
///
/// impl MessageHandler for Ticker {
///     fn handle(&self, _: ConnectionId, _: Message) -> Option<Message> {
///         None
///     }
///
///     fn outbound(&self, _: ConnectionId) -> Option<BoxStream<'static, Message>> {
///         let rx = BroadcastStream::new(self.0.subscribe());
///         Some(rx.filter_map(|m| async move { m.ok().map(Message::Text) }).boxed())
///     }
/// }
/// ```
pub trait MessageHandler: Send + Sync {
    /// Answer an inbound frame; `None` sends nothing back
    fn handle(&self, conn_id: ConnectionId, message: Message) -> Option<Message>;

    /// Called once the upgrade has completed, after [`outbound`](Self::outbound)
    fn on_connect(&self, _conn_id: ConnectionId, _peer_addr: SocketAddr) {}

    fn on_disconnect(&self, _conn_id: ConnectionId) {}

    /// Frames pushed to this connection independent of inbound traffic
    fn outbound(&self, _conn_id: ConnectionId) -> Option<BoxStream<'static, Message>> {
        None
    }
}

/// Time allowed for open connections to close on shutdown
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct WebSocketServer {
    config: ServerConfig,
    running: Arc<AtomicBool>,
    bound_addr: Arc<SyncRwLock<Option<SocketAddr>>>,
    next_conn_id: Arc<AtomicU64>,
    connections: Arc<RwLock<HashMap<ConnectionId, ConnectionInfo>>>,
    handler: Arc<dyn MessageHandler>,
    metrics: ServerMetrics,
}

impl WebSocketServer {
    pub fn with_handler<H: MessageHandler + 'static>(config: ServerConfig, handler: H) -> Self {
        Self::with_shared_handler(config, Arc::new(handler))
    }

    pub fn with_shared_handler(config: ServerConfig, handler: Arc<dyn MessageHandler>) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            bound_addr: Arc::new(SyncRwLock::new(None)),
            next_conn_id: Arc::new(AtomicU64::new(1)),
            connections: Arc::new(RwLock::new(HashMap::new())),
            handler,
            metrics: ServerMetrics::new("websocket"),
        }
    }

    fn bind_addr(&self) -> Result<SocketAddr> {
        self.config
            .websocket_addr()
            .ok_or_else(|| ServerError::ConfigError("WebSocket port not configured".into()))?
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    fn next_connection_id(&self) -> ConnectionId {
        self.next_conn_id.fetch_add(1, Ordering::SeqCst)
    }

    async fn register_connection(&self, id: ConnectionId, peer_addr: SocketAddr) {
        let info = ConnectionInfo {
            id,
            peer_addr,
            connected_at: std::time::Instant::now(),
        };
        self.connections.write().await.insert(id, info);
        self.metrics.connection_opened();
        self.handler.on_connect(id, peer_addr);
    }

    async fn unregister_connection(&self, id: ConnectionId) {
        self.connections.write().await.remove(&id);
        self.metrics.connection_closed();
        self.handler.on_disconnect(id);
    }

    async fn handle_connection(
        &self,
        conn_id: ConnectionId,
        tcp: TcpStream,
        peer_addr: SocketAddr,
        conn_token: CancellationToken,
    ) -> Result<()> {
        let ws_stream = accept_async(tcp).await.map_err(ServerError::WebSocket)?;
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        // Subscribe before on_connect so nothing it triggers is missed
        let mut outbound = self
            .handler
            .outbound(conn_id)
            .unwrap_or_else(|| stream::pending::<Message>().boxed());

        self.register_connection(conn_id, peer_addr).await;
        debug!(conn_id, %peer_addr, "WebSocket connection established");

        loop {
            tokio::select! {
                _ = conn_token.cancelled() => {
                    debug!(conn_id, "Closing connection for server shutdown");
                    let _ = ws_sender.send(Message::Close(None)).await;
                    break;
                }

                pushed = outbound.next() => {
                    match pushed {
                        Some(message) => {
                            if let Err(e) = ws_sender.send(message).await {
                                debug!(conn_id, %e, "Push to client failed");
                                break;
                            }
                        }
                        None => {
                            outbound = stream::pending::<Message>().boxed();
                        }
                    }
                }

                msg = ws_receiver.next() => {
                    match msg {
                        Some(Ok(message)) => {
                            if message.is_close() {
                                debug!(conn_id, "WebSocket client disconnected gracefully");
                                break;
                            }

                            if let Some(response) = self.handler.handle(conn_id, message) {
                                if let Err(e) = ws_sender.send(response).await {
                                    error!(conn_id, %e, "Failed to send WebSocket message");
                                    break;
                                }
                            }
                        }
                        Some(Err(e)) => {
                            warn!(conn_id, %e, "WebSocket error");
                            break;
                        }
                        None => break,
                    }
                }
            }
        }

        self.unregister_connection(conn_id).await;
        debug!(conn_id, "WebSocket connection closed");
        Ok(())
    }
}

#[async_trait]
impl Server for WebSocketServer {
    fn name(&self) -> &str {
        "websocket"
    }

    fn address(&self) -> Option<SocketAddr> {
        *self.bound_addr.read()
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn run(&self, shutdown_token: CancellationToken) -> Result<()> {
        let addr = self.bind_addr()?;

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::bind(addr.to_string(), e))?;
        let local_addr = listener.local_addr().map_err(ServerError::Io)?;
        *self.bound_addr.write() = Some(local_addr);

        info!(%local_addr, "WebSocket server listening");
        self.running.store(true, Ordering::SeqCst);

        let mut connection_handles: Vec<tokio::task::JoinHandle<()>> = Vec::new();

        loop {
            tokio::select! {
                _ = shutdown_token.cancelled() => {
                    info!("WebSocket server received shutdown signal");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((tcp, peer_addr)) => {
                            let conn_id = self.next_connection_id();
                            let server = self.clone();
                            let conn_token = shutdown_token.child_token();

                            connection_handles.push(tokio::spawn(async move {
                                if let Err(e) = server
                                    .handle_connection(conn_id, tcp, peer_addr, conn_token)
                                    .await
                                {
                                    warn!(conn_id, %e, "WebSocket connection error");
                                }
                            }));
                            connection_handles.retain(|h| !h.is_finished());
                        }
                        Err(e) => {
                            error!(%e, "Failed to accept WebSocket connection");
                        }
                    }
                }
            }
        }

        let connection_count = connection_handles.len();
        if connection_count > 0 {
            info!(connection_count, "Waiting for WebSocket connections to close");
            let drained = tokio::time::timeout(
                DRAIN_TIMEOUT,
                futures::future::join_all(connection_handles),
            )
            .await;
            if drained.is_err() {
                warn!("Timed out waiting for WebSocket connections to close");
            }
        }

        self.running.store(false, Ordering::SeqCst);
        *self.bound_addr.write() = None;
        info!("WebSocket server shutdown complete");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ServerExt;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Greeter {
        connects: AtomicUsize,
    }

    impl MessageHandler for Greeter {
        fn handle(&self, _conn_id: ConnectionId, message: Message) -> Option<Message> {
            message.is_text().then_some(message)
        }

        fn on_connect(&self, _conn_id: ConnectionId, _peer_addr: SocketAddr) {
            self.connects.fetch_add(1, Ordering::SeqCst);
        }

        fn outbound(&self, conn_id: ConnectionId) -> Option<BoxStream<'static, Message>> {
            let greeting = Message::Text(format!("hello {}", conn_id));
            Some(stream::iter(vec![greeting]).boxed())
        }
    }

    async fn start(handler: Arc<Greeter>) -> (WebSocketServer, CancellationToken, SocketAddr) {
        let server =
            WebSocketServer::with_shared_handler(ServerConfig::websocket_only("127.0.0.1", 0), handler);
        let probe = server.clone();
        let (_handle, token) = server.spawn();

        for _ in 0..50 {
            if let Some(addr) = probe.address() {
                return (probe, token, addr);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("WebSocket server did not bind");
    }

    #[tokio::test]
    async fn test_outbound_stream_reaches_client() {
        let handler = Arc::new(Greeter::default());
        let (server, token, addr) = start(handler.clone()).await;

        let (mut client, _) = tokio_tungstenite::connect_async(format!("ws://{}", addr))
            .await
            .unwrap();

        let pushed = client.next().await.unwrap().unwrap();
        assert_eq!(pushed, Message::Text("hello 1".to_string()));

        client.send(Message::Text("ping".to_string())).await.unwrap();
        let echoed = client.next().await.unwrap().unwrap();
        assert_eq!(echoed, Message::Text("ping".to_string()));

        assert_eq!(handler.connects.load(Ordering::SeqCst), 1);
        assert_eq!(server.connection_count().await, 1);
        token.cancel();
    }

    #[tokio::test]
    async fn test_websocket_server_shutdown() {
        let server = WebSocketServer::with_handler(
            ServerConfig::websocket_only("127.0.0.1", 0),
            Greeter::default(),
        );
        let (handle, token) = server.spawn();

        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(result.is_ok(), "Server should shutdown within timeout");
    }
}
