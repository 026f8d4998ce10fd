//! WebSocket push of live price updates
//!
//! Each connection gets its own broadcast receiver. A client that falls
//! behind skips the updates it missed and continues with the latest ones.

use futures::stream::{self, BoxStream, Stream};
use futures::StreamExt;
use server::{ConnectionId, MessageHandler};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, warn};

use crate::coordinator::StreamCoordinator;
use crate::types::{PriceUpdate, StreamEvent};

pub struct PriceStreamHandler {
    coordinator: Arc<StreamCoordinator>,
    start_on_connect: bool,
}

impl PriceStreamHandler {
    /// `start_on_connect` arms the broadcast loop on the first connection;
    /// disable it when the loop is started at process startup instead
    pub fn new(coordinator: Arc<StreamCoordinator>, start_on_connect: bool) -> Self {
        Self {
            coordinator,
            start_on_connect,
        }
    }
}

impl MessageHandler for PriceStreamHandler {
    fn handle(&self, conn_id: ConnectionId, message: Message) -> Option<Message> {
        debug!(conn_id, kind = ?message, "Ignoring inbound frame on price stream");
        None
    }

    fn on_connect(&self, conn_id: ConnectionId, peer_addr: SocketAddr) {
        self.coordinator.metrics().subscriber_joined();
        debug!(conn_id, %peer_addr, "Price subscriber connected");

        if self.start_on_connect {
            self.coordinator.on_first_subscriber_connect();
        }
    }

    fn on_disconnect(&self, conn_id: ConnectionId) {
        self.coordinator.metrics().subscriber_left();
        debug!(conn_id, "Price subscriber disconnected");
    }

    fn outbound(&self, _conn_id: ConnectionId) -> Option<BoxStream<'static, Message>> {
        let frames = price_updates(self.coordinator.subscribe()).filter_map(|update| async move {
            encode_update(&update)
        });
        Some(frames.boxed())
    }
}

/// Updates from a receiver, skipping over lag and ending when the channel closes
pub fn price_updates(rx: broadcast::Receiver<PriceUpdate>) -> impl Stream<Item = PriceUpdate> {
    stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(update) => return Some((update, rx)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Price subscriber lagging, skipped updates");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}

/// `{"event":"update_price","data":{"price":..}}` as a text frame
pub fn encode_update(update: &PriceUpdate) -> Option<Message> {
    match serde_json::to_string(&StreamEvent::from(update)) {
        Ok(json) => Some(Message::Text(json)),
        Err(e) => {
            error!(error = %e, "Failed to encode price update");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{StreamConfig, StreamState};
    use crate::gateway::StaticGateway;
    use std::time::Duration;

    fn coordinator(gateway: Arc<StaticGateway>) -> Arc<StreamCoordinator> {
        Arc::new(StreamCoordinator::new(
            Arc::new(StreamState::new()),
            gateway,
            StreamConfig::default(),
        ))
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    #[test]
    fn test_encode_update() {
        let message = encode_update(&PriceUpdate::new("AAPL", 187.5)).unwrap();
        assert_eq!(
            message,
            Message::Text(r#"{"event":"update_price","data":{"price":187.5}}"#.to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_starts_loop_once_and_pushes() {
        let gateway = Arc::new(StaticGateway::new());
        gateway.set_spot_price("AAPL", 187.5);
        let coordinator = coordinator(gateway);
        coordinator.set_target("AAPL");

        let handler = PriceStreamHandler::new(coordinator.clone(), true);
        let mut first = handler.outbound(1).unwrap();
        handler.on_connect(1, peer());
        let mut second = handler.outbound(2).unwrap();
        handler.on_connect(2, peer());

        assert_eq!(coordinator.loops_started(), 1);

        let expected = Message::Text(r#"{"event":"update_price","data":{"price":187.5}}"#.to_string());
        assert_eq!(first.next().await, Some(expected.clone()));
        assert_eq!(second.next().await, Some(expected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_without_autostart() {
        let coordinator = coordinator(Arc::new(StaticGateway::new()));
        let handler = PriceStreamHandler::new(coordinator.clone(), false);

        handler.on_connect(1, peer());
        assert_eq!(coordinator.loops_started(), 0);
        assert!(handler.handle(1, Message::Text("hi".into())).is_none());
    }

    #[tokio::test]
    async fn test_lagging_subscriber_resumes() {
        let (tx, rx) = broadcast::channel(2);
        for price in [1.0, 2.0, 3.0, 4.0] {
            tx.send(PriceUpdate::new("AAPL", price)).unwrap();
        }
        drop(tx);

        let prices: Vec<f64> = price_updates(rx).map(|u| u.price).collect().await;
        assert_eq!(prices, vec![3.0, 4.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pushes_follow_interval() {
        let gateway = Arc::new(StaticGateway::new());
        gateway.set_spot_price("MSFT", 410.0);
        let coordinator = coordinator(gateway.clone());
        coordinator.set_target("MSFT");

        let handler = PriceStreamHandler::new(coordinator.clone(), true);
        let mut frames = handler.outbound(1).unwrap();
        handler.on_connect(1, peer());

        frames.next().await.unwrap();
        let start = tokio::time::Instant::now();
        gateway.set_spot_price("MSFT", 411.0);
        frames.next().await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }
}
