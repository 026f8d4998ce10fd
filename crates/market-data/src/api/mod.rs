//! HTTP API and WebSocket price push for market data

pub mod handlers;
pub mod models;
pub mod routes;
pub mod stream;

pub use handlers::MarketDataApiState;
pub use routes::create_router;
pub use stream::PriceStreamHandler;
