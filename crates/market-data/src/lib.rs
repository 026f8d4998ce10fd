//! Option-chain analytics and live spot price streaming
//!
//! # Core Components
//!
//! - [`gateway`] - Spot, chain and expiration lookups against a provider
//! - [`analytics`] - Max pain, OI walls, trade ideas, market-maker bias
//! - [`coordinator`] - Single-ticker price broadcast loop
//! - [`tickers`] - Ticker universe from a CSV screener export
//! - `api` - HTTP handlers and WebSocket push (feature `api`)
//!
//! # Key Invariants
//!
//! - Analytics never fail; empty chains give empty or neutral results
//! - At most one broadcast loop runs per coordinator
//! - The stream target is last-write-wins across concurrent requests
//! - A failed tick is logged and the loop carries on

pub mod analytics;
pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod tickers;
pub mod types;

#[cfg(feature = "api")]
pub mod api;

pub use analytics::{AnalyticsEngine, AnalyticsParams};
pub use coordinator::{StreamConfig, StreamCoordinator, StreamPhase, StreamState};
pub use error::MarketDataError;
pub use gateway::{normalize_ticker, MarketDataGateway, StaticGateway, YahooConfig, YahooGateway};
pub use tickers::{TickerList, TickerSource, TickerSourceConfig};
pub use types::{
    AnalysisResult, ChainSnapshot, Direction, MarketMakerAssessment, MaxPain, OIWall, OptionRow,
    OptionType, Prediction, PriceUpdate, StreamEvent, TradeIdea,
};

pub type Result<T> = std::result::Result<T, MarketDataError>;
