//! Market data error types

use thiserror::Error;

/// Errors that can occur during market data operations
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// Upstream fetch failed or returned no rows
    #[error("Data not available: {0}")]
    DataUnavailable(String),

    /// Requested expiration is not offered for the ticker
    #[error("Invalid expiration {expiration} for {ticker}")]
    InvalidExpiration { ticker: String, expiration: String },

    /// Chain was fetched but carries no strikes
    #[error("Empty option chain for {0}")]
    EmptyChain(String),

    /// Invalid symbol
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Provider returned something we could not interpret
    #[error("Provider error: {0}")]
    Provider(String),

    /// Transport-level failure talking to the provider
    #[error("Connection error: {0}")]
    Connection(#[from] reqwest::Error),
}

impl MarketDataError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::DataUnavailable(msg.into())
    }

    pub fn invalid_expiration(ticker: impl Into<String>, expiration: impl Into<String>) -> Self {
        Self::InvalidExpiration {
            ticker: ticker.into(),
            expiration: expiration.into(),
        }
    }

    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }
}
