//! In-memory gateway backed by configured quotes and chains

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use super::traits::MarketDataGateway;
use crate::error::MarketDataError;
use crate::types::{ChainSnapshot, OptionRow};
use crate::Result;

#[derive(Debug, Clone, Default)]
struct StaticChain {
    calls: Vec<OptionRow>,
    puts: Vec<OptionRow>,
}

/// Gateway serving fixed data from memory.
///
/// Used by the `static` provider mode and throughout the tests. Quotes can be
/// changed or removed at runtime to simulate a moving or failing upstream.
#[derive(Debug, Default)]
pub struct StaticGateway {
    quotes: RwLock<HashMap<String, f64>>,
    chains: RwLock<HashMap<String, BTreeMap<String, StaticChain>>>,
    spot_requests: AtomicU64,
}

impl StaticGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_spot_price(&self, ticker: impl Into<String>, price: f64) {
        self.quotes.write().insert(ticker.into(), price);
    }

    pub fn remove_spot_price(&self, ticker: &str) {
        self.quotes.write().remove(ticker);
    }

    pub fn insert_chain(
        &self,
        ticker: impl Into<String>,
        expiration: impl Into<String>,
        calls: Vec<OptionRow>,
        puts: Vec<OptionRow>,
    ) {
        self.chains
            .write()
            .entry(ticker.into())
            .or_default()
            .insert(expiration.into(), StaticChain { calls, puts });
    }

    /// Number of spot price lookups served so far, failed ones included
    pub fn spot_requests(&self) -> u64 {
        self.spot_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataGateway for StaticGateway {
    async fn fetch_spot_price(&self, ticker: &str) -> Result<f64> {
        self.spot_requests.fetch_add(1, Ordering::SeqCst);
        self.quotes
            .read()
            .get(ticker)
            .copied()
            .ok_or_else(|| MarketDataError::unavailable(format!("no quote for {}", ticker)))
    }

    async fn fetch_chain(&self, ticker: &str, expiration: &str) -> Result<ChainSnapshot> {
        let chain = {
            let chains = self.chains.read();
            let by_expiration = chains
                .get(ticker)
                .ok_or_else(|| MarketDataError::unavailable(format!("no options for {}", ticker)))?;
            by_expiration
                .get(expiration)
                .cloned()
                .ok_or_else(|| MarketDataError::invalid_expiration(ticker, expiration))?
        };

        let spot = self.fetch_spot_price(ticker).await?;

        Ok(ChainSnapshot::new(
            ticker,
            expiration,
            spot,
            chain.calls,
            chain.puts,
        ))
    }

    async fn fetch_expirations(&self, ticker: &str) -> Result<Vec<String>> {
        Ok(self
            .chains
            .read()
            .get(ticker)
            .map(|by_expiration| by_expiration.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "static"
    }
}
