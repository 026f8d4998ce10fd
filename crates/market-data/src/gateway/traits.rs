use async_trait::async_trait;

use crate::types::ChainSnapshot;
use crate::Result;

/// Request/response access to an external market data provider.
///
/// Implementations hold no per-request state; every call goes to the
/// provider (or the in-memory fixture) afresh.
#[async_trait]
pub trait MarketDataGateway: Send + Sync {
    /// Latest spot price for the underlying.
    ///
    /// Fails with `DataUnavailable` when the provider has no recent price.
    async fn fetch_spot_price(&self, ticker: &str) -> Result<f64>;

    /// Call and put rows for one expiration (`YYYY-MM-DD`), plus spot.
    ///
    /// Fails with `InvalidExpiration` when the date is not offered and
    /// `DataUnavailable` when the provider returns nothing.
    async fn fetch_chain(&self, ticker: &str, expiration: &str) -> Result<ChainSnapshot>;

    /// Listed expirations as `YYYY-MM-DD`, nearest first.
    async fn fetch_expirations(&self, ticker: &str) -> Result<Vec<String>>;

    /// Provider name for logs
    fn name(&self) -> &str;
}
