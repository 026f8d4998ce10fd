//! Ticker universe from a CSV screener export
//!
//! The export is fetched over HTTP and the configured column (normally
//! `Ticker`) is read out of it. A failed download or an unreadable file
//! yields an empty list; the caller decides what an empty universe means.

use reqwest::Client;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::MarketDataError;
use crate::Result;

pub const DEFAULT_TICKER_COLUMN: &str = "Ticker";

#[derive(Debug, Clone)]
pub struct TickerSourceConfig {
    pub export_url: String,
    pub column: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl TickerSourceConfig {
    pub fn new(export_url: impl Into<String>) -> Self {
        Self {
            export_url: export_url.into(),
            column: DEFAULT_TICKER_COLUMN.to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

pub struct TickerSource {
    client: Client,
    export_url: String,
    column: String,
}

impl TickerSource {
    pub fn new(config: TickerSourceConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            export_url: config.export_url,
            column: config.column,
        })
    }

    /// Download the export and return its tickers sorted.
    ///
    /// Never fails: any error is logged and an empty list returned.
    pub async fn fetch_tickers(&self) -> Vec<String> {
        match self.try_fetch().await {
            Ok(tickers) => {
                info!(count = tickers.len(), "Ticker list loaded");
                tickers
            }
            Err(e) => {
                warn!(url = %self.export_url, error = %e, "Failed to load ticker list");
                Vec::new()
            }
        }
    }

    async fn try_fetch(&self) -> Result<Vec<String>> {
        let response = self.client.get(&self.export_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MarketDataError::unavailable(format!(
                "ticker export returned {}",
                status
            )));
        }

        let body = response.bytes().await?;
        parse_tickers(&body, &self.column)
    }
}

/// Where the ticker universe comes from
pub enum TickerList {
    /// Fixed list from configuration
    Static(Vec<String>),
    /// Downloaded on every request
    Export(TickerSource),
}

impl TickerList {
    /// Sorted tickers; empty when the export cannot be loaded
    pub async fn tickers(&self) -> Vec<String> {
        match self {
            TickerList::Static(list) => {
                let mut tickers = list.clone();
                tickers.sort();
                tickers
            }
            TickerList::Export(source) => source.fetch_tickers().await,
        }
    }
}

/// Read one column out of a CSV export, dropping blanks and duplicates
pub fn parse_tickers(data: &[u8], column: &str) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| MarketDataError::provider(format!("unreadable ticker export: {}", e)))?;
    let index = headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| MarketDataError::provider(format!("ticker export has no {} column", column)))?;

    let mut tickers = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| MarketDataError::provider(format!("bad ticker export row: {}", e)))?;
        if let Some(ticker) = record.get(index).map(str::trim).filter(|t| !t.is_empty()) {
            tickers.push(ticker.to_string());
        }
    }

    tickers.sort();
    tickers.dedup();
    Ok(tickers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_sorts_ticker_column() {
        let csv = "No.,Ticker,Company\n1,MSFT,Microsoft\n2,AAPL,Apple\n3,NVDA,NVIDIA\n";
        let tickers = parse_tickers(csv.as_bytes(), DEFAULT_TICKER_COLUMN).unwrap();

        assert_eq!(tickers, vec!["AAPL", "MSFT", "NVDA"]);
    }

    #[test]
    fn test_parse_skips_blank_cells() {
        let csv = "Ticker,Sector\nTSLA,Auto\n,Unknown\nAMD,Tech\nTSLA,Auto\n";
        let tickers = parse_tickers(csv.as_bytes(), "Ticker").unwrap();

        assert_eq!(tickers, vec!["AMD", "TSLA"]);
    }

    #[test]
    fn test_missing_column() {
        let csv = "Symbol,Company\nAAPL,Apple\n";
        assert_matches!(
            parse_tickers(csv.as_bytes(), "Ticker"),
            Err(MarketDataError::Provider(_))
        );
    }

    #[tokio::test]
    async fn test_static_list_is_sorted() {
        let list = TickerList::Static(vec!["TSLA".into(), "AAPL".into()]);
        assert_eq!(list.tickers().await, vec!["AAPL", "TSLA"]);
    }

    #[tokio::test]
    async fn test_unreachable_export_yields_empty() {
        let mut config = TickerSourceConfig::new("http://127.0.0.1:1/export.csv");
        config.timeout = Duration::from_millis(200);
        let source = TickerSource::new(config).unwrap();

        assert!(source.fetch_tickers().await.is_empty());
    }
}
