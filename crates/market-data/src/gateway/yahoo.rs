//! Yahoo Finance gateway
//!
//! Spot prices come from the chart endpoint, expirations and chains from the
//! options endpoint. Expirations are exchanged with the provider as UTC
//! midnight unix timestamps and exposed as `YYYY-MM-DD`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use super::traits::MarketDataGateway;
use crate::error::MarketDataError;
use crate::types::{ChainSnapshot, OptionRow};
use crate::Result;

pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";

/// Connection settings for [`YahooGateway`]
#[derive(Debug, Clone)]
pub struct YahooConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

pub struct YahooGateway {
    client: Client,
    base_url: String,
}

impl YahooGateway {
    pub fn new(config: YahooConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MarketDataError::unavailable(format!(
                "{} returned {}",
                url, status
            )));
        }
        Ok(response.json::<T>().await?)
    }

    async fn options(&self, ticker: &str, date: Option<i64>) -> Result<OptionChainResult> {
        let url = format!("{}/v7/finance/options/{}", self.base_url, ticker);
        let query: Vec<(&str, String)> = date
            .map(|ts| vec![("date", ts.to_string())])
            .unwrap_or_default();

        let body: OptionsResponse = self.get_json(&url, &query).await?;
        first_result(ticker, body.option_chain.result, body.option_chain.error)
    }
}

#[async_trait]
impl MarketDataGateway for YahooGateway {
    #[instrument(skip(self))]
    async fn fetch_spot_price(&self, ticker: &str) -> Result<f64> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);
        let query = [("range", "1d".to_string()), ("interval", "1m".to_string())];

        let body: ChartResponse = self.get_json(&url, &query).await?;
        let result = first_result(ticker, body.chart.result, body.chart.error)?;
        spot_from_chart(ticker, &result)
    }

    #[instrument(skip(self))]
    async fn fetch_chain(&self, ticker: &str, expiration: &str) -> Result<ChainSnapshot> {
        let listed = self.options(ticker, None).await?;
        let date = expiration_timestamp(expiration)
            .filter(|ts| listed.expiration_dates.contains(ts))
            .ok_or_else(|| MarketDataError::invalid_expiration(ticker, expiration))?;

        let chain = self.options(ticker, Some(date)).await?;
        let (calls, puts) = rows_from_chain(&chain);
        debug!(calls = calls.len(), puts = puts.len(), "Option chain fetched");

        let spot = self.fetch_spot_price(ticker).await?;
        Ok(ChainSnapshot::new(ticker, expiration, spot, calls, puts))
    }

    #[instrument(skip(self))]
    async fn fetch_expirations(&self, ticker: &str) -> Result<Vec<String>> {
        let listed = self.options(ticker, None).await?;
        Ok(listed
            .expiration_dates
            .iter()
            .filter_map(|&ts| expiration_label(ts))
            .collect())
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Envelope<ChartResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionsResponse {
    option_chain: Envelope<OptionChainResult>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: Option<Vec<T>>,
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionChainResult {
    #[serde(default)]
    expiration_dates: Vec<i64>,
    #[serde(default)]
    options: Vec<OptionSet>,
}

#[derive(Debug, Deserialize)]
struct OptionSet {
    #[serde(default)]
    calls: Vec<Contract>,
    #[serde(default)]
    puts: Vec<Contract>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Contract {
    strike: f64,
    #[serde(default)]
    open_interest: Option<u64>,
}

fn first_result<T>(
    ticker: &str,
    results: Option<Vec<T>>,
    error: Option<ProviderError>,
) -> Result<T> {
    if let Some(error) = error {
        return Err(MarketDataError::unavailable(format!(
            "{}: {}",
            ticker, error.description
        )));
    }
    results
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| MarketDataError::unavailable(format!("no data returned for {}", ticker)))
}

/// Regular market price, falling back to the last non-null close
fn spot_from_chart(ticker: &str, result: &ChartResult) -> Result<f64> {
    let last_close = || {
        result
            .indicators
            .as_ref()
            .and_then(|i| i.quote.first())
            .and_then(|q| q.close.iter().rev().flatten().next().copied())
    };

    result
        .meta
        .regular_market_price
        .or_else(last_close)
        .filter(|p| p.is_finite() && *p > 0.0)
        .ok_or_else(|| MarketDataError::unavailable(format!("no recent price for {}", ticker)))
}

fn rows_from_chain(chain: &OptionChainResult) -> (Vec<OptionRow>, Vec<OptionRow>) {
    let to_rows = |contracts: &[Contract]| -> Vec<OptionRow> {
        contracts
            .iter()
            .map(|c| OptionRow::new(c.strike, c.open_interest.unwrap_or(0)))
            .collect()
    };

    match chain.options.first() {
        Some(set) => (to_rows(&set.calls), to_rows(&set.puts)),
        None => (Vec::new(), Vec::new()),
    }
}

fn expiration_timestamp(expiration: &str) -> Option<i64> {
    NaiveDate::parse_from_str(expiration, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
}

fn expiration_label(timestamp: i64) -> Option<String> {
    DateTime::from_timestamp(timestamp, 0).map(|dt| dt.date_naive().format("%Y-%m-%d").to_string())
}
