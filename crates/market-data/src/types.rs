//! Shared types for Market Data

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Option side (Call or Put)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionType {
    Call,
    Put,
}

/// One row of an option chain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionRow {
    /// Strike price
    pub strike: f64,
    /// Outstanding contracts at this strike
    pub open_interest: u64,
}

impl OptionRow {
    pub fn new(strike: f64, open_interest: u64) -> Self {
        Self {
            strike,
            open_interest,
        }
    }
}

/// Option chain for one ticker and expiration, as fetched from the provider.
///
/// Snapshots are immutable once fetched and are not retained after the
/// analysis that consumed them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub ticker: String,
    /// Expiration date as `YYYY-MM-DD`
    pub expiration_date: String,
    pub spot_price: f64,
    pub calls: Vec<OptionRow>,
    pub puts: Vec<OptionRow>,
}

impl ChainSnapshot {
    pub fn new(
        ticker: impl Into<String>,
        expiration_date: impl Into<String>,
        spot_price: f64,
        calls: Vec<OptionRow>,
        puts: Vec<OptionRow>,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            expiration_date: expiration_date.into(),
            spot_price,
            calls,
            puts,
        }
    }

    /// True when neither side carries a single strike
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.puts.is_empty()
    }

    /// Rows for one side of the chain
    pub fn side(&self, option_type: OptionType) -> &[OptionRow] {
        match option_type {
            OptionType::Call => &self.calls,
            OptionType::Put => &self.puts,
        }
    }

    /// Open interest at an exact strike on one side, if listed
    pub fn open_interest_at(&self, option_type: OptionType, strike: f64) -> Option<u64> {
        self.side(option_type)
            .iter()
            .find(|row| row.strike == strike)
            .map(|row| row.open_interest)
    }
}

/// A strike with large combined call + put open interest
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OIWall {
    pub strike: f64,
    pub combined_open_interest: u64,
}

/// Directional lean of a trade idea
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Bullish,
    Bearish,
}

/// A trading idea derived from max pain and wall proximity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeIdea {
    pub direction: Direction,
    pub strategy: String,
    pub rationale: String,
    pub action: String,
}

/// Market-maker lean inferred from simulated volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Prediction {
    Bullish,
    Bearish,
    Neutral,
}

/// Output of the market-maker volume simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketMakerAssessment {
    pub prediction: Prediction,
    pub rationale: String,
    /// Integer strikes examined, ascending
    pub strikes_in_focus: Vec<i64>,
    pub simulated_call_volume: u64,
    pub simulated_put_volume: u64,
}

/// Max pain strike and the aggregate payout at that strike
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaxPain {
    pub strike: f64,
    pub total_value: f64,
}

impl MaxPain {
    /// Result reported for a chain with no strikes
    pub const EMPTY: MaxPain = MaxPain {
        strike: 0.0,
        total_value: f64::INFINITY,
    };

    pub fn is_empty(&self) -> bool {
        self.total_value.is_infinite()
    }
}

/// Everything computed for one analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub ticker: String,
    pub expiration: String,
    pub spot_price: f64,
    pub max_pain: f64,
    /// Aggregate payout at the max pain strike; `None` for an empty chain
    pub max_pain_value: Option<f64>,
    pub top_walls: Vec<OIWall>,
    pub trade_ideas: Vec<TradeIdea>,
    pub gamma_flip: f64,
    pub mm_strategy: MarketMakerAssessment,
}

/// Spot price published by the broadcast loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub ticker: String,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

impl PriceUpdate {
    pub fn new(ticker: impl Into<String>, price: f64) -> Self {
        Self {
            ticker: ticker.into(),
            price,
            timestamp: Utc::now(),
        }
    }
}

/// Event pushed to stream subscribers.
///
/// Serialized as `{"event":"update_price","data":{"price":..}}`. The ticker
/// is implicit: every subscriber receives the single globally-active ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    UpdatePrice { price: f64 },
}

impl From<&PriceUpdate> for StreamEvent {
    fn from(update: &PriceUpdate) -> Self {
        StreamEvent::UpdatePrice {
            price: update.price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_interest_lookup() {
        let snapshot = ChainSnapshot::new(
            "AAPL",
            "2024-03-15",
            100.0,
            vec![OptionRow::new(100.0, 50)],
            vec![OptionRow::new(95.0, 20)],
        );

        assert_eq!(snapshot.open_interest_at(OptionType::Call, 100.0), Some(50));
        assert_eq!(snapshot.open_interest_at(OptionType::Put, 100.0), None);
        assert_eq!(snapshot.open_interest_at(OptionType::Put, 95.0), Some(20));
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn test_stream_event_wire_format() {
        let update = PriceUpdate::new("AAPL", 187.25);
        let json = serde_json::to_value(StreamEvent::from(&update)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"event": "update_price", "data": {"price": 187.25}})
        );
    }

    #[test]
    fn test_direction_serialization() {
        assert_eq!(
            serde_json::to_string(&Direction::Bearish).unwrap(),
            "\"BEARISH\""
        );
        assert_eq!(
            serde_json::to_string(&Prediction::Neutral).unwrap(),
            "\"NEUTRAL\""
        );
    }
}
