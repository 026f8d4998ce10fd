mod memory;
mod traits;
mod yahoo;

pub use memory::StaticGateway;
pub use traits::MarketDataGateway;
pub use yahoo::{YahooConfig, YahooGateway};

use crate::error::MarketDataError;
use crate::Result;

/// Trim and upper-case a ticker symbol, rejecting empty or malformed input
pub fn normalize_ticker(ticker: &str) -> Result<String> {
    let ticker = ticker.trim();
    let valid = !ticker.is_empty()
        && ticker.len() <= 12
        && ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));

    if valid {
        Ok(ticker.to_ascii_uppercase())
    } else {
        Err(MarketDataError::InvalidSymbol(ticker.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker(" aapl ").unwrap(), "AAPL");
        assert_eq!(normalize_ticker("brk.b").unwrap(), "BRK.B");
        assert_eq!(normalize_ticker("^spx").unwrap(), "^SPX");
        assert_matches!(normalize_ticker(""), Err(MarketDataError::InvalidSymbol(_)));
        assert_matches!(
            normalize_ticker("AAPL; DROP"),
            Err(MarketDataError::InvalidSymbol(_))
        );
    }
}
