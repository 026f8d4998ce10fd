//! Configuration for oiwatch
//!
//! A single YAML document (`oiwatch.yaml`) with one section per concern.
//! Every section has defaults, so an empty file is a valid configuration.
//! `${VAR}` and `${VAR:-fallback}` placeholders are resolved from the
//! environment before parsing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod defaults;
pub mod parser;
pub mod substitution;
pub mod validator;

pub use defaults::*;
pub use parser::*;
pub use substitution::*;
pub use validator::*;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MasterConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub stream: StreamSettings,
    #[serde(default)]
    pub analytics: AnalyticsSettings,
    #[serde(default)]
    pub tickers: TickersConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub monitoring: Option<MonitoringConfig>,
}

/// Where the HTTP API and the WebSocket push listen
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            host: default_host(),
            http_port: default_http_port(),
            ws_port: default_ws_port(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Yahoo Finance HTTP endpoints
    #[default]
    Yahoo,
    /// Fixed quotes and chains from `provider.static_data`
    Static,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub static_data: Option<StaticDataConfig>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            base_url: default_provider_base_url(),
            user_agent: default_user_agent(),
            timeout_seconds: default_timeout_seconds(),
            static_data: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StaticDataConfig {
    /// Spot price per ticker
    #[serde(default)]
    pub quotes: BTreeMap<String, f64>,
    #[serde(default)]
    pub chains: Vec<StaticChainConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StaticChainConfig {
    pub ticker: String,
    /// `YYYY-MM-DD`
    pub expiration: String,
    #[serde(default)]
    pub calls: Vec<StrikeOpenInterest>,
    #[serde(default)]
    pub puts: Vec<StrikeOpenInterest>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct StrikeOpenInterest {
    pub strike: f64,
    pub open_interest: u64,
}

/// Live price broadcast loop
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StreamSettings {
    #[serde(default = "default_stream_interval_seconds")]
    pub interval_seconds: u64,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Start the loop when the first push client connects rather than at startup
    #[serde(default = "default_enabled")]
    pub start_on_first_subscriber: bool,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            interval_seconds: default_stream_interval_seconds(),
            channel_capacity: default_channel_capacity(),
            start_on_first_subscriber: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnalyticsSettings {
    #[serde(default = "default_top_walls")]
    pub top_walls: usize,
    #[serde(default = "default_max_pain_deviation_pct")]
    pub max_pain_deviation_pct: f64,
    #[serde(default = "default_wall_proximity_pct")]
    pub wall_proximity_pct: f64,
    #[serde(default = "default_bias_ratio")]
    pub bias_ratio: f64,
    #[serde(default = "default_volume_fraction_min")]
    pub volume_fraction_min: f64,
    #[serde(default = "default_volume_fraction_max")]
    pub volume_fraction_max: f64,
    #[serde(default = "default_gamma_flip_factor")]
    pub gamma_flip_factor: f64,
    /// Fixed seed for the volume simulation; random when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            top_walls: default_top_walls(),
            max_pain_deviation_pct: default_max_pain_deviation_pct(),
            wall_proximity_pct: default_wall_proximity_pct(),
            bias_ratio: default_bias_ratio(),
            volume_fraction_min: default_volume_fraction_min(),
            volume_fraction_max: default_volume_fraction_max(),
            gamma_flip_factor: default_gamma_flip_factor(),
            seed: None,
        }
    }
}

/// Ticker universe offered to clients
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TickersConfig {
    /// CSV screener export; takes precedence over `symbols`
    #[serde(default)]
    pub export_url: Option<String>,
    #[serde(default = "default_ticker_column")]
    pub column: String,
    #[serde(default)]
    pub symbols: Vec<String>,
}

impl Default for TickersConfig {
    fn default() -> Self {
        Self {
            export_url: None,
            column: default_ticker_column(),
            symbols: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// pretty | json | compact
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MonitoringConfig {
    /// Prometheus exporter port; exporter disabled when absent
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
service:
  name: oiwatch-dev
  host: 127.0.0.1
  http_port: 8000
  ws_port: 8001
provider:
  kind: static
  timeout_seconds: 5
  static_data:
    quotes:
      AAPL: 187.5
    chains:
      - ticker: AAPL
        expiration: "2024-03-15"
        calls:
          - { strike: 185.0, open_interest: 1200 }
        puts:
          - { strike: 180.0, open_interest: 900 }
stream:
  interval_seconds: 5
  start_on_first_subscriber: false
analytics:
  top_walls: 3
  seed: 42
tickers:
  symbols: [MSFT, AAPL]
logging:
  format: json
monitoring:
  metrics_port: 9090
"#;

    #[test]
    fn test_parse_full_config() {
        let config: MasterConfig = serde_yaml::from_str(FULL).unwrap();

        assert_eq!(config.service.name, "oiwatch-dev");
        assert_eq!(config.service.ws_port, 8001);
        assert_eq!(config.provider.kind, ProviderKind::Static);
        assert_eq!(config.provider.base_url, default_provider_base_url());

        let data = config.provider.static_data.as_ref().unwrap();
        assert_eq!(data.quotes["AAPL"], 187.5);
        assert_eq!(data.chains[0].calls[0].open_interest, 1200);

        assert_eq!(config.stream.interval_seconds, 5);
        assert_eq!(config.stream.channel_capacity, 64);
        assert!(!config.stream.start_on_first_subscriber);
        assert_eq!(config.analytics.top_walls, 3);
        assert_eq!(config.analytics.bias_ratio, 1.2);
        assert_eq!(config.analytics.seed, Some(42));
        assert_eq!(config.tickers.column, "Ticker");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.monitoring.unwrap().metrics_port, Some(9090));
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: MasterConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, MasterConfig::default());
        assert_eq!(config.service.http_port, 5000);
        assert_eq!(config.stream.interval_seconds, 10);
        assert_eq!(config.analytics.gamma_flip_factor, 0.98);
    }
}
