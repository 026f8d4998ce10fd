use crate::*;
use chrono::NaiveDate;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Service name is required")]
    MissingServiceName,

    #[error("{field} must be a non-zero port")]
    InvalidPort { field: String },

    #[error("HTTP and WebSocket servers cannot share port {0}")]
    PortConflict(u16),

    #[error("{field} is not a valid URL: {message}")]
    InvalidUrl { field: String, message: String },

    #[error("{field} must be a positive integer")]
    InvalidPositiveInteger { field: String },

    #[error("{field} must be a positive float")]
    InvalidPositiveFloat { field: String },

    #[error("{field}: {message}")]
    InvalidRange { field: String, message: String },

    #[error("Static provider selected but provider.static_data is missing")]
    MissingStaticData,

    #[error("Static quote for {ticker}: {message}")]
    InvalidStaticQuote { ticker: String, message: String },

    #[error("Static chain {ticker} {expiration}: {message}")]
    InvalidStaticChain {
        ticker: String,
        expiration: String,
        message: String,
    },

    #[error("Invalid log format '{0}'. Must be one of: pretty, json, compact")]
    InvalidLogFormat(String),

    #[error("Environment variable '{var}' is missing or invalid: {message}")]
    InvalidEnvVar { var: String, message: String },
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct DefaultApplied {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub defaults_applied: Vec<DefaultApplied>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            defaults_applied: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_default(&mut self, field: &str, value: &str) {
        self.defaults_applied.push(DefaultApplied {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_config(config: &MasterConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_service(&config.service, &mut report);
    validate_provider(&config.provider, &mut report);
    validate_stream(&config.stream, &mut report);
    validate_analytics(&config.analytics, &mut report);
    validate_tickers(&config.tickers, &config.provider, &mut report);
    validate_logging(&config.logging, &mut report);

    match &config.monitoring {
        Some(MonitoringConfig {
            metrics_port: Some(port),
        }) => {
            if *port == 0 {
                report.add_error(ValidationError::InvalidPort {
                    field: "monitoring.metrics_port".to_string(),
                });
            } else if *port == config.service.http_port || *port == config.service.ws_port {
                report.add_error(ValidationError::PortConflict(*port));
            }
        }
        _ => report.add_default("monitoring.metrics_port", "disabled"),
    }

    report
}

fn validate_service(service: &ServiceConfig, report: &mut ValidationReport) {
    if service.name.trim().is_empty() {
        report.add_error(ValidationError::MissingServiceName);
    }

    check_env_placeholders("service.host", &service.host, report);

    for (field, port) in [
        ("service.http_port", service.http_port),
        ("service.ws_port", service.ws_port),
    ] {
        if port == 0 {
            report.add_error(ValidationError::InvalidPort {
                field: field.to_string(),
            });
        } else if port < 1024 {
            report.add_warning(field, &format!("Port {} may require elevated privileges", port));
        }
    }

    if service.http_port != 0 && service.http_port == service.ws_port {
        report.add_error(ValidationError::PortConflict(service.http_port));
    }
}

fn validate_provider(provider: &ProviderConfig, report: &mut ValidationReport) {
    if provider.timeout_seconds == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "provider.timeout_seconds".to_string(),
        });
    }

    match provider.kind {
        ProviderKind::Yahoo => {
            validate_url("provider.base_url", &provider.base_url, report);
            if provider.static_data.is_some() {
                report.add_warning(
                    "provider.static_data",
                    "Ignored unless provider.kind is 'static'",
                );
            }
        }
        ProviderKind::Static => match &provider.static_data {
            Some(data) => validate_static_data(data, report),
            None => report.add_error(ValidationError::MissingStaticData),
        },
    }
}

fn validate_static_data(data: &StaticDataConfig, report: &mut ValidationReport) {
    for (ticker, price) in &data.quotes {
        if !price.is_finite() || *price <= 0.0 {
            report.add_error(ValidationError::InvalidStaticQuote {
                ticker: ticker.clone(),
                message: format!("price must be positive, got: {}", price),
            });
        }
    }

    for chain in &data.chains {
        let invalid = |message: String| ValidationError::InvalidStaticChain {
            ticker: chain.ticker.clone(),
            expiration: chain.expiration.clone(),
            message,
        };

        if NaiveDate::parse_from_str(&chain.expiration, "%Y-%m-%d").is_err() {
            report.add_error(invalid("expiration must be YYYY-MM-DD".to_string()));
        }

        if let Some(row) = chain
            .calls
            .iter()
            .chain(chain.puts.iter())
            .find(|row| !row.strike.is_finite() || row.strike <= 0.0)
        {
            report.add_error(invalid(format!("strike must be positive, got: {}", row.strike)));
        }

        if !data.quotes.contains_key(&chain.ticker) {
            report.add_warning(
                "provider.static_data.quotes",
                &format!("No spot price for {}; its analysis will fail", chain.ticker),
            );
        }
    }
}

fn validate_stream(stream: &StreamSettings, report: &mut ValidationReport) {
    if stream.interval_seconds == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "stream.interval_seconds".to_string(),
        });
    } else if stream.interval_seconds < 5 {
        report.add_warning(
            "stream.interval_seconds",
            "Short intervals may hit provider rate limits",
        );
    }

    if stream.channel_capacity == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "stream.channel_capacity".to_string(),
        });
    }
}

fn validate_analytics(analytics: &AnalyticsSettings, report: &mut ValidationReport) {
    if analytics.top_walls == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "analytics.top_walls".to_string(),
        });
    }

    for (field, value) in [
        ("analytics.max_pain_deviation_pct", analytics.max_pain_deviation_pct),
        ("analytics.wall_proximity_pct", analytics.wall_proximity_pct),
        ("analytics.bias_ratio", analytics.bias_ratio),
        ("analytics.gamma_flip_factor", analytics.gamma_flip_factor),
    ] {
        if !value.is_finite() || value <= 0.0 {
            report.add_error(ValidationError::InvalidPositiveFloat {
                field: field.to_string(),
            });
        }
    }

    if analytics.bias_ratio.is_finite() && analytics.bias_ratio > 0.0 && analytics.bias_ratio < 1.0 {
        report.add_warning(
            "analytics.bias_ratio",
            "Ratios below 1.0 make both directional predictions possible at once",
        );
    }

    let (min, max) = (analytics.volume_fraction_min, analytics.volume_fraction_max);
    // Equal bounds pin the simulated fraction to a single value
    if !(min.is_finite() && max.is_finite() && min >= 0.0 && min <= max && max <= 1.0) {
        report.add_error(ValidationError::InvalidRange {
            field: "analytics.volume_fraction_min/max".to_string(),
            message: format!("need 0 <= min <= max <= 1, got: [{}, {}]", min, max),
        });
    }

    if analytics.seed.is_none() {
        report.add_default("analytics.seed", "random");
    }
}

fn validate_tickers(tickers: &TickersConfig, provider: &ProviderConfig, report: &mut ValidationReport) {
    match &tickers.export_url {
        Some(url) => {
            validate_url("tickers.export_url", url, report);
            if tickers.column.trim().is_empty() {
                report.add_error(ValidationError::InvalidRange {
                    field: "tickers.column".to_string(),
                    message: "column name is required".to_string(),
                });
            }
            if !tickers.symbols.is_empty() {
                report.add_warning("tickers.symbols", "Ignored when tickers.export_url is set");
            }
        }
        None if tickers.symbols.is_empty() => {
            if let (ProviderKind::Static, Some(data)) = (provider.kind, &provider.static_data) {
                let count = data.quotes.len();
                report.add_default("tickers.symbols", &format!("{} static quote tickers", count));
            } else {
                report.add_warning("tickers.symbols", "No ticker source configured; ticker list will be empty");
            }
        }
        None => {}
    }
}

fn validate_logging(logging: &LoggingConfig, report: &mut ValidationReport) {
    let valid_formats = ["pretty", "json", "compact"];
    if !valid_formats.contains(&logging.format.to_lowercase().as_str()) {
        report.add_error(ValidationError::InvalidLogFormat(logging.format.clone()));
    }
}

fn validate_url(field: &str, value: &str, report: &mut ValidationReport) {
    if check_env_placeholders(field, value, report) {
        return;
    }

    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => report.add_error(ValidationError::InvalidUrl {
            field: field.to_string(),
            message: format!("unsupported scheme '{}'", url.scheme()),
        }),
        Err(e) => report.add_error(ValidationError::InvalidUrl {
            field: field.to_string(),
            message: e.to_string(),
        }),
    }
}

/// Report placeholders that survived substitution; true when any were found
fn check_env_placeholders(field: &str, value: &str, report: &mut ValidationReport) -> bool {
    let vars = unresolved_env_vars(value).unwrap_or_default();
    for var in &vars {
        report.add_error(ValidationError::InvalidEnvVar {
            var: var.clone(),
            message: format!("referenced by {} but not set", field),
        });
    }
    !vars.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn static_config() -> MasterConfig {
        let mut config = MasterConfig::default();
        config.provider.kind = ProviderKind::Static;
        config.provider.static_data = Some(StaticDataConfig {
            quotes: [("AAPL".to_string(), 187.5)].into_iter().collect(),
            chains: vec![StaticChainConfig {
                ticker: "AAPL".to_string(),
                expiration: "2024-03-15".to_string(),
                calls: vec![StrikeOpenInterest {
                    strike: 185.0,
                    open_interest: 1200,
                }],
                puts: vec![],
            }],
        });
        config
    }

    #[test]
    fn test_default_config_is_valid() {
        let report = validate_config(&MasterConfig::default());
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report
            .defaults_applied
            .iter()
            .any(|d| d.field == "analytics.seed" && d.value == "random"));
    }

    #[test]
    fn test_port_checks() {
        let mut config = MasterConfig::default();
        config.service.ws_port = config.service.http_port;
        let report = validate_config(&config);
        assert_matches!(report.errors.as_slice(), [ValidationError::PortConflict(5000)]);

        config.service.http_port = 0;
        config.service.ws_port = 80;
        let report = validate_config(&config);
        assert_matches!(
            report.errors.as_slice(),
            [ValidationError::InvalidPort { field }] if field == "service.http_port"
        );
        assert!(report.warnings.iter().any(|w| w.field == "service.ws_port"));
    }

    #[test]
    fn test_metrics_port_conflict() {
        let mut config = MasterConfig::default();
        config.monitoring = Some(MonitoringConfig {
            metrics_port: Some(5001),
        });
        assert_matches!(
            validate_config(&config).errors.as_slice(),
            [ValidationError::PortConflict(5001)]
        );
    }

    #[test]
    fn test_stream_and_analytics_bounds() {
        let mut config = MasterConfig::default();
        config.stream.interval_seconds = 0;
        config.analytics.bias_ratio = 0.0;
        config.analytics.volume_fraction_min = 0.6;

        let errors = validate_config(&config).errors;
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::InvalidPositiveInteger {
            field: "stream.interval_seconds".to_string()
        }));
        assert!(errors.contains(&ValidationError::InvalidPositiveFloat {
            field: "analytics.bias_ratio".to_string()
        }));
        assert_matches!(errors[2], ValidationError::InvalidRange { .. });
    }

    #[test]
    fn test_fixed_volume_fraction() {
        let mut config = MasterConfig::default();
        config.analytics.volume_fraction_min = 0.3;
        config.analytics.volume_fraction_max = 0.3;
        assert!(validate_config(&config).is_valid());

        config.analytics.volume_fraction_max = 1.2;
        assert_matches!(
            validate_config(&config).errors.as_slice(),
            [ValidationError::InvalidRange { .. }]
        );
    }

    #[test]
    fn test_static_provider() {
        let report = validate_config(&static_config());
        assert!(report.is_valid(), "{:?}", report.errors);

        let mut missing = static_config();
        missing.provider.static_data = None;
        assert_matches!(
            validate_config(&missing).errors.as_slice(),
            [ValidationError::MissingStaticData]
        );

        let mut bad = static_config();
        if let Some(data) = bad.provider.static_data.as_mut() {
            data.chains[0].expiration = "15/03/2024".to_string();
            data.quotes.insert("TSLA".to_string(), -1.0);
        }
        let errors = validate_config(&bad).errors;
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidStaticChain { .. })));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidStaticQuote { ticker, .. } if ticker == "TSLA")));
    }

    #[test]
    fn test_urls_and_placeholders() {
        let mut config = MasterConfig::default();
        config.provider.base_url = "not a url".to_string();
        config.tickers.export_url = Some("${OIWATCH_TEST_EXPORT_URL}".to_string());

        let errors = validate_config(&config).errors;
        assert_eq!(errors.len(), 2);
        assert_matches!(&errors[0], ValidationError::InvalidUrl { field, .. } if field == "provider.base_url");
        assert_matches!(&errors[1], ValidationError::InvalidEnvVar { var, .. } if var == "OIWATCH_TEST_EXPORT_URL");
    }

    #[test]
    fn test_log_format() {
        let mut config = MasterConfig::default();
        config.logging.format = "xml".to_string();
        assert_matches!(
            validate_config(&config).errors.as_slice(),
            [ValidationError::InvalidLogFormat(f)] if f == "xml"
        );
    }
}
