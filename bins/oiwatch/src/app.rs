//! Wiring from configuration to running components

use anyhow::{Context, Result};
use config::{
    AnalyticsSettings, MasterConfig, ProviderConfig, ProviderKind, ServiceConfig, StaticDataConfig,
    StreamSettings, TickersConfig,
};
use market_data::api::{create_router, MarketDataApiState, PriceStreamHandler};
use market_data::{
    AnalyticsEngine, AnalyticsParams, MarketDataGateway, OptionRow, StaticGateway, StreamConfig,
    StreamCoordinator, StreamState, TickerList, TickerSource, TickerSourceConfig, YahooConfig,
    YahooGateway,
};
use server::{AppServer, ServerConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Everything the `start` command runs
pub struct App {
    pub coordinator: Arc<StreamCoordinator>,
    pub server: AppServer,
}

pub fn build_gateway(provider: &ProviderConfig) -> Result<Arc<dyn MarketDataGateway>> {
    match provider.kind {
        ProviderKind::Yahoo => {
            let gateway = YahooGateway::new(YahooConfig {
                base_url: provider.base_url.clone(),
                user_agent: provider.user_agent.clone(),
                timeout: Duration::from_secs(provider.timeout_seconds),
            })
            .context("Failed to build Yahoo gateway")?;
            Ok(Arc::new(gateway))
        }
        ProviderKind::Static => {
            let data = provider
                .static_data
                .as_ref()
                .context("provider.static_data is required for the static provider")?;
            Ok(Arc::new(static_gateway(data)))
        }
    }
}

fn static_gateway(data: &StaticDataConfig) -> StaticGateway {
    let gateway = StaticGateway::new();
    for (ticker, price) in &data.quotes {
        gateway.set_spot_price(ticker.to_uppercase(), *price);
    }

    let rows = |side: &[config::StrikeOpenInterest]| -> Vec<OptionRow> {
        side.iter()
            .map(|row| OptionRow::new(row.strike, row.open_interest))
            .collect()
    };
    for chain in &data.chains {
        gateway.insert_chain(
            chain.ticker.to_uppercase(),
            chain.expiration.clone(),
            rows(&chain.calls),
            rows(&chain.puts),
        );
    }
    gateway
}

pub fn build_engine(settings: &AnalyticsSettings) -> AnalyticsEngine {
    let params = AnalyticsParams {
        top_walls: settings.top_walls,
        max_pain_deviation_pct: settings.max_pain_deviation_pct,
        wall_proximity_pct: settings.wall_proximity_pct,
        bias_ratio: settings.bias_ratio,
        volume_fraction_min: settings.volume_fraction_min,
        volume_fraction_max: settings.volume_fraction_max,
        gamma_flip_factor: settings.gamma_flip_factor,
    };

    match settings.seed {
        Some(seed) => AnalyticsEngine::with_seed(params, seed),
        None => AnalyticsEngine::new(params),
    }
}

/// Export URL first, then configured symbols, then the static provider's quotes
pub fn build_ticker_list(tickers: &TickersConfig, provider: &ProviderConfig) -> Result<TickerList> {
    if let Some(url) = &tickers.export_url {
        let source = TickerSource::new(TickerSourceConfig {
            export_url: url.clone(),
            column: tickers.column.clone(),
            user_agent: provider.user_agent.clone(),
            timeout: Duration::from_secs(provider.timeout_seconds),
        })
        .context("Failed to build ticker export client")?;
        return Ok(TickerList::Export(source));
    }

    if !tickers.symbols.is_empty() {
        return Ok(TickerList::Static(tickers.symbols.clone()));
    }

    let from_quotes: Vec<String> = match (provider.kind, &provider.static_data) {
        (ProviderKind::Static, Some(data)) => data.quotes.keys().map(|t| t.to_uppercase()).collect(),
        _ => Vec::new(),
    };
    Ok(TickerList::Static(from_quotes))
}

pub fn stream_config(settings: &StreamSettings) -> StreamConfig {
    StreamConfig {
        interval: Duration::from_secs(settings.interval_seconds),
        channel_capacity: settings.channel_capacity,
    }
}

/// Command line ports take precedence over the configured ones
pub fn server_config(service: &ServiceConfig, http: Option<u16>, ws: Option<u16>) -> ServerConfig {
    ServerConfig::new(
        service.host.clone(),
        http.unwrap_or(service.http_port),
        ws.unwrap_or(service.ws_port),
    )
}

pub fn build_app(config: &MasterConfig, http: Option<u16>, ws: Option<u16>) -> Result<App> {
    let gateway = build_gateway(&config.provider)?;
    let engine = Arc::new(build_engine(&config.analytics));
    let tickers = build_ticker_list(&config.tickers, &config.provider)?;

    let coordinator = Arc::new(StreamCoordinator::new(
        Arc::new(StreamState::new()),
        gateway.clone(),
        stream_config(&config.stream),
    ));

    let state = Arc::new(MarketDataApiState::new(
        gateway.clone(),
        engine,
        coordinator.clone(),
        tickers,
    ));
    let router = create_router(state, &config.service.name);
    let handler = Arc::new(PriceStreamHandler::new(
        coordinator.clone(),
        config.stream.start_on_first_subscriber,
    ));

    let server_config = server_config(&config.service, http, ws);
    info!(
        provider = gateway.name(),
        host = %server_config.host,
        http_port = ?server_config.http_port,
        ws_port = ?server_config.websocket_port,
        "Components built"
    );

    let server = AppServer::new(config.service.name.clone(), server_config)
        .with_http_router(router)
        .with_ws_handler(handler);

    Ok(App {
        coordinator,
        server,
    })
}
