//! oiwatch CLI and server binary
//!
//! `start` serves the analysis API and the live price stream; the other
//! commands manage the configuration file or run one-off lookups.

mod app;

use anyhow::{Context, Result};
use cli::{Cli, Commands, LogFormatArg};
use config::{generate_default_config, load_config, save_config, validate_config, MasterConfig};
use market_data::normalize_ticker;
use observability::{init_logging_with_level, init_metrics, LogFormat};
use server::ServerExt;
use std::path::Path;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Start {
            config,
            http,
            ws,
            log_format,
        } => start_command(&config, http, ws, log_format).await,
        Commands::Validate { config } => {
            init_logging_with_level("oiwatch", LogFormat::Pretty, "warn")?;
            validate_command(&config)
        }
        Commands::Init { output, force } => {
            init_logging_with_level("oiwatch", LogFormat::Pretty, "warn")?;
            init_command(&output, force)
        }
        Commands::Analyze {
            ticker,
            expiration,
            config,
        } => {
            let config = load_quiet(&config)?;
            analyze_command(&config, &ticker, &expiration).await
        }
        Commands::Expirations { ticker, config } => {
            let config = load_quiet(&config)?;
            expirations_command(&config, &ticker).await
        }
        Commands::Tickers { config } => {
            let config = load_quiet(&config)?;
            tickers_command(&config).await
        }
    }
}

/// Load and validate, failing on any validation error
fn load_validated(path: &Path) -> Result<MasterConfig> {
    let config = load_config(path)?;
    ensure_valid(&config)?;
    Ok(config)
}

fn ensure_valid(config: &MasterConfig) -> Result<()> {
    let report = validate_config(config);

    for warning in &report.warnings {
        warn!(field = %warning.field, message = %warning.message, "Configuration warning");
    }

    if !report.is_valid() {
        error!(
            error_count = report.errors.len(),
            "Configuration validation failed"
        );
        for err in &report.errors {
            error!("{}", err);
        }
        anyhow::bail!("Cannot start due to configuration errors");
    }

    Ok(())
}

/// One-off commands print JSON on stdout; keep the logs to warnings
fn load_quiet(path: &Path) -> Result<MasterConfig> {
    init_logging_with_level("oiwatch", LogFormat::Compact, "warn")?;
    load_validated(path)
}

async fn start_command(
    config_path: &Path,
    http_override: Option<u16>,
    ws_override: Option<u16>,
    log_format: Option<LogFormatArg>,
) -> Result<()> {
    let config = load_config(config_path)?;

    let format = match log_format {
        Some(arg) => LogFormat::parse(arg.as_str()),
        None => LogFormat::parse(&config.logging.format),
    }
    .unwrap_or_default();
    init_logging_with_level(&config.service.name, format, &config.logging.level)?;

    info!(path = ?config_path, "oiwatch starting...");
    ensure_valid(&config)?;

    if let Some(port) = config.monitoring.as_ref().and_then(|m| m.metrics_port) {
        init_metrics(port)?;
    }

    let app = app::build_app(&config, http_override, ws_override)?;
    app.server.validate_ports().await?;

    if config.stream.start_on_first_subscriber {
        debug!("Price stream will start with the first subscriber");
    } else {
        app.coordinator.start();
    }

    info!(
        service = %config.service.name,
        http_port = ?app.server.config().http_port,
        ws_port = ?app.server.config().websocket_port,
        "Starting service"
    );

    app.server.run_with_ctrl_c().await?;

    info!("oiwatch stopped");
    Ok(())
}

fn validate_command(config_path: &Path) -> Result<()> {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "Failed to load configuration");
            anyhow::bail!(e);
        }
    };

    let report = validate_config(&config);

    println!("\n=== Configuration Validation Report ===\n");

    if !report.defaults_applied.is_empty() {
        println!("Defaults Applied ({}):", report.defaults_applied.len());
        for default in &report.defaults_applied {
            println!("  [info] {} = {}", default.field, default.value);
        }
        println!();
    }

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        println!();
        anyhow::bail!("Configuration validation failed");
    }

    println!("[ok] Configuration is valid!");
    println!();
    println!("Service: {}", config.service.name);
    println!(
        "Listening: http {}:{}, websocket {}:{}",
        config.service.host, config.service.http_port, config.service.host, config.service.ws_port
    );
    println!("Provider: {:?}", config.provider.kind);
    println!("Stream interval: {}s", config.stream.interval_seconds);

    Ok(())
}

fn init_command(output_path: &Path, force: bool) -> Result<()> {
    if output_path.exists() && !force {
        anyhow::bail!(
            "{:?} already exists; pass --force to overwrite it",
            output_path
        );
    }

    let config = generate_default_config();

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    save_config(&config, output_path)?;

    println!("[ok] Configuration file created successfully!");
    println!();
    println!("Location: {:?}", output_path);
    println!();
    println!("Next steps:");
    println!("  1. Edit the ticker list and provider settings");
    println!(
        "  2. Run 'oiwatch validate --config {:?}' to check configuration",
        output_path
    );
    println!(
        "  3. Run 'oiwatch start --config {:?}' to start serving",
        output_path
    );

    Ok(())
}

async fn analyze_command(config: &MasterConfig, ticker: &str, expiration: &str) -> Result<()> {
    let ticker = normalize_ticker(ticker)?;
    let gateway = app::build_gateway(&config.provider)?;
    let engine = app::build_engine(&config.analytics);

    let snapshot = gateway
        .fetch_chain(&ticker, expiration)
        .await
        .with_context(|| format!("Failed to fetch {} chain for {}", ticker, expiration))?;
    let result = engine.analyze(&snapshot);

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn expirations_command(config: &MasterConfig, ticker: &str) -> Result<()> {
    let ticker = normalize_ticker(ticker)?;
    let gateway = app::build_gateway(&config.provider)?;

    let expirations = gateway
        .fetch_expirations(&ticker)
        .await
        .with_context(|| format!("Failed to fetch expirations for {}", ticker))?;

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "ticker": ticker,
            "expirations": expirations,
        }))?
    );
    Ok(())
}

async fn tickers_command(config: &MasterConfig) -> Result<()> {
    let list = app::build_ticker_list(&config.tickers, &config.provider)?;
    for ticker in list.tickers().await {
        println!("{}", ticker);
    }
    Ok(())
}
