//! HTTP request handlers
//!
//! Every analysis request first points the live price stream at the requested
//! ticker, then fetches the chain and runs the analytics engine.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use observability::{AnalysisMetrics, AnalysisOutcome};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::models::*;
use crate::analytics::AnalyticsEngine;
use crate::coordinator::StreamCoordinator;
use crate::error::MarketDataError;
use crate::gateway::{normalize_ticker, MarketDataGateway};
use crate::tickers::TickerList;
use crate::types::AnalysisResult;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Shared state for the market data API
pub struct MarketDataApiState {
    pub gateway: Arc<dyn MarketDataGateway>,
    pub engine: Arc<AnalyticsEngine>,
    pub coordinator: Arc<StreamCoordinator>,
    pub tickers: TickerList,
    pub metrics: AnalysisMetrics,
}

impl MarketDataApiState {
    pub fn new(
        gateway: Arc<dyn MarketDataGateway>,
        engine: Arc<AnalyticsEngine>,
        coordinator: Arc<StreamCoordinator>,
        tickers: TickerList,
    ) -> Self {
        Self {
            gateway,
            engine,
            coordinator,
            tickers,
            metrics: AnalysisMetrics::new(),
        }
    }
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new("INVALID_REQUEST", message)),
    )
}

/// Malformed or mistyped bodies get the same envelope as every other error
fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| bad_request(rejection.body_text()))
}

/// Map a gateway failure onto a status code and error body
fn error_response(err: &MarketDataError) -> (ApiError, AnalysisOutcome) {
    let (status, code, outcome) = match err {
        MarketDataError::InvalidExpiration { .. } => (
            StatusCode::BAD_REQUEST,
            "INVALID_EXPIRATION",
            AnalysisOutcome::InvalidRequest,
        ),
        MarketDataError::InvalidSymbol(_) => (
            StatusCode::BAD_REQUEST,
            "INVALID_REQUEST",
            AnalysisOutcome::InvalidRequest,
        ),
        MarketDataError::DataUnavailable(_) | MarketDataError::EmptyChain(_) => (
            StatusCode::NOT_FOUND,
            "DATA_UNAVAILABLE",
            AnalysisOutcome::Unavailable,
        ),
        MarketDataError::Provider(_) | MarketDataError::Connection(_) => (
            StatusCode::BAD_GATEWAY,
            "PROVIDER_ERROR",
            AnalysisOutcome::ProviderError,
        ),
    };

    (
        (status, Json(ErrorResponse::new(code, err.to_string()))),
        outcome,
    )
}

/// POST /get_analysis
pub async fn get_analysis(
    State(state): State<Arc<MarketDataApiState>>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let started = Instant::now();

    let req = parse_body(payload).inspect_err(|_| {
        state.metrics.record(started, AnalysisOutcome::InvalidRequest);
    })?;

    let ticker = normalize_ticker(&req.ticker).map_err(|e| {
        state.metrics.record(started, AnalysisOutcome::InvalidRequest);
        bad_request(e.to_string())
    })?;
    let expiration = req.expiration.trim();
    if expiration.is_empty() {
        state.metrics.record(started, AnalysisOutcome::InvalidRequest);
        return Err(bad_request("expiration is required"));
    }

    // The stream follows the most recent request, whether or not it succeeds
    state.coordinator.set_target(ticker.as_str());

    let snapshot = match state.gateway.fetch_chain(&ticker, expiration).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(ticker = %ticker, expiration, error = %e, "Chain fetch failed");
            let (response, outcome) = error_response(&e);
            state.metrics.record(started, outcome);
            return Err(response);
        }
    };

    if snapshot.is_empty() {
        let empty = MarketDataError::EmptyChain(ticker.clone());
        warn!(expiration, error = %empty, "Analyzing chain without strikes");
    }

    let result = state.engine.analyze(&snapshot);
    state.metrics.record(started, AnalysisOutcome::Ok);

    info!(
        ticker = %ticker,
        expiration,
        max_pain = result.max_pain,
        prediction = ?result.mm_strategy.prediction,
        "Analysis served"
    );

    Ok(Json(result))
}

/// POST /get_expirations
pub async fn get_expirations(
    State(state): State<Arc<MarketDataApiState>>,
    payload: Result<Json<ExpirationsRequest>, JsonRejection>,
) -> Result<Json<ExpirationsResponse>, ApiError> {
    let req = parse_body(payload)?;
    let ticker = normalize_ticker(&req.ticker).map_err(|e| bad_request(e.to_string()))?;

    let expirations = state.gateway.fetch_expirations(&ticker).await.map_err(|e| {
        warn!(ticker = %ticker, error = %e, "Expiration lookup failed");
        error_response(&e).0
    })?;

    Ok(Json(ExpirationsResponse {
        ticker,
        expirations,
    }))
}

/// GET /api/v1/tickers
pub async fn list_tickers(State(state): State<Arc<MarketDataApiState>>) -> Json<TickersResponse> {
    Json(TickersResponse {
        tickers: state.tickers.tickers().await,
    })
}

/// GET /api/v1/stream
pub async fn stream_status(
    State(state): State<Arc<MarketDataApiState>>,
) -> Json<StreamStatusResponse> {
    let coordinator = &state.coordinator;
    Json(StreamStatusResponse {
        phase: coordinator.phase(),
        active_ticker: coordinator.active_ticker(),
        subscribers: coordinator.subscriber_count(),
    })
}
