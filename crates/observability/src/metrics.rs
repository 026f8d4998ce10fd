//! Prometheus metrics infrastructure
//!
//! The exporter is optional; when it is never installed every metric handle
//! below records into the no-op recorder, so the types are always safe to use.

use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Initialize the Prometheus metrics exporter
///
/// Starts an HTTP listener on `port` exposing `/metrics`.
///
/// # Example
///
/// ```ignore
/// observability::metrics::init_metrics(9090)?;
/// ```
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(%addr, "Metrics server listening");
    Ok(())
}

/// Per-server request and connection metrics
///
/// * `server_requests_total`
/// * `server_request_duration_seconds`
/// * `server_active_connections`
#[derive(Clone)]
pub struct ServerMetrics {
    requests_total: Counter,
    request_duration: Histogram,
    active_connections: Gauge,
    server_name: String,
}

impl ServerMetrics {
    /// Create metrics for a named server ("http", "websocket")
    pub fn new(server_name: &str) -> Self {
        let name = server_name.to_string();

        Self {
            requests_total: counter!("server_requests_total", "server" => name.clone()),
            request_duration: histogram!("server_request_duration_seconds", "server" => name.clone()),
            active_connections: gauge!("server_active_connections", "server" => name.clone()),
            server_name: name,
        }
    }

    pub fn record_request(&self, duration: Duration, status_code: u16) {
        self.requests_total.increment(1);
        counter!(
            "server_requests_by_status",
            "server" => self.server_name.clone(),
            "status" => status_code.to_string()
        )
        .increment(1);
        self.request_duration.record(duration.as_secs_f64());
    }

    pub fn connection_opened(&self) {
        self.active_connections.increment(1.0);
    }

    pub fn connection_closed(&self) {
        self.active_connections.decrement(1.0);
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }
}

/// Metrics for the live price broadcast loop
///
/// * `stream_ticks_total` - loop iterations, idle ones included
/// * `stream_broadcasts_total` - price updates published
/// * `stream_fetch_failures_total` - spot price lookups that failed
/// * `stream_subscribers` - currently connected push clients
/// * `stream_last_price` - last published price
#[derive(Clone)]
pub struct StreamMetrics {
    ticks: Counter,
    broadcasts: Counter,
    fetch_failures: Counter,
    subscribers: Gauge,
    last_price: Gauge,
}

impl StreamMetrics {
    pub fn new() -> Self {
        Self {
            ticks: counter!("stream_ticks_total"),
            broadcasts: counter!("stream_broadcasts_total"),
            fetch_failures: counter!("stream_fetch_failures_total"),
            subscribers: gauge!("stream_subscribers"),
            last_price: gauge!("stream_last_price"),
        }
    }

    pub fn tick(&self) {
        self.ticks.increment(1);
    }

    pub fn broadcast(&self, price: f64) {
        self.broadcasts.increment(1);
        self.last_price.set(price);
    }

    pub fn fetch_failed(&self) {
        self.fetch_failures.increment(1);
    }

    pub fn subscriber_joined(&self) {
        self.subscribers.increment(1.0);
    }

    pub fn subscriber_left(&self) {
        self.subscribers.decrement(1.0);
    }
}

impl Default for StreamMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome label attached to analysis metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Ok,
    InvalidRequest,
    Unavailable,
    ProviderError,
}

impl AnalysisOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::InvalidRequest => "invalid_request",
            Self::Unavailable => "unavailable",
            Self::ProviderError => "provider_error",
        }
    }
}

/// Metrics for analysis requests
///
/// * `analysis_requests_total{outcome}`
/// * `analysis_duration_seconds`
#[derive(Clone)]
pub struct AnalysisMetrics {
    duration: Histogram,
}

impl AnalysisMetrics {
    pub fn new() -> Self {
        Self {
            duration: histogram!("analysis_duration_seconds"),
        }
    }

    pub fn record(&self, started: Instant, outcome: AnalysisOutcome) {
        counter!("analysis_requests_total", "outcome" => outcome.as_str()).increment(1);
        self.duration.record(started.elapsed().as_secs_f64());
    }
}

impl Default for AnalysisMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Records request duration and status on drop
///
/// ```ignore
/// let metrics = ServerMetrics::new("http");
/// {
///     let mut guard = RequestMetricsGuard::new(&metrics);
///     guard.set_status(404);
/// }
/// ```
pub struct RequestMetricsGuard<'a> {
    metrics: &'a ServerMetrics,
    start: Instant,
    status_code: u16,
}

impl<'a> RequestMetricsGuard<'a> {
    pub fn new(metrics: &'a ServerMetrics) -> Self {
        Self {
            metrics,
            start: Instant::now(),
            status_code: 200,
        }
    }

    pub fn set_status(&mut self, code: u16) {
        self.status_code = code;
    }
}

impl Drop for RequestMetricsGuard<'_> {
    fn drop(&mut self) {
        self.metrics.record_request(self.start.elapsed(), self.status_code);
    }
}
