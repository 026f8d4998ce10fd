//! Observability for oiwatch
//!
//! - Structured logging via `tracing`
//! - Prometheus metrics for the HTTP/WebSocket servers, the price stream and
//!   analysis requests
//!
//! ```ignore
//! use observability::{init_logging, LogFormat};
//!
//! init_logging("oiwatch", LogFormat::Pretty)?;
//! observability::metrics::init_metrics(9090)?;
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, init_logging_with_level, LogFormat};
pub use metrics::{
    init_metrics, AnalysisMetrics, AnalysisOutcome, RequestMetricsGuard, ServerMetrics,
    StreamMetrics,
};
