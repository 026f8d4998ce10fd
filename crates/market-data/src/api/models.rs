//! Request and response bodies for the HTTP API

use serde::{Deserialize, Serialize};

use crate::coordinator::StreamPhase;

/// POST /get_analysis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub ticker: String,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub expiration: String,
}

/// POST /get_expirations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpirationsRequest {
    #[serde(default)]
    pub ticker: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpirationsResponse {
    pub ticker: String,
    pub expirations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickersResponse {
    pub tickers: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamStatusResponse {
    pub phase: StreamPhase,
    pub active_ticker: Option<String>,
    pub subscribers: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }
}
