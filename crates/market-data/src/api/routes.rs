use axum::{
    routing::{get, post},
    Router,
};
use server::{health_routes, HealthState};
use std::sync::Arc;

use super::handlers::*;

pub fn create_router(state: Arc<MarketDataApiState>, service_name: &str) -> Router {
    Router::new()
        .route("/get_analysis", post(get_analysis))
        .route("/get_expirations", post(get_expirations))
        .route("/api/v1/tickers", get(list_tickers))
        .route("/api/v1/stream", get(stream_status))
        .with_state(state)
        .merge(health_routes(Arc::new(HealthState::new(service_name))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{AnalyticsEngine, AnalyticsParams};
    use crate::coordinator::{StreamConfig, StreamCoordinator, StreamState};
    use crate::gateway::StaticGateway;
    use crate::tickers::TickerList;
    use crate::types::{AnalysisResult, OptionRow};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct Fixture {
        router: Router,
        coordinator: Arc<StreamCoordinator>,
    }

    fn fixture() -> Fixture {
        let gateway = Arc::new(StaticGateway::new());
        gateway.set_spot_price("AAPL", 104.0);
        gateway.insert_chain(
            "AAPL",
            "2024-03-15",
            vec![OptionRow::new(100.0, 3400), OptionRow::new(105.0, 2100)],
            vec![OptionRow::new(95.0, 2600), OptionRow::new(100.0, 3100)],
        );
        gateway.insert_chain("AAPL", "2024-04-19", vec![], vec![]);

        let coordinator = Arc::new(StreamCoordinator::new(
            Arc::new(StreamState::new()),
            gateway.clone(),
            StreamConfig::default(),
        ));
        let state = MarketDataApiState::new(
            gateway,
            Arc::new(AnalyticsEngine::with_seed(AnalyticsParams::default(), 1)),
            coordinator.clone(),
            TickerList::Static(vec!["MSFT".into(), "AAPL".into()]),
        );

        Fixture {
            router: create_router(Arc::new(state), "oiwatch"),
            coordinator,
        }
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_analysis_sets_stream_target() {
        let fx = fixture();
        let response = fx
            .router
            .oneshot(post_json(
                "/get_analysis",
                json!({"ticker": "aapl", "expiration": "2024-03-15"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let result: AnalysisResult = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(result.ticker, "AAPL");
        assert_eq!(result.max_pain, 100.0);
        assert_eq!(result.gamma_flip, 101.92);
        assert_eq!(fx.coordinator.active_ticker().as_deref(), Some("AAPL"));
    }

    #[tokio::test]
    async fn test_empty_chain_still_answers() {
        let fx = fixture();
        let response = fx
            .router
            .oneshot(post_json(
                "/get_analysis",
                json!({"ticker": "AAPL", "expiration": "2024-04-19"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["max_pain"], 0.0);
        assert_eq!(body["mm_strategy"]["prediction"], "NEUTRAL");
    }

    #[tokio::test]
    async fn test_invalid_expiration_is_400() {
        let fx = fixture();
        let response = fx
            .router
            .oneshot(post_json(
                "/get_analysis",
                json!({"ticker": "AAPL", "expiration": "2031-01-17"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "INVALID_EXPIRATION");
        // Target is switched before the fetch
        assert_eq!(fx.coordinator.active_ticker().as_deref(), Some("AAPL"));
    }

    #[tokio::test]
    async fn test_unknown_ticker_is_404() {
        let fx = fixture();
        let response = fx
            .router
            .oneshot(post_json(
                "/get_analysis",
                json!({"ticker": "ZZZZ", "expiration": "2024-03-15"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], "DATA_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_missing_fields_are_400() {
        let fx = fixture();
        let response = fx
            .router
            .oneshot(post_json("/get_analysis", json!({"ticker": "AAPL"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "INVALID_REQUEST");
        assert_eq!(fx.coordinator.active_ticker(), None);
    }

    #[tokio::test]
    async fn test_malformed_bodies_are_400() {
        let fx = fixture();
        let raw = |uri: &str| {
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from("not json"))
                .unwrap()
        };

        let requests = [
            post_json("/get_analysis", json!({"ticker": 5, "expiration": "2024-03-15"})),
            raw("/get_analysis"),
            post_json("/get_expirations", json!({"ticker": 5})),
            raw("/get_expirations"),
        ];

        for request in requests {
            let response = fx.router.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);

            let body = body_json(response).await;
            assert_eq!(body["success"], false);
            assert_eq!(body["error"]["code"], "INVALID_REQUEST");
        }
        assert_eq!(fx.coordinator.active_ticker(), None);
    }

    #[tokio::test]
    async fn test_expirations() {
        let fx = fixture();
        let response = fx
            .router
            .oneshot(post_json("/get_expirations", json!({"ticker": "AAPL"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["expirations"], json!(["2024-03-15", "2024-04-19"]));
    }

    #[tokio::test]
    async fn test_tickers_and_stream_status() {
        let fx = fixture();

        let response = fx.router.clone().oneshot(get("/api/v1/tickers")).await.unwrap();
        assert_eq!(body_json(response).await["tickers"], json!(["AAPL", "MSFT"]));

        let response = fx.router.oneshot(get("/api/v1/stream")).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["phase"], "idle");
        assert_eq!(body["active_ticker"], Value::Null);
        assert_eq!(body["subscribers"], 0);
    }

    #[tokio::test]
    async fn test_health() {
        let response = fixture().router.oneshot(get("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "oiwatch");
    }
}
