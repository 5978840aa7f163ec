//! Prometheus metrics endpoint
//!
//! Exposes metrics in Prometheus text format for scraping. Guarded by
//! Basic auth in production via `middleware::auth::metrics_auth`.

use crate::handlers::AppState;
use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

/// Metrics handler for Prometheus scraping
///
/// # Response
///
/// - `200 OK` with metrics in Prometheus text format
/// - `500 Internal Server Error` with an empty body if encoding fails;
///   the failure detail goes to the logs, never to the scraper
pub async fn handler(State(state): State<AppState>) -> Response {
    let metrics = state.metrics();
    match metrics.gather() {
        Ok(output) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, metrics.content_type())],
            output,
        )
            .into_response(),
        Err(error) => {
            tracing::error!(
                %error,
                "Failed to gather metrics for Prometheus scraping. \
                This indicates a metrics encoding issue (invalid UTF-8, \
                corrupted labels, or encoder failure)."
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::sync::Arc;

    fn create_test_state() -> AppState {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 8080
"#;
        let config: Config = toml::from_str(toml).expect("should parse test config");
        AppState::new(Arc::new(config)).expect("should create AppState")
    }

    #[tokio::test]
    async fn test_metrics_handler_returns_prometheus_format() {
        let state = create_test_state();
        state
            .metrics()
            .record_http_request("GET", "/health", 200, 0.001)
            .unwrap();

        let response = handler(State(state)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("text/plain")
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("# HELP http_requests_total"));
        assert!(body.contains("# TYPE http_requests_total counter"));
    }

    #[tokio::test]
    async fn test_metrics_handler_with_empty_registry() {
        let state = create_test_state();
        let response = handler(State(state)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
