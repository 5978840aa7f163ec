//! Integration tests for /health endpoint

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use crmwatch::{config::Config, handlers};
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot` and `ready`

fn create_test_app() -> axum::Router {
    let toml = r#"
[server]
host = "127.0.0.1"
port = 3000
"#;
    let config: Config = toml::from_str(toml).expect("should parse config");
    let state = handlers::AppState::new(Arc::new(config)).expect("should create state");
    handlers::app_router(state)
}

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).expect("body should be JSON");
    assert_eq!(json["status"], "OK");
    assert!(json["timestamp"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_unknown_route_returns_json_404() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).expect("body should be JSON");
    assert_eq!(json["error"], "Route not found");
}

#[tokio::test]
async fn test_responses_carry_request_id_header() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let header = response
        .headers()
        .get("x-request-id")
        .expect("response should carry a request ID");
    uuid::Uuid::parse_str(header.to_str().unwrap()).expect("request ID should be a UUID");
}
