//! Integration tests for the /metrics exposition endpoint
//!
//! Covers the Prometheus text output and the Basic auth gate that protects
//! the endpoint when credentials are configured.

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use crmwatch::{
    config::Config,
    handlers::{AppState, app_router},
};
use std::sync::Arc;
use tower::ServiceExt;

fn open_state() -> AppState {
    let toml = r#"
[server]
host = "127.0.0.1"
port = 3000
"#;
    let config: Config = toml::from_str(toml).expect("should parse config");
    AppState::new(Arc::new(config)).expect("should create state")
}

fn protected_state() -> AppState {
    let toml = r#"
[server]
host = "127.0.0.1"
port = 3000

[observability]
environment = "production"
log_dir = "/tmp"

[metrics_auth]
username = "prometheus"
password = "scrape-me"
"#;
    let config: Config = toml::from_str(toml).expect("should parse config");
    config.validate().expect("production config should validate");
    AppState::new(Arc::new(config)).expect("should create state")
}

fn basic_auth(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

async fn get_metrics(app: axum::Router, authorization: Option<&str>) -> axum::response::Response {
    let mut builder = Request::builder().uri("/metrics");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    app.oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_metrics_open_without_configured_credentials() {
    let state = open_state();
    state
        .metrics()
        .record_http_request("GET", "/health", 200, 0.003)
        .unwrap();
    let app = app_router(state);

    let response = get_metrics(app, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = String::from_utf8(body.to_vec()).unwrap();
    assert!(body.contains("# TYPE http_requests_total counter"));
    assert!(body.contains(
        "http_requests_total{method=\"GET\",route=\"/health\",status_code=\"200\"} 1"
    ));
    assert!(body.contains("# TYPE http_request_duration_seconds histogram"));
}

#[tokio::test]
async fn test_metrics_rejects_missing_credentials() {
    let app = app_router(protected_state());

    let response = get_metrics(app, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let challenge = response
        .headers()
        .get(header::WWW_AUTHENTICATE)
        .expect("401 should carry a Basic challenge")
        .to_str()
        .unwrap();
    assert!(challenge.starts_with("Basic"));
}

#[tokio::test]
async fn test_metrics_rejects_wrong_credentials() {
    let app = app_router(protected_state());

    let auth = basic_auth("prometheus", "wrong-password");
    let response = get_metrics(app, Some(&auth)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_metrics_rejects_malformed_authorization_header() {
    let app = app_router(protected_state());

    let response = get_metrics(app, Some("Basic not!base64")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let app = app_router(protected_state());
    let response = get_metrics(app, Some("Bearer sometoken")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_metrics_accepts_correct_credentials() {
    let state = protected_state();
    state
        .metrics()
        .record_http_request("GET", "/health", 200, 0.001)
        .unwrap();
    let app = app_router(state);

    let auth = basic_auth("prometheus", "scrape-me");
    let response = get_metrics(app, Some(&auth)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = String::from_utf8(body.to_vec()).unwrap();
    assert!(body.contains("http_requests_total"));
}

#[tokio::test]
async fn test_auth_gate_applies_only_to_metrics_route() {
    // Health stays open even when metrics credentials are configured.
    let app = app_router(protected_state());

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
}
