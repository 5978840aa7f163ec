//! HTTP request handlers for the Crmwatch API

use crate::config::Config;
use crate::metrics::Metrics;
use axum::{
    Json, Router,
    http::StatusCode,
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post},
};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;

pub mod health;
pub mod ingest;
pub mod metrics;

/// Application state shared across all handlers
///
/// Contains configuration and the metrics registry. All fields are Arc'd
/// for cheap cloning across Axum handlers; every instance owns its own
/// registry so tests stay isolated.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Create a new AppState from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if metrics registration fails.
    pub fn new(config: Arc<Config>) -> Result<Self, prometheus::Error> {
        Ok(Self {
            config,
            metrics: Arc::new(Metrics::new()?),
        })
    }

    /// Get reference to the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get reference to the metrics registry
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Threshold above which a request is logged as slow
    pub fn slow_request_threshold(&self) -> Duration {
        Duration::from_millis(self.config.observability.slow_request_threshold_ms)
    }
}

/// JSON 404 for unmatched routes
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": "Route not found"})),
    )
}

/// Converts contained panics into 500 responses
///
/// Production responds with a generic message; development includes the
/// panic payload to speed up debugging.
#[derive(Clone, Copy)]
struct PanicResponder {
    production: bool,
}

impl tower_http::catch_panic::ResponseForPanic for PanicResponder {
    type ResponseBody = axum::body::Body;

    fn response_for_panic(
        &mut self,
        err: Box<dyn Any + Send + 'static>,
    ) -> axum::http::Response<Self::ResponseBody> {
        let detail = err
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| err.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic with non-string payload".to_string());

        tracing::error!(panic = %detail, "Handler panicked");

        let message = if self.production {
            "Internal server error".to_string()
        } else {
            detail
        };

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "error": "Something went wrong!",
                "message": message,
            })),
        )
            .into_response()
    }
}

/// Build the application router with the full middleware stack
///
/// Layer order (outermost first): CORS, request ID, request logging,
/// request metrics, panic containment, then the routes. Panic containment
/// sits innermost so a contained panic still flows out through the logging
/// and metrics middleware as an ordinary 500 response.
pub fn app_router(state: AppState) -> Router {
    let production = state.config().observability.environment.is_production();

    let metrics_routes = Router::new()
        .route("/metrics", get(metrics::handler))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::metrics_auth,
        ));

    Router::new()
        .route("/health", get(health::handler))
        .route("/api/metrics", post(ingest::handler))
        .merge(metrics_routes)
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(PanicResponder { production }))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::metrics::track_metrics,
        ))
        .layer(axum_middleware::from_fn(
            crate::middleware::request_log::http_logger,
        ))
        .layer(axum_middleware::from_fn(
            crate::middleware::request_id::request_id_middleware,
        ))
        .layer(crate::middleware::cors::cors_layer(&state.config().cors))
        .with_state(state)
}
