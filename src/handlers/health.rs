//! Health check endpoint
//!
//! Provides a simple health check for monitoring and load balancers.

use crate::client::now_ms;
use axum::{Json, http::StatusCode};
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
    /// Milliseconds since the UNIX epoch
    pub timestamp: u64,
}

/// Health check handler
///
/// Returns 200 OK with the current timestamp.
pub async fn handler() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "OK",
            timestamp: now_ms(),
        }),
    )
}
