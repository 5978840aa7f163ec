//! Telemetry ingestion endpoint
//!
//! Accepts batches POSTed by the client telemetry collector, counts each
//! event in the metrics registry, and surfaces client-side errors in the
//! server logs. The response body is empty; the sender only checks for 2xx.

use crate::client::{TelemetryBatch, TelemetryEvent};
use crate::handlers::AppState;
use axum::{Json, extract::State, http::StatusCode};

/// Ingestion handler for `POST /api/metrics`
pub async fn handler(
    State(state): State<AppState>,
    Json(batch): Json<TelemetryBatch>,
) -> StatusCode {
    for event in &batch.metrics {
        state.metrics().record_telemetry_event(event.kind());

        match event {
            TelemetryEvent::Error {
                error_type,
                message,
                ..
            } => {
                tracing::warn!(
                    environment = %batch.environment,
                    error_type = %error_type,
                    message = %message,
                    "Client error reported"
                );
            }
            other => {
                tracing::debug!(
                    environment = %batch.environment,
                    kind = other.kind().as_str(),
                    "Client telemetry event"
                );
            }
        }
    }

    StatusCode::ACCEPTED
}
