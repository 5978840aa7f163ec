//! Request metrics middleware
//!
//! Times each request and records it into the shared registry under the
//! (method, route template, status) label triple. The route label comes
//! from Axum's `MatchedPath` extension; requests that matched no route all
//! collapse into the fixed [`UNMATCHED_ROUTE`] placeholder so adversarial
//! paths cannot inflate label cardinality.
//!
//! Recording happens in a drop guard, so every request lands exactly one
//! observation no matter how it ends: normal responses and error responses
//! use their real status, and a client disconnect (the request future
//! dropped mid-handler) is recorded under [`CLIENT_ABORTED_STATUS`].

use crate::handlers::AppState;
use crate::metrics::{CLIENT_ABORTED_STATUS, UNMATCHED_ROUTE};
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

/// One pending observation, recorded on drop
///
/// `status` stays `None` until a response is produced; a guard dropped
/// without one belongs to a cancelled request.
struct RequestObservation {
    state: AppState,
    method: String,
    path: String,
    route: String,
    start: Instant,
    status: Option<u16>,
}

impl RequestObservation {
    fn recorded_status(&self) -> u16 {
        self.status.unwrap_or(CLIENT_ABORTED_STATUS)
    }
}

impl Drop for RequestObservation {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let status = self.recorded_status();

        if let Err(error) = self.state.metrics().record_http_request(
            &self.method,
            &self.route,
            status,
            elapsed.as_secs_f64(),
        ) {
            // Metrics are non-critical; the request proceeds regardless.
            tracing::error!(
                %error,
                method = %self.method,
                route = %self.route,
                "Failed to record request metrics"
            );
        }

        if elapsed >= self.state.slow_request_threshold() {
            tracing::warn!(
                method = %self.method,
                path = %self.path,
                duration_ms = elapsed.as_millis() as u64,
                status,
                "Slow request detected"
            );
        }
    }
}

/// Middleware that records duration and count for each request
///
/// Requests slower than the configured threshold additionally emit a warn
/// record with the raw path for operator investigation (the raw path is
/// safe in logs; only metric labels must stay bounded).
pub async fn track_metrics(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let mut observation = RequestObservation {
        state,
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        route: request
            .extensions()
            .get::<MatchedPath>()
            .map(|matched| matched.as_str().to_string())
            .unwrap_or_else(|| UNMATCHED_ROUTE.to_string()),
        start: Instant::now(),
        status: None,
    };

    let response = next.run(request).await;
    observation.status = Some(response.status().as_u16());
    response
}
