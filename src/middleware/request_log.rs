//! HTTP request logging middleware
//!
//! Emits exactly one structured info record per request, with method, path,
//! status, duration, client address, and user agent. The record comes from
//! a drop guard, so it fires no matter how the request ends: normal and
//! error responses carry their real status (contained panics arrive here as
//! 500s from the catch-panic layer inside this one), and a client
//! disconnect that cancels the request future is recorded with
//! `aborted = true` under the client-abort status.

use crate::metrics::CLIENT_ABORTED_STATUS;
use axum::{extract::Request, http::header, middleware::Next, response::Response};
use std::time::Instant;

/// Client address, preferring the proxy-forwarded header
///
/// The service normally sits behind a reverse proxy, so the socket peer is
/// the proxy; `x-forwarded-for` carries the real client.
fn client_ip(request: &Request) -> &str {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
}

/// One pending log record, emitted on drop
///
/// `status` stays `None` until a response is produced; a guard dropped
/// without one belongs to a cancelled request.
struct RequestRecord {
    method: String,
    path: String,
    ip: String,
    user_agent: String,
    start: Instant,
    status: Option<u16>,
}

impl RequestRecord {
    fn recorded_status(&self) -> u16 {
        self.status.unwrap_or(CLIENT_ABORTED_STATUS)
    }
}

impl Drop for RequestRecord {
    fn drop(&mut self) {
        tracing::info!(
            method = %self.method,
            path = %self.path,
            status = self.recorded_status(),
            aborted = self.status.is_none(),
            duration_ms = self.start.elapsed().as_millis() as u64,
            ip = %self.ip,
            user_agent = %self.user_agent,
            "HTTP request"
        );
    }
}

/// Middleware that logs one record per request
pub async fn http_logger(request: Request, next: Next) -> Response {
    let mut record = RequestRecord {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        ip: client_ip(&request).to_string(),
        user_agent: request
            .headers()
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string(),
        start: Instant::now(),
        status: None,
    };

    let response = next.run(request).await;
    record.status = Some(response.status().as_u16());
    response
}
