//! Basic authentication for the metrics endpoint
//!
//! Applied to `/metrics` when credentials are configured (production mode).
//! Credential comparison runs in constant time over the byte contents, so
//! response timing does not reveal how much of a guess matched.

use crate::handlers::AppState;
use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::Engine;

/// Byte-wise equality without data-dependent early exit
///
/// Only the lengths short-circuit; for equal lengths every byte pair is
/// visited and the mismatches are accumulated, so comparison time does not
/// depend on where the first difference sits.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn credentials_match(decoded: &[u8], username: &str, password: &str) -> bool {
    let Some(split) = decoded.iter().position(|&byte| byte == b':') else {
        return false;
    };
    // Bitwise AND evaluates both comparisons regardless of the first result.
    constant_time_eq(&decoded[..split], username.as_bytes())
        & constant_time_eq(&decoded[split + 1..], password.as_bytes())
}

fn unauthorized() -> Response {
    let mut response = StatusCode::UNAUTHORIZED.into_response();
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"Metrics\""),
    );
    response
}

/// Middleware guarding the metrics endpoint with HTTP Basic auth
///
/// When no credentials are configured (development mode) the request passes
/// through; the router only attaches this layer in production, but the
/// guard keeps the middleware safe to apply unconditionally.
pub async fn metrics_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(auth) = state.config().metrics_auth.clone() else {
        return next.run(request).await;
    };

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Basic "))
        .and_then(|encoded| {
            base64::engine::general_purpose::STANDARD.decode(encoded).ok()
        })
        .map(|decoded| credentials_match(&decoded, auth.username(), auth.password()))
        .unwrap_or(false);

    if authorized {
        next.run(request).await
    } else {
        unauthorized()
    }
}
