//! CORS policy
//!
//! Browser requests are allowed with credentials when their `Origin` is on
//! the configured allow-list or ends with the configured hosting-platform
//! suffix (e.g. ".up.railway.app"). Requests without an `Origin` header are
//! not CORS requests and pass through untouched; disallowed origins simply
//! receive no CORS headers, which the browser enforces as a rejection.

use crate::config::CorsConfig;
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};

fn origin_allowed(origin: &str, allowed: &[String], suffix: Option<&str>) -> bool {
    if allowed.iter().any(|entry| entry == origin) {
        return true;
    }

    if let Some(suffix) = suffix {
        // Suffix matching applies to the host only; a query or path cannot
        // smuggle the suffix, and only https origins qualify.
        if let Some(host) = origin.strip_prefix("https://") {
            return !host.contains('/') && host.ends_with(suffix);
        }
    }

    false
}

/// Build the CORS layer from configuration
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let allowed = config.allowed_origins.clone();
    let suffix = config.allowed_origin_suffix.clone();

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin
                .to_str()
                .map(|value| origin_allowed(value, &allowed, suffix.as_deref()))
                .unwrap_or(false)
        }))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ])
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow_list() -> Vec<String> {
        vec![
            "http://localhost:3000".to_string(),
            "https://crm.example.com".to_string(),
        ]
    }

    #[test]
    fn test_exact_origin_allowed() {
        assert!(origin_allowed("http://localhost:3000", &allow_list(), None));
        assert!(origin_allowed("https://crm.example.com", &allow_list(), None));
    }

    #[test]
    fn test_unlisted_origin_rejected() {
        assert!(!origin_allowed("https://evil.example.com", &allow_list(), None));
        assert!(!origin_allowed("http://localhost:3001", &allow_list(), None));
    }

    #[test]
    fn test_platform_suffix_allowed() {
        let suffix = Some(".up.railway.app");
        assert!(origin_allowed(
            "https://va-crm-sandbox.up.railway.app",
            &[],
            suffix
        ));
        assert!(!origin_allowed(
            "https://up.railway.app.evil.com",
            &[],
            suffix
        ));
    }

    #[test]
    fn test_suffix_requires_https() {
        let suffix = Some(".up.railway.app");
        assert!(!origin_allowed(
            "http://va-crm-sandbox.up.railway.app",
            &[],
            suffix
        ));
    }

    #[test]
    fn test_suffix_cannot_be_smuggled_in_path() {
        let suffix = Some(".up.railway.app");
        assert!(!origin_allowed(
            "https://evil.com/x.up.railway.app",
            &[],
            suffix
        ));
    }
}
