//! HTTP middleware for the observability pipeline

pub mod auth;
pub mod cors;
pub mod metrics;
pub mod request_id;
pub mod request_log;
