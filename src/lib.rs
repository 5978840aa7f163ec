//! Crmwatch - Observability pipeline for the CRM backend
//!
//! Provides structured logging, HTTP request metrics with a Prometheus
//! exposition endpoint, a telemetry ingestion route, and a client-side
//! telemetry collector that batches browser-style events to the backend.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod telemetry;
