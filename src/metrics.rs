//! Prometheus metrics collection for Crmwatch
//!
//! This module provides metrics instrumentation for tracking:
//! - HTTP request counts and duration by method, route template, and status
//! - Database query duration by operation and outcome
//! - Ingested client telemetry events by type
//!
//! Metrics are exposed via the `/metrics` endpoint in Prometheus text format.

use crate::client::EventKind;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Route label used when no route template matched the request
///
/// Unmatched requests must never contribute their raw path as a label:
/// arbitrary paths would create unbounded label cardinality. Every 404
/// collapses into this single placeholder instead.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Status label for requests whose client disconnected before a response
/// was produced (nginx's 499 convention)
///
/// A dropped connection cancels the request future mid-handler, so no real
/// status code ever exists; the observation is still recorded under this
/// marker.
pub const CLIENT_ABORTED_STATUS: u16 = 499;

/// Shared histogram buckets for request and query durations, in seconds
const DURATION_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 2.0, 5.0];

/// Metrics collector for Crmwatch
///
/// Explicitly constructed and shared via `Arc` in `AppState` so tests can
/// create isolated instances; there is no process-wide registry.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    http_request_duration: HistogramVec,
    http_requests_total: IntCounterVec,
    db_query_duration: HistogramVec,
    telemetry_events_total: IntCounterVec,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// Registers all metrics with a new Prometheus registry. On Linux the
    /// default process metrics (memory, CPU, fds) are registered as well.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Histogram: HTTP request duration
        //
        // Cardinality: methods × route templates × status codes. The route
        // label is always a registered template or UNMATCHED_ROUTE, so the
        // combination count is bounded by the route table.
        let http_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "Duration of HTTP requests in seconds",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
            &["method", "route", "status_code"],
        )?;

        // Counter: total HTTP requests with the same label triple
        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "route", "status_code"],
        )?;

        // Histogram: database query duration
        //
        // The operation label comes from a fixed set of query sites in the
        // CRUD layer, not from user input.
        let db_query_duration = HistogramVec::new(
            HistogramOpts::new(
                "db_query_duration_seconds",
                "Duration of database queries in seconds",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
            &["operation", "success"],
        )?;

        // Counter: client telemetry events accepted by the ingestion route
        //
        // Cardinality: 4 event types = 4 time series (bounded by EventKind)
        let telemetry_events_total = IntCounterVec::new(
            Opts::new(
                "telemetry_events_total",
                "Total number of client telemetry events ingested, by event type",
            ),
            &["type"],
        )?;

        registry.register(Box::new(http_request_duration.clone()))?;
        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(db_query_duration.clone()))?;
        registry.register(Box::new(telemetry_events_total.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry: Arc::new(registry),
            http_request_duration,
            http_requests_total,
            db_query_duration,
            telemetry_events_total,
        })
    }

    /// Record one completed HTTP request
    ///
    /// Observes the duration histogram and increments the request counter
    /// under the same (method, route, status) triple.
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method string (e.g. "GET")
    /// * `route` - matched route template (e.g. "/api/students/{id}") or
    ///   [`UNMATCHED_ROUTE`]; never the raw request path
    /// * `status` - final response status code
    /// * `duration_secs` - elapsed wall-clock time (must be finite, >= 0)
    ///
    /// # Errors
    ///
    /// Returns an error if the metric is not registered or `duration_secs`
    /// is NaN, infinite, or negative. NaN and infinity values corrupt
    /// histogram percentiles, so they are rejected before observation.
    pub fn record_http_request(
        &self,
        method: &str,
        route: &str,
        status: u16,
        duration_secs: f64,
    ) -> Result<(), prometheus::Error> {
        if !duration_secs.is_finite() {
            return Err(prometheus::Error::Msg(format!(
                "Histogram value must be finite (not NaN or Infinity), got: {}",
                duration_secs
            )));
        }
        if duration_secs < 0.0 {
            return Err(prometheus::Error::Msg(format!(
                "Histogram value must be non-negative (duration cannot be negative), got: {}",
                duration_secs
            )));
        }

        let status = status.to_string();
        let labels = [method, route, status.as_str()];

        self.http_request_duration
            .get_metric_with_label_values(&labels)?
            .observe(duration_secs);
        self.http_requests_total
            .get_metric_with_label_values(&labels)?
            .inc();
        Ok(())
    }

    /// Record one database query
    ///
    /// # Arguments
    ///
    /// * `operation` - query site name (e.g. "students_list")
    /// * `success` - whether the query completed without error
    /// * `duration_secs` - elapsed time (must be finite, >= 0)
    pub fn record_db_query(
        &self,
        operation: &str,
        success: bool,
        duration_secs: f64,
    ) -> Result<(), prometheus::Error> {
        if !duration_secs.is_finite() || duration_secs < 0.0 {
            return Err(prometheus::Error::Msg(format!(
                "Histogram value must be finite and non-negative, got: {}",
                duration_secs
            )));
        }

        let success = if success { "true" } else { "false" };
        self.db_query_duration
            .get_metric_with_label_values(&[operation, success])?
            .observe(duration_secs);
        Ok(())
    }

    /// Count one ingested client telemetry event
    ///
    /// Labels are restricted to the four [`EventKind`] variants, keeping
    /// this series bounded regardless of event payloads.
    pub fn record_telemetry_event(&self, kind: EventKind) {
        self.telemetry_events_total
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    /// Get the request count recorded under one (method, route, status) triple
    ///
    /// Reads from an exposition snapshot rather than `with_label_values`,
    /// which would create the label combination as a side effect.
    pub fn http_request_count(&self, method: &str, route: &str, status: u16) -> u64 {
        let needle_method = format!("method=\"{}\"", method);
        let needle_route = format!("route=\"{}\"", route);
        let needle_status = format!("status_code=\"{}\"", status);

        let Ok(output) = self.gather() else {
            return 0;
        };
        output
            .lines()
            .filter(|line| {
                line.starts_with("http_requests_total{")
                    && line.contains(&needle_method)
                    && line.contains(&needle_route)
                    && line.contains(&needle_status)
            })
            .filter_map(|line| line.split_whitespace().last())
            .filter_map(|value| value.parse::<f64>().ok())
            .sum::<f64>() as u64
    }

    /// Number of distinct label combinations on the request counter
    ///
    /// Used by cardinality tests to assert adversarial paths never create
    /// new series.
    pub fn http_request_series_count(&self) -> usize {
        let Ok(output) = self.gather() else {
            return 0;
        };
        output
            .lines()
            .filter(|line| line.starts_with("http_requests_total{"))
            .count()
    }

    /// Content type of the Prometheus text exposition format
    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }

    /// Gather all metrics and encode them in Prometheus text format
    ///
    /// Read-only snapshot; never mutates registry state.
    ///
    /// # Errors
    ///
    /// Returns an error if metric encoding fails or produces invalid UTF-8.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder.encode(&metric_families, &mut buffer).map_err(|e| {
            tracing::error!(
                error = %e,
                metric_family_count = metric_families.len(),
                "Prometheus text encoder failed"
            );
            e
        })?;

        String::from_utf8(buffer).map_err(|e| {
            tracing::error!(
                invalid_byte_index = e.utf8_error().valid_up_to(),
                "Prometheus encoder produced invalid UTF-8"
            );
            prometheus::Error::Msg(format!(
                "Failed to convert metrics to UTF-8: {}. \
                This indicates corrupted metric names or labels.",
                e
            ))
        })
    }
}
