//! Command-line interface for Crmwatch
//!
//! Provides argument parsing and subcommand handling for the Crmwatch binary.

use clap::{Parser, Subcommand};

/// Observability backend for the student CRM
#[derive(Parser)]
#[command(name = "crmwatch")]
#[command(version)]
#[command(about = "Observability backend for the student CRM")]
#[command(
    long_about = "Crmwatch serves application logs, Prometheus metrics, and client \
    telemetry ingestion for the student CRM, with request logging and metrics \
    middleware applied to every route."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# Crmwatch Configuration
# ======================
#
# This file configures the HTTP server, logging, metrics protection,
# CORS policy, and the client telemetry pipeline.

# ─────────────────────────────────────────────────────────────────────────────
# SERVER CONFIGURATION
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "0.0.0.0"

# Port to listen on
port = 3000

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# "development" for colorized console logs, "production" for JSON logs
# written to both the console and rotating files under log_dir
environment = "development"

# Log level: "trace", "debug", "info", "warn", "error"
log_level = "info"

# Directory for rotating log files (production only)
log_dir = "/var/log/app"

# Rotate a log file once it reaches this many bytes
log_file_max_bytes = 5242880

# Number of rotated files to retain per log
log_file_max_count = 5

# Requests slower than this are logged at warn level
slow_request_threshold_ms = 1000

# ─────────────────────────────────────────────────────────────────────────────
# METRICS PROTECTION
# ─────────────────────────────────────────────────────────────────────────────
#
# Basic auth credentials for GET /metrics. Required when environment is
# "production"; in development the endpoint is open when this section is
# omitted.

# [metrics_auth]
# username = "prometheus"
# password = "change-me"

# ─────────────────────────────────────────────────────────────────────────────
# CORS
# ─────────────────────────────────────────────────────────────────────────────

[cors]
# Origins allowed to call the API (exact matches)
allowed_origins = ["http://localhost:5173"]

# Additionally allow any https origin whose host ends with this suffix
# (must start with a dot)
# allowed_origin_suffix = ".example.app"

# ─────────────────────────────────────────────────────────────────────────────
# CLIENT TELEMETRY
# ─────────────────────────────────────────────────────────────────────────────

[telemetry]
# Endpoint the telemetry collector flushes batches to
endpoint = "http://localhost:3000/api/metrics"

# Seconds between periodic flushes
flush_interval_seconds = 30

# Maximum queued events before the oldest are dropped
queue_capacity = 1000

# Fraction of non-error events to record (errors are always recorded)
sample_rate = 1.0
"#
}
