//! Configuration management for Crmwatch
//!
//! Parses TOML configuration files and provides typed access to settings.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// Credentials guarding the /metrics endpoint (required in production)
    #[serde(default)]
    pub metrics_auth: Option<MetricsAuthConfig>,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Deployment environment
///
/// Drives the log format (human vs JSON), file sinks, and whether the
/// metrics endpoint requires authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!(
                "Unknown environment '{}'. Valid values: development, production",
                other
            )),
        }
    }
}

/// Observability configuration (logging and request timing)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for production file sinks (error.log, combined.log)
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    /// Byte cap per log file before rotation
    #[serde(default = "default_log_file_max_bytes")]
    pub log_file_max_bytes: u64,
    /// Retained rotated files per sink (oldest dropped)
    #[serde(default = "default_log_file_max_count")]
    pub log_file_max_count: usize,
    /// Requests slower than this emit a warn record
    #[serde(default = "default_slow_request_threshold_ms")]
    pub slow_request_threshold_ms: u64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            log_file_max_bytes: default_log_file_max_bytes(),
            log_file_max_count: default_log_file_max_count(),
            slow_request_threshold_ms: default_slow_request_threshold_ms(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "/var/log/app".to_string()
}

fn default_log_file_max_bytes() -> u64 {
    5 * 1024 * 1024
}

fn default_log_file_max_count() -> usize {
    5
}

fn default_slow_request_threshold_ms() -> u64 {
    1000
}

/// Basic auth credentials for the /metrics endpoint
///
/// Fields are private; access goes through getters. Debug output redacts
/// the password so credentials cannot leak through error or trace logs.
#[derive(Clone, Deserialize, Serialize)]
pub struct MetricsAuthConfig {
    username: String,
    password: String,
}

impl MetricsAuthConfig {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for MetricsAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsAuthConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// CORS policy configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CorsConfig {
    /// Exact origins allowed with credentials
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Hosting-platform suffix (e.g. ".up.railway.app") allowed with credentials
    #[serde(default)]
    pub allowed_origin_suffix: Option<String>,
}

/// Client telemetry collector defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// Ingestion endpoint the collector POSTs batches to
    #[serde(default = "default_telemetry_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_flush_interval_seconds")]
    pub flush_interval_seconds: u64,
    /// Bounded queue capacity; oldest events dropped on overflow
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Fraction of non-error events kept (errors are always kept)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            endpoint: default_telemetry_endpoint(),
            flush_interval_seconds: default_flush_interval_seconds(),
            queue_capacity: default_queue_capacity(),
            sample_rate: default_sample_rate(),
        }
    }
}

fn default_telemetry_endpoint() -> String {
    "http://localhost:8080/api/metrics".to_string()
}

fn default_flush_interval_seconds() -> u64 {
    30
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_sample_rate() -> f64 {
    1.0
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::error::AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        // Phase 1: Read file (preserves io::Error context)
        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            crate::error::AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        // Phase 2: Parse TOML (preserves toml::de::Error context)
        let config: Self = toml::from_str(&content).map_err(|source| {
            crate::error::AppError::ConfigParseFailed {
                path: path_display.clone(),
                source: Box::new(source),
            }
        })?;

        // Phase 3: Validate parsed config (provides contextual reason)
        config
            .validate()
            .map_err(|reason| crate::error::AppError::ConfigValidationFailed {
                path: path_display,
                reason,
            })?;

        Ok(config)
    }

    /// Validate cross-field invariants that serde cannot express
    pub fn validate(&self) -> Result<(), String> {
        if self.observability.environment.is_production() {
            match &self.metrics_auth {
                None => {
                    return Err(
                        "Production mode requires [metrics_auth] credentials for the /metrics \
                         endpoint. Add a [metrics_auth] section with username and password."
                            .to_string(),
                    );
                }
                Some(auth) if auth.username.is_empty() || auth.password.is_empty() => {
                    return Err(
                        "[metrics_auth] username and password must be non-empty".to_string()
                    );
                }
                Some(_) => {}
            }
        }

        if self.observability.log_file_max_bytes == 0 {
            return Err("observability.log_file_max_bytes must be greater than 0".to_string());
        }

        if self.observability.log_file_max_count == 0 {
            return Err("observability.log_file_max_count must be greater than 0".to_string());
        }

        if self.telemetry.queue_capacity == 0 {
            return Err("telemetry.queue_capacity must be greater than 0".to_string());
        }

        if !(0.0..=1.0).contains(&self.telemetry.sample_rate) {
            return Err(format!(
                "telemetry.sample_rate must be between 0.0 and 1.0, got {}",
                self.telemetry.sample_rate
            ));
        }

        if let Some(suffix) = &self.cors.allowed_origin_suffix
            && !suffix.starts_with('.')
        {
            return Err(format!(
                "cors.allowed_origin_suffix must start with '.', got '{}' \
                 (a bare suffix would match unintended domains)",
                suffix
            ));
        }

        Ok(())
    }
}
