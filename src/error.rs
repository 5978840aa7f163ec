//! Error types for Crmwatch
//!
//! Configuration loading is the one fallible startup path; each phase keeps
//! its underlying cause so `main` can print an actionable message.

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;
