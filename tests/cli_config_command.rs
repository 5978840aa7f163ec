//! Integration tests for CLI config command
//!
//! Tests file I/O operations for the `crmwatch config` subcommand.
//! Verifies template generation, file writing, and error handling.

use crmwatch::cli::generate_config_template;
use crmwatch::config::{Config, Environment};
use std::fs;
use tempfile::TempDir;

/// Helper to create temporary directory for file operations
fn create_temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

#[test]
fn test_generated_template_creates_valid_config_file() {
    let temp_dir = create_temp_dir();
    let config_path = temp_dir.path().join("config.toml");

    let template = generate_config_template();
    fs::write(&config_path, template).expect("Failed to write template");

    let config =
        Config::from_file(&config_path).expect("Generated template should load as valid Config");

    assert_eq!(config.observability.environment, Environment::Development);
    assert_eq!(config.telemetry.flush_interval_seconds, 30);
    assert_eq!(config.telemetry.queue_capacity, 1000);
}

#[test]
fn test_template_file_content_matches_generation() {
    let temp_dir = create_temp_dir();
    let config_path = temp_dir.path().join("config.toml");

    let template = generate_config_template();
    fs::write(&config_path, template).expect("Failed to write template");

    let content = fs::read_to_string(&config_path).expect("Failed to read back");
    assert_eq!(content, template);
}

#[test]
fn test_template_has_all_required_sections() {
    let template = generate_config_template();

    assert!(template.contains("[server]"), "Missing [server]");
    assert!(
        template.contains("[observability]"),
        "Missing [observability]"
    );
    assert!(template.contains("[cors]"), "Missing [cors]");
    assert!(template.contains("[telemetry]"), "Missing [telemetry]");
}

#[test]
fn test_template_includes_documentation() {
    let template = generate_config_template();

    assert!(template.contains("# "), "Template should have comments");
    assert!(template.contains("Crmwatch"), "Template should have header");
    assert!(
        template.contains("METRICS PROTECTION"),
        "Template should document the metrics auth section"
    );
}

#[test]
fn test_write_to_nonexistent_parent_fails() {
    let temp_dir = create_temp_dir();
    let bad_path = temp_dir.path().join("nonexistent").join("config.toml");

    let result = fs::write(&bad_path, "test");
    assert!(result.is_err());
    assert_eq!(result.unwrap_err().kind(), std::io::ErrorKind::NotFound);
}

#[test]
fn test_template_roundtrip_preserves_config() {
    let temp_dir = create_temp_dir();
    let config_path = temp_dir.path().join("config.toml");

    let template = generate_config_template();
    fs::write(&config_path, template).expect("Failed to write template");

    let config = Config::from_file(&config_path).expect("Failed to load config");

    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.observability.log_level, "info");
    assert_eq!(config.observability.slow_request_threshold_ms, 1000);
    assert_eq!(
        config.telemetry.endpoint,
        "http://localhost:3000/api/metrics"
    );
}
