//! Client telemetry event model
//!
//! The tagged union carried by the collector queue and the ingestion route.
//! Serialized with a `type` discriminant so the backend can route events
//! without knowing every payload shape.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Event type discriminant, used for bounded metric labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Error,
    Performance,
    Network,
    Interaction,
}

impl EventKind {
    /// Convert kind to a metric label string
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Error => "error",
            EventKind::Performance => "performance",
            EventKind::Network => "network",
            EventKind::Interaction => "interaction",
        }
    }
}

/// The five browser-reported web vitals sampled by the frontend
///
/// A closed enum: vital names are also bounded on the wire, so a typo'd
/// metric name fails deserialization instead of minting a new series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WebVital {
    /// Cumulative Layout Shift
    Cls,
    /// First Input Delay
    Fid,
    /// Largest Contentful Paint
    Lcp,
    /// First Contentful Paint
    Fcp,
    /// Time To First Byte
    Ttfb,
}

/// One client telemetry event
///
/// Events are immutable once enqueued; `timestamp` is milliseconds since
/// the UNIX epoch, captured at event creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryEvent {
    Error {
        /// Origin of the error ("panic", "uncaught_error", ...)
        error_type: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stack: Option<String>,
        timestamp: u64,
    },
    Performance {
        name: WebVital,
        value: f64,
        timestamp: u64,
    },
    Network {
        url: String,
        duration_ms: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        success: bool,
        timestamp: u64,
    },
    Interaction {
        action: String,
        path: String,
        #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
        data: serde_json::Value,
        timestamp: u64,
    },
}

impl TelemetryEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            TelemetryEvent::Error { .. } => EventKind::Error,
            TelemetryEvent::Performance { .. } => EventKind::Performance,
            TelemetryEvent::Network { .. } => EventKind::Network,
            TelemetryEvent::Interaction { .. } => EventKind::Interaction,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, TelemetryEvent::Error { .. })
    }
}

/// One flush payload: the drained queue plus batch metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryBatch {
    pub metrics: Vec<TelemetryEvent>,
    pub environment: String,
    pub timestamp: u64,
}

/// Milliseconds since the UNIX epoch
///
/// A clock before the epoch yields 0 rather than failing event creation.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
