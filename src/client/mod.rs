//! Client-side telemetry collector
//!
//! Batches error, performance, network, and interaction events and delivers
//! them to the backend ingestion endpoint. Unlike the browser original this
//! is an explicitly constructed component: tests build isolated instances,
//! and the flush task has a defined spawn/shutdown lifecycle.
//!
//! Delivery is best-effort at-least-once. A failed batch is re-queued at
//! the head of a bounded queue (oldest events dropped over capacity) and
//! retried with capped exponential backoff. Error events request an
//! immediate flush instead of waiting for the timer.

mod event;
mod http;

pub use event::{EventKind, TelemetryBatch, TelemetryEvent, WebVital, now_ms};
pub use http::InstrumentedClient;

use crate::config::Config;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Collector tuning knobs
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Ingestion endpoint batches are POSTed to
    pub endpoint: String,
    /// Environment string included in every batch
    pub environment: String,
    pub flush_interval: Duration,
    /// Queue capacity; oldest events are dropped when exceeded
    pub queue_capacity: usize,
    /// Fraction of non-error events kept; errors are always kept
    pub sample_rate: f64,
    /// First retry delay after a failed flush
    pub backoff_base: Duration,
    /// Ceiling for the retry delay
    pub backoff_cap: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/api/metrics".to_string(),
            environment: "development".to_string(),
            flush_interval: Duration::from_secs(30),
            queue_capacity: 1000,
            sample_rate: 1.0,
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(60),
        }
    }
}

impl CollectorConfig {
    /// Derive collector settings from the application configuration
    pub fn from_app_config(config: &Config) -> Self {
        Self {
            endpoint: config.telemetry.endpoint.clone(),
            environment: config.observability.environment.as_str().to_string(),
            flush_interval: Duration::from_secs(config.telemetry.flush_interval_seconds),
            queue_capacity: config.telemetry.queue_capacity,
            sample_rate: config.telemetry.sample_rate,
            ..Self::default()
        }
    }
}

struct CollectorInner {
    config: CollectorConfig,
    queue: Mutex<VecDeque<TelemetryEvent>>,
    dropped: AtomicU64,
    flush_now: Notify,
    started: AtomicBool,
}

impl CollectorInner {
    fn lock_queue(&self) -> MutexGuard<'_, VecDeque<TelemetryEvent>> {
        // A panicked enqueue cannot leave the queue in a bad state, so
        // poisoning is recoverable.
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Telemetry collector
///
/// Cheap to clone; all clones share the same queue and flush task.
#[derive(Clone)]
pub struct TelemetryCollector {
    inner: Arc<CollectorInner>,
}

/// Handle to the running flush task
///
/// Dropping the handle leaves the task running for the process lifetime;
/// calling [`CollectorHandle::shutdown`] performs a final flush and joins it.
pub struct CollectorHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl CollectorHandle {
    /// Stop the flush timer, attempt one final flush, and wait for the task
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }
}

impl TelemetryCollector {
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            inner: Arc::new(CollectorInner {
                config,
                queue: Mutex::new(VecDeque::new()),
                dropped: AtomicU64::new(0),
                flush_now: Notify::new(),
                started: AtomicBool::new(false),
            }),
        }
    }

    /// Record an error event and request an immediate flush
    ///
    /// Errors bypass both the sample rate and the flush timer: at least one
    /// delivery attempt happens promptly, best-effort.
    pub fn track_error(&self, error_type: &str, message: &str, stack: Option<String>) {
        self.enqueue(TelemetryEvent::Error {
            error_type: error_type.to_string(),
            message: message.to_string(),
            stack,
            timestamp: now_ms(),
        });
    }

    /// Record a web vital sample
    pub fn track_performance(&self, name: WebVital, value: f64) {
        self.enqueue(TelemetryEvent::Performance {
            name,
            value,
            timestamp: now_ms(),
        });
    }

    /// Record one observed network call
    pub fn track_network(
        &self,
        url: &str,
        duration_ms: f64,
        status: Option<u16>,
        error: Option<String>,
        success: bool,
    ) {
        self.enqueue(TelemetryEvent::Network {
            url: url.to_string(),
            duration_ms,
            status,
            error,
            success,
            timestamp: now_ms(),
        });
    }

    /// Record a user interaction (e.g. a page view on navigation)
    pub fn track_user_interaction(&self, action: &str, path: &str, data: serde_json::Value) {
        self.enqueue(TelemetryEvent::Interaction {
            action: action.to_string(),
            path: path.to_string(),
            data,
            timestamp: now_ms(),
        });
    }

    /// Install a panic hook that records panics as error events
    ///
    /// Chains the previously installed hook, so default panic output (or an
    /// earlier custom hook) still runs.
    pub fn install_panic_hook(&self) {
        let collector = self.clone();
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let message = info
                .payload()
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| info.payload().downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panic with non-string payload".to_string());
            let location = info.location().map(|l| l.to_string());
            collector.track_error("panic", &message, location);
            previous(info);
        }));
    }

    fn enqueue(&self, event: TelemetryEvent) {
        let is_error = event.is_error();

        if !is_error
            && self.inner.config.sample_rate < 1.0
            && rand::random::<f64>() >= self.inner.config.sample_rate
        {
            return;
        }

        {
            let mut queue = self.inner.lock_queue();
            if queue.len() >= self.inner.config.queue_capacity {
                queue.pop_front();
                self.inner.dropped.fetch_add(1, Ordering::Relaxed);
            }
            queue.push_back(event);
        }

        if is_error {
            self.inner.flush_now.notify_one();
        }
    }

    /// Number of events currently queued
    pub fn queue_len(&self) -> usize {
        self.inner.lock_queue().len()
    }

    /// Number of events dropped because the queue was over capacity
    pub fn dropped_count(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Start the periodic flush task
    ///
    /// Idempotent: the first call spawns the task and returns its handle;
    /// every subsequent call is a no-op returning `None`, so accidental
    /// double-initialization cannot create a second timer.
    pub fn spawn(&self) -> Option<CollectorHandle> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return None;
        }

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let inner = Arc::clone(&self.inner);

        let task = tokio::spawn(async move {
            let client = reqwest::Client::new();
            let mut interval = tokio::time::interval(inner.config.flush_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; consume it so the first
            // flush happens one full interval after spawn.
            interval.tick().await;

            let mut consecutive_failures: u32 = 0;
            let mut next_attempt = Instant::now();

            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = inner.flush_now.notified() => {}
                    _ = shutdown_rx.changed() => {
                        if let Err(error) = flush_once(&inner, &client).await {
                            tracing::warn!(%error, "Final telemetry flush failed on shutdown");
                        }
                        break;
                    }
                }

                if Instant::now() < next_attempt {
                    continue;
                }

                match flush_once(&inner, &client).await {
                    Ok(sent) => {
                        consecutive_failures = 0;
                        next_attempt = Instant::now();
                        if sent > 0 {
                            tracing::debug!(events = sent, "Telemetry batch delivered");
                        }
                    }
                    Err(error) => {
                        consecutive_failures = consecutive_failures.saturating_add(1);
                        let delay = backoff_delay(
                            consecutive_failures,
                            inner.config.backoff_base,
                            inner.config.backoff_cap,
                        );
                        next_attempt = Instant::now() + delay;
                        tracing::warn!(
                            %error,
                            consecutive_failures,
                            retry_in_ms = delay.as_millis() as u64,
                            "Failed to deliver telemetry batch; events re-queued"
                        );
                    }
                }
            }
        });

        Some(CollectorHandle { shutdown_tx, task })
    }
}

/// Drain the queue and POST it as one batch
///
/// The queue is swapped for an empty one before the network call, so events
/// arriving mid-flight join the fresh queue and are neither lost nor sent
/// twice. On failure the batch is pushed back to the head, preserving
/// insertion order, and capacity is re-enforced by dropping oldest.
async fn flush_once(
    inner: &CollectorInner,
    client: &reqwest::Client,
) -> Result<usize, reqwest::Error> {
    let batch: Vec<TelemetryEvent> = {
        let mut queue = inner.lock_queue();
        queue.drain(..).collect()
    };
    if batch.is_empty() {
        return Ok(0);
    }

    let payload = TelemetryBatch {
        metrics: batch,
        environment: inner.config.environment.clone(),
        timestamp: now_ms(),
    };

    let result = client
        .post(&inner.config.endpoint)
        .json(&payload)
        .send()
        .await
        .and_then(|response| response.error_for_status());

    match result {
        Ok(_) => Ok(payload.metrics.len()),
        Err(error) => {
            let mut queue = inner.lock_queue();
            for event in payload.metrics.into_iter().rev() {
                queue.push_front(event);
            }
            while queue.len() > inner.config.queue_capacity {
                queue.pop_front();
                inner.dropped.fetch_add(1, Ordering::Relaxed);
            }
            Err(error)
        }
    }
}

/// Retry delay after `failures` consecutive failed flushes
///
/// Doubles from `base`, clamped to `cap`.
fn backoff_delay(failures: u32, base: Duration, cap: Duration) -> Duration {
    let exponent = failures.saturating_sub(1).min(16);
    base.saturating_mul(1u32 << exponent).min(cap)
}
