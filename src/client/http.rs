//! Instrumented HTTP client
//!
//! Observes every outgoing request made through it, recording a network
//! telemetry event with URL, duration, and outcome. Callers opt in by
//! routing requests through this wrapper instead of a patched global, so
//! uninstrumented code paths stay untouched and tests can inject their own
//! collector.

use super::TelemetryCollector;
use serde::Serialize;
use std::time::Instant;

/// `reqwest::Client` wrapper that reports timing to a [`TelemetryCollector`]
///
/// The wrapped call's own result is propagated unchanged: success, failure,
/// status codes, and errors all reach the caller exactly as the underlying
/// client produced them.
#[derive(Clone)]
pub struct InstrumentedClient {
    client: reqwest::Client,
    collector: TelemetryCollector,
}

impl InstrumentedClient {
    pub fn new(collector: TelemetryCollector) -> Self {
        Self::with_client(reqwest::Client::new(), collector)
    }

    /// Wrap an existing client (custom timeouts, TLS config, etc.)
    pub fn with_client(client: reqwest::Client, collector: TelemetryCollector) -> Self {
        Self { client, collector }
    }

    /// Execute a prepared request, recording one network event
    pub async fn execute(
        &self,
        request: reqwest::Request,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let url = request.url().to_string();
        let start = Instant::now();

        let result = self.client.execute(request).await;
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        match &result {
            Ok(response) => {
                let status = response.status();
                self.collector.track_network(
                    &url,
                    duration_ms,
                    Some(status.as_u16()),
                    None,
                    status.is_success(),
                );
            }
            Err(error) => {
                self.collector
                    .track_network(&url, duration_ms, None, Some(error.to_string()), false);
            }
        }

        result
    }

    /// Timed GET
    pub async fn get(&self, url: &str) -> Result<reqwest::Response, reqwest::Error> {
        let request = self.client.get(url).build()?;
        self.execute(request).await
    }

    /// Timed POST with a JSON body
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let request = self.client.post(url).json(body).build()?;
        self.execute(request).await
    }
}
