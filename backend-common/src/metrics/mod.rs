//! Request metrics fanned out to one or more telemetry backends.
//!
//! Middleware builds a [`RequestObservation`] when a response completes and
//! hands it to a [`MetricsEmitter`], which forwards it to every registered
//! [`RequestMetricsSink`].

mod exposition;
mod statsd;

use std::sync::Arc;
use std::time::Duration;

pub use exposition::{metrics_handler, PrometheusMetrics};
pub use statsd::{StatsdConfig, StatsdMetrics, DEFAULT_STATSD_PORT};

/// One completed HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestObservation {
    /// Request method, as sent by the client
    pub method: String,
    /// Route template or raw path
    pub path: String,
    /// Response status code
    pub status: u16,
    /// Time from request start to the end of the response body
    pub elapsed: Duration,
    /// Response body bytes written
    pub body_bytes: u64,
}

/// Map a status code to its class label.
///
/// # Examples
///
/// ```
/// use backend_common::metrics::status_class;
///
/// assert_eq!(status_class(404), "client_error");
/// assert_eq!(status_class(999), "unknown_error");
/// ```
#[must_use]
pub const fn status_class(status: u16) -> &'static str {
    match status / 100 {
        5 => "server_error",
        4 => "client_error",
        3 => "redirection",
        2 => "successful",
        1 => "informational",
        _ => "unknown_error",
    }
}

/// A telemetry backend that accepts request observations.
pub trait RequestMetricsSink: Send + Sync {
    /// Record one completed request.
    fn record(&self, observation: &RequestObservation);
}

/// Fans observations out to every registered sink.
#[derive(Clone, Default)]
pub struct MetricsEmitter {
    sinks: Vec<Arc<dyn RequestMetricsSink>>,
}

impl std::fmt::Debug for MetricsEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsEmitter")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl MetricsEmitter {
    /// Create an emitter with no sinks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn RequestMetricsSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Whether no sinks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Forward an observation to every sink, in registration order.
    pub fn record(&self, observation: &RequestObservation) {
        for sink in &self.sinks {
            sink.record(observation);
        }
    }
}
