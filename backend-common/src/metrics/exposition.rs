//! Prometheus request metrics on a dedicated registry.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use tracing::error;

use super::{status_class, RequestMetricsSink, RequestObservation};
use crate::version::{COMMIT, RUSTC_VERSION};
use crate::CommonError;

const SIZE_BUCKETS: &[f64] = &[100.0, 1_000.0, 10_000.0, 100_000.0, 1_000_000.0, 10_000_000.0];

/// Prometheus sink for request observations.
pub struct PrometheusMetrics {
    registry: Registry,
    /// Requests by method, path and status
    pub request_count: CounterVec,
    /// Request latency by method and path
    pub request_duration: HistogramVec,
    /// Requests by method, path and status class
    pub request_status: CounterVec,
    /// Response body size by method and path
    pub response_size: HistogramVec,
}

impl std::fmt::Debug for PrometheusMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusMetrics").finish_non_exhaustive()
    }
}

impl PrometheusMetrics {
    /// Create metrics on a fresh registry.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric cannot be created or registered.
    pub fn new() -> Result<Self, CommonError> {
        Self::with_registry(Registry::new())
    }

    /// Create metrics on the given registry.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric cannot be created or registered, for
    /// example when the registry already holds metrics with the same names.
    pub fn with_registry(registry: Registry) -> Result<Self, CommonError> {
        let version_info = GaugeVec::new(
            Opts::new("version_info", "The current git commit and rustc version"),
            &["commit", "rustc_version"],
        )?;
        registry.register(Box::new(version_info.clone()))?;
        version_info
            .with_label_values(&[COMMIT, RUSTC_VERSION])
            .set(1.0);

        let request_count = CounterVec::new(
            Opts::new("http_request_count", "The number of HTTP requests"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(request_count.clone()))?;

        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "The latency of HTTP requests in seconds",
            ),
            &["method", "path"],
        )?;
        registry.register(Box::new(request_duration.clone()))?;

        let request_status = CounterVec::new(
            Opts::new("http_request_status_total", "HTTP requests by status class"),
            &["method", "path", "class"],
        )?;
        registry.register(Box::new(request_status.clone()))?;

        let response_size = HistogramVec::new(
            HistogramOpts::new("http_response_size_bytes", "The size of HTTP responses")
                .buckets(SIZE_BUCKETS.to_vec()),
            &["method", "path"],
        )?;
        registry.register(Box::new(response_size.clone()))?;

        Ok(Self {
            registry,
            request_count,
            request_duration,
            request_status,
            response_size,
        })
    }

    /// The registry holding these metrics.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render every metric in the registry in the text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn render(&self) -> Result<String, CommonError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl RequestMetricsSink for PrometheusMetrics {
    fn record(&self, observation: &RequestObservation) {
        let method = observation.method.as_str();
        let path = observation.path.as_str();
        let status = observation.status.to_string();

        self.request_count
            .with_label_values(&[method, path, &status])
            .inc();
        self.request_duration
            .with_label_values(&[method, path])
            .observe(observation.elapsed.as_secs_f64());
        self.request_status
            .with_label_values(&[method, path, status_class(observation.status)])
            .inc();
        #[allow(clippy::cast_precision_loss)]
        let size = observation.body_bytes as f64;
        self.response_size
            .with_label_values(&[method, path])
            .observe(size);
    }
}

/// Serve the registry in the text exposition format.
pub async fn metrics_handler(State(metrics): State<Arc<PrometheusMetrics>>) -> Response {
    match metrics.render() {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
