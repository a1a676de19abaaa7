//! DogStatsD request metrics over `cadence`.

use std::net::UdpSocket;
use std::panic::RefUnwindSafe;

use cadence::prelude::*;
use cadence::{MetricSink, QueuingMetricSink, StatsdClient, UdpMetricSink};
use tracing::{info, warn};

use super::{status_class, RequestMetricsSink, RequestObservation};
use crate::version::COMMIT;
use crate::CommonError;

/// Default DogStatsD agent port.
pub const DEFAULT_STATSD_PORT: u16 = 8125;

/// Statsd agent location and global metric settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsdConfig {
    /// Agent host
    pub host: String,
    /// Agent port
    pub port: u16,
    /// Prefix prepended to every metric name
    pub prefix: String,
    /// Tags added to every metric, as `key:value` or bare values
    pub tags: Vec<String>,
}

impl StatsdConfig {
    /// Create config for the agent at `host:port`.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            prefix: String::new(),
            tags: Vec::new(),
        }
    }

    /// Create config with a metric name prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Create config with global tags.
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// Statsd sink for request observations.
pub struct StatsdMetrics {
    client: StatsdClient,
}

impl std::fmt::Debug for StatsdMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsdMetrics").finish_non_exhaustive()
    }
}

impl StatsdMetrics {
    /// Connect to the agent over UDP and emit `server_start`.
    ///
    /// Metrics are queued and sent from a background thread so recording
    /// never blocks a request.
    ///
    /// # Errors
    ///
    /// Returns an error if the local socket cannot be bound or the agent
    /// address does not resolve.
    pub fn new(config: &StatsdConfig) -> Result<Self, CommonError> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;
        let udp = UdpMetricSink::from((config.host.as_str(), config.port), socket)?;
        let metrics = Self::from_sink(&config.prefix, &config.tags, QueuingMetricSink::from(udp));
        info!(host = %config.host, port = config.port, "Statsd client initialized");
        Ok(metrics)
    }

    /// Build on any `cadence` sink and emit `server_start`.
    pub fn from_sink<T>(prefix: &str, tags: &[String], sink: T) -> Self
    where
        T: MetricSink + Send + Sync + RefUnwindSafe + 'static,
    {
        let mut builder = StatsdClient::builder(prefix, sink)
            .with_error_handler(|e| warn!(error = %e, "Failed to send statsd metric"));
        for tag in tags {
            builder = match tag.split_once(':') {
                Some((key, value)) => builder.with_tag(key, value),
                None => builder.with_tag_value(tag),
            };
        }

        let metrics = Self {
            client: builder.build(),
        };
        if let Err(e) = metrics.client.incr("server_start") {
            warn!(error = %e, "Failed to emit server_start");
        }
        metrics
    }

    /// The underlying client, for emitting service-specific metrics.
    #[must_use]
    pub const fn client(&self) -> &StatsdClient {
        &self.client
    }
}

impl RequestMetricsSink for StatsdMetrics {
    fn record(&self, observation: &RequestObservation) {
        let method = observation.method.to_lowercase();
        let path = observation.path.as_str();
        let status = observation.status.to_string();

        self.client
            .incr_with_tags("http_request_count")
            .with_tag("sha", COMMIT)
            .with_tag("method", &method)
            .with_tag("path", path)
            .with_tag("status", &status)
            .send();

        let micros = u64::try_from(observation.elapsed.as_micros()).unwrap_or(u64::MAX);
        self.client
            .histogram_with_tags("http_request_duration", micros)
            .with_tag("sha", COMMIT)
            .with_tag("method", &method)
            .with_tag("path", path)
            .send();

        let status_key = format!("http_request_status_{}", status_class(observation.status));
        self.client
            .incr_with_tags(&status_key)
            .with_tag("sha", COMMIT)
            .with_tag("method", &method)
            .with_tag("path", path)
            .with_tag("status", &status)
            .send();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use test_utils::RecordingSink;

    fn observation() -> RequestObservation {
        RequestObservation {
            method: "POST".to_string(),
            path: "/orders".to_string(),
            status: 201,
            elapsed: Duration::from_micros(1500),
            body_bytes: 0,
        }
    }

    #[test]
    fn test_config_builder() {
        let config = StatsdConfig::new("agent", DEFAULT_STATSD_PORT)
            .with_prefix("orders")
            .with_tags(vec!["env:prod".to_string()]);
        assert_eq!(config.port, 8125);
        assert_eq!(config.prefix, "orders");
        assert_eq!(config.tags, vec!["env:prod"]);
    }

    #[test]
    fn test_emits_server_start() {
        let sink = RecordingSink::new();
        let _metrics = StatsdMetrics::from_sink("svc", &[], sink.clone());
        assert_eq!(sink.lines(), vec!["svc.server_start:1|c"]);
    }

    #[test]
    fn test_record_emits_three_metrics() {
        let sink = RecordingSink::new();
        let metrics = StatsdMetrics::from_sink("svc", &[], sink.clone());
        sink.clear();

        metrics.record(&observation());
        let lines = sink.lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            format!("svc.http_request_count:1|c|#sha:{COMMIT},method:post,path:/orders,status:201")
        );
        assert_eq!(
            lines[1],
            format!("svc.http_request_duration:1500|h|#sha:{COMMIT},method:post,path:/orders")
        );
        assert!(lines[2].starts_with("svc.http_request_status_successful:1|c|#"));
        assert!(lines[2].ends_with("status:201"));
    }

    #[test]
    fn test_global_tags() {
        let sink = RecordingSink::new();
        let tags = vec!["env:prod".to_string(), "canary".to_string()];
        let _metrics = StatsdMetrics::from_sink("", &tags, sink.clone());
        assert_eq!(sink.lines(), vec!["server_start:1|c|#env:prod,canary"]);
    }

    #[test]
    fn test_new_over_udp() {
        let config = StatsdConfig::new("127.0.0.1", DEFAULT_STATSD_PORT);
        assert!(StatsdMetrics::new(&config).is_ok());
    }
}
