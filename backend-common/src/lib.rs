//! Shared library for cross-cutting concerns in backend HTTP services.
//!
//! This crate provides centralized implementations for:
//! - Error types with retryability classification
//! - Environment-driven configuration
//! - Auth session claim accessors
//! - JSON map inspection helpers
//! - Redis-backed cache clients with an in-memory fallback backend
//! - Prometheus and DogStatsD request metrics
//! - HTTP middleware: request logging, route instrumentation, response headers
//! - Structured logger setup on `tracing-subscriber`
//! - Liveness/readiness probes and shutdown signal handling

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logger;
pub mod mapvalue;
pub mod metrics;
pub mod middleware;
pub mod version;

pub use auth::{SessionUser, UserInfo};
pub use cache::{
    standard_cache, standard_client, CacheBackend, CacheClient, MemoryBackend, RedisBackend,
    RedisConfig, TypedCache,
};
pub use config::{CommonConfig, ConfigError};
pub use error::CommonError;
pub use lifecycle::Readiness;
pub use logger::{init_logger, parse_log_level, LoggerConfig};
pub use metrics::{
    MetricsEmitter, PrometheusMetrics, RequestMetricsSink, RequestObservation, StatsdConfig,
    StatsdMetrics,
};
pub use middleware::{apply, HttpService, Middleware};
