//! Structured logger setup.
//!
//! Installs a global `tracing` subscriber that writes one JSON object per
//! event, with `timestamp`, `level` and `message` at the top level.

use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing::Subscriber;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::CommonError;

/// Logger configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    /// Service name, logged once at startup
    pub service_name: String,
    /// Level name, see [`parse_log_level`]
    pub log_level: String,
    /// Whether to output JSON format
    pub json_output: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            service_name: "backend-service".to_string(),
            log_level: "info".to_string(),
            json_output: true,
        }
    }
}

impl LoggerConfig {
    /// Create config with custom service name.
    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Create config with custom log level.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable JSON output.
    #[must_use]
    pub const fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }

    /// Use human-readable output instead of JSON.
    #[must_use]
    pub const fn with_text_output(mut self) -> Self {
        self.json_output = false;
        self
    }
}

/// Map a level name to a filter.
///
/// Accepts `debug`, `info`, `warning`, `error`, `dpanic`, `panic` and
/// `fatal`; the last three and any unknown name map to `ERROR`.
#[must_use]
pub fn parse_log_level(level: &str) -> LevelFilter {
    match level {
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warning" => LevelFilter::WARN,
        _ => LevelFilter::ERROR,
    }
}

/// JSON logging at `info`.
#[must_use]
pub fn standard_config() -> LoggerConfig {
    LoggerConfig::default()
}

/// JSON logging at the given level.
#[must_use]
pub fn standard_config_with_level(level: impl Into<String>) -> LoggerConfig {
    LoggerConfig::default().with_log_level(level)
}

/// One flattened JSON object per event, written to `writer`.
///
/// `level` is upper-case (`"INFO"`) and `timestamp` is RFC 3339 in UTC.
fn json_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer().json().flatten_event(true).with_writer(writer)
}

/// Install the global subscriber.
///
/// `RUST_LOG`, when set, overrides the configured level.
///
/// # Errors
///
/// Returns [`CommonError::LoggerInit`] if a global subscriber is already set.
pub fn init_logger(config: &LoggerConfig) -> Result<(), CommonError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::default().add_directive(parse_log_level(&config.log_level).into())
    });

    let installed = if config.json_output {
        tracing_subscriber::registry()
            .with(filter)
            .with(json_layer(std::io::stdout))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init()
    };
    installed.map_err(|e| CommonError::LoggerInit(e.to_string()))?;

    info!(service = %config.service_name, level = %config.log_level, "Logger initialized");
    Ok(())
}
