//! Environment-driven configuration with validation.
//!
//! Every setting has a default so a service can start with an empty
//! environment; only statsd is opt-in (enabled when `STATSD_HOST` is set).

use std::env;

use thiserror::Error;

use crate::cache::RedisConfig;
use crate::logger::LoggerConfig;
use crate::metrics::{StatsdConfig, DEFAULT_STATSD_PORT};

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid port number
    #[error("Invalid port for {0}: must be between 1 and 65535")]
    InvalidPort(String),

    /// Missing required field
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    /// Environment variable required but not set
    #[error("environment variable {0} must be set in order to retrieve the redis hostname")]
    MissingEnv(String),

    /// Environment variable parse error
    #[error("Failed to parse environment variable {name}: {reason}")]
    ParseError {
        /// Variable name
        name: String,
        /// Parser message
        reason: String,
    },
}

/// Library configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct CommonConfig {
    /// Service name, used for logs and as the default statsd prefix
    pub service_name: String,
    /// Log level name (debug, info, warning, error, ...)
    pub log_level: String,
    /// Whether logs are emitted as JSON
    pub log_json: bool,
    /// Name of the environment variable holding the Redis host
    pub redis_host_var: String,
    /// Redis port
    pub redis_port: u16,
    /// Statsd agent host; statsd is disabled when unset
    pub statsd_host: Option<String>,
    /// Statsd agent port
    pub statsd_port: u16,
    /// Metric prefix for statsd
    pub statsd_prefix: String,
    /// Global statsd tags
    pub statsd_tags: Vec<String>,
}

impl CommonConfig {
    /// Loads configuration from environment variables with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable fails to parse or a value is
    /// out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let service_name =
            env::var("SERVICE_NAME").unwrap_or_else(|_| "backend-service".to_string());

        let config = Self {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json: parse_env("LOG_JSON", true)?,
            redis_host_var: env::var("REDIS_HOST_VAR").unwrap_or_else(|_| "REDIS_HOST".to_string()),
            redis_port: parse_env("REDIS_PORT", 6379)?,
            statsd_host: env::var("STATSD_HOST").ok().filter(|h| !h.is_empty()),
            statsd_port: parse_env("STATSD_PORT", DEFAULT_STATSD_PORT)?,
            statsd_prefix: env::var("STATSD_PREFIX").unwrap_or_else(|_| service_name.clone()),
            statsd_tags: parse_list_env("STATSD_TAGS"),
            service_name,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::MissingRequired("service_name".to_string()));
        }
        if self.redis_port == 0 {
            return Err(ConfigError::InvalidPort("REDIS_PORT".to_string()));
        }
        if self.statsd_port == 0 {
            return Err(ConfigError::InvalidPort("STATSD_PORT".to_string()));
        }
        Ok(())
    }

    /// Creates a [`LoggerConfig`] from this config.
    #[must_use]
    pub fn logger_config(&self) -> LoggerConfig {
        let config = LoggerConfig::default()
            .with_service_name(&self.service_name)
            .with_log_level(&self.log_level);
        if self.log_json {
            config
        } else {
            config.with_text_output()
        }
    }

    /// Creates a [`StatsdConfig`] from this config, if statsd is enabled.
    #[must_use]
    pub fn statsd_config(&self) -> Option<StatsdConfig> {
        self.statsd_host.as_ref().map(|host| {
            StatsdConfig::new(host, self.statsd_port)
                .with_prefix(&self.statsd_prefix)
                .with_tags(self.statsd_tags.clone())
        })
    }

    /// Creates a [`RedisConfig`] from this config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] when the Redis host variable is unset.
    pub fn redis_config(&self) -> Result<RedisConfig, ConfigError> {
        let host = env::var(&self.redis_host_var)
            .map_err(|_| ConfigError::MissingEnv(self.redis_host_var.clone()))?;
        Ok(RedisConfig::default().with_address(format!("{host}:{}", self.redis_port)))
    }
}

/// Parse an environment variable with a default value.
pub(crate) fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val.parse().map_err(|e: T::Err| ConfigError::ParseError {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Parse a comma-separated list environment variable.
fn parse_list_env(name: &str) -> Vec<String> {
    env::var(name)
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
