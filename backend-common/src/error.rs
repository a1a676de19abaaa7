//! Centralized error types for the library.
//!
//! Every fallible operation in this crate returns [`CommonError`], with
//! built-in retryability classification for cache failures.

use thiserror::Error;

use crate::config::ConfigError;
use crate::mapvalue::MapValueError;

/// Common error type for library operations.
#[derive(Error, Debug)]
pub enum CommonError {
    /// Redis command or connection failed
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// MessagePack encoding error
    #[error("Encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// MessagePack decoding error
    #[error("Decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// Cached value was not valid UTF-8
    #[error("Invalid UTF-8 in cached value: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Key holds a value of a different kind than the operation expects
    #[error("Wrong type for key {key}: expected {expected}")]
    WrongType {
        /// The cache key
        key: String,
        /// The kind the operation expected
        expected: &'static str,
    },

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Metric could not be created or registered
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Statsd client could not be set up
    #[error("Statsd error: {0}")]
    Statsd(#[from] cadence::MetricError),

    /// Socket or other I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Header name or value rejected
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Global logger could not be installed
    #[error("Logger initialization failed: {0}")]
    LoggerInit(String),

    /// Map value failed validation
    #[error(transparent)]
    MapValue(#[from] MapValueError),
}

impl CommonError {
    /// Check if this error is retryable.
    ///
    /// Only transient Redis failures (I/O, dropped connections and timeouts)
    /// are considered retryable.
    ///
    /// # Examples
    ///
    /// ```
    /// use backend_common::CommonError;
    ///
    /// let err = CommonError::InvalidHeader("bad".to_string());
    /// assert!(!err.is_retryable());
    /// ```
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Redis(e) => e.is_io_error() || e.is_connection_dropped() || e.is_timeout(),
            Self::Io(_) => true,
            _ => false,
        }
    }

    /// Create an invalid header error with the given message.
    #[must_use]
    pub fn invalid_header(msg: impl Into<String>) -> Self {
        Self::InvalidHeader(msg.into())
    }

    /// Create a wrong type error for the given key.
    #[must_use]
    pub fn wrong_type(key: impl Into<String>, expected: &'static str) -> Self {
        Self::WrongType {
            key: key.into(),
            expected,
        }
    }
}
