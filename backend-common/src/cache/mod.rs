//! Key/value cache clients.
//!
//! [`CacheClient`] provides string and hash-map operations on top of a
//! [`CacheBackend`]. Production services use [`RedisBackend`]; tests and
//! single-process tools can swap in [`MemoryBackend`] without touching call
//! sites.

mod memory;
mod redis_backend;
mod typed;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::mapvalue::JsonMap;
use crate::CommonError;

pub use memory::MemoryBackend;
pub use redis_backend::{standard_client, RedisBackend, RedisConfig};
pub use typed::{standard_cache, TypedCache};

/// Storage operations a cache client needs.
///
/// A zero `ttl` stores the key without expiry.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Raw value of a string key, `None` when missing.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CommonError>;

    /// All fields of a hash key, empty when missing.
    async fn get_map(&self, key: &str) -> Result<HashMap<String, String>, CommonError>;

    /// Store a raw value.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CommonError>;

    /// Write hash fields and the key expiry in one atomic step.
    async fn set_map(
        &self,
        key: &str,
        fields: &HashMap<String, String>,
        ttl: Duration,
    ) -> Result<(), CommonError>;

    /// Remove a key of any kind.
    async fn delete(&self, key: &str) -> Result<(), CommonError>;
}

/// Cache client for string and hash-map values.
#[derive(Debug, Clone)]
pub struct CacheClient<B> {
    backend: B,
}

impl<B: CacheBackend> CacheClient<B> {
    /// Create a client over the given backend.
    #[must_use]
    pub const fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Get the underlying backend.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Value of a single string key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or the value is not UTF-8.
    pub async fn get(&self, key: &str) -> Result<Option<String>, CommonError> {
        match self.backend.get(key).await? {
            Some(raw) => Ok(Some(String::from_utf8(raw)?)),
            None => {
                debug!(key, "Cache miss");
                Ok(None)
            }
        }
    }

    /// All values stored in a hash-map key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn get_map(&self, key: &str) -> Result<HashMap<String, String>, CommonError> {
        self.backend.get_map(key).await
    }

    /// Store a single string key with an expiration.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CommonError> {
        self.backend.set(key, value.as_bytes(), ttl).await
    }

    /// Store key-value pairs in a hash-map key with an expiration.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn set_map(
        &self,
        key: &str,
        fields: &HashMap<String, String>,
        ttl: Duration,
    ) -> Result<(), CommonError> {
        if fields.is_empty() {
            return Ok(());
        }
        self.backend.set_map(key, fields, ttl).await
    }

    /// Store a JSON object in a hash-map key.
    ///
    /// String values are stored verbatim; every other value is stored as its
    /// JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn set_map_values(
        &self,
        key: &str,
        fields: &JsonMap,
        ttl: Duration,
    ) -> Result<(), CommonError> {
        let fields = fields
            .iter()
            .map(|(name, value)| {
                let text = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (name.clone(), text)
            })
            .collect();
        self.set_map(key, &fields, ttl).await
    }

    /// Remove a key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn delete(&self, key: &str) -> Result<(), CommonError> {
        self.backend.delete(key).await
    }
}
