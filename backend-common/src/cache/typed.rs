//! Typed cache storing serde values as MessagePack.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::redis_backend::{standard_client, RedisBackend, RedisConfig};
use super::CacheBackend;
use crate::CommonError;

/// Cache of typed values encoded as MessagePack.
///
/// Structs are encoded with named fields so other services reading the same
/// keys see maps rather than positional arrays.
#[derive(Debug, Clone)]
pub struct TypedCache<B> {
    backend: B,
}

impl<B: CacheBackend> TypedCache<B> {
    /// Create a typed cache over the given backend.
    #[must_use]
    pub const fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Get the underlying backend.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Decode the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or the stored bytes do not
    /// decode into `T`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CommonError> {
        match self.backend.get(key).await? {
            Some(raw) => Ok(Some(rmp_serde::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    /// Encode and store `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the backend fails.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CommonError> {
        let raw = rmp_serde::to_vec_named(value)?;
        self.backend.set(key, &raw, ttl).await
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

/// Build a [`TypedCache`] on the standard Redis client.
///
/// See [`standard_client`] for how the host is resolved.
///
/// # Errors
///
/// Returns an error if the host variable is unset or the connection fails.
pub async fn standard_cache(host_var: &str) -> Result<TypedCache<RedisBackend>, CommonError> {
    let client = standard_client(host_var)?;
    let backend = RedisBackend::from_client(client, &RedisConfig::default()).await?;
    Ok(TypedCache::new(backend))
}
