//! Redis cache backend over a managed multiplexed connection.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::AsyncCommands;
use tracing::info;

use super::CacheBackend;
use crate::config::ConfigError;
use crate::CommonError;

/// Environment variable consulted when no host variable name is given.
pub const DEFAULT_REDIS_HOST_VAR: &str = "REDIS_HOST";

/// Port used by [`standard_client`].
pub const STANDARD_REDIS_PORT: u16 = 6379;

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// `host:port` of the Redis server
    pub address: String,
    /// Logical database index
    pub db: i64,
    /// Reconnect attempts before a command fails
    pub max_retries: usize,
    /// Timeout for establishing a connection
    pub connection_timeout: Duration,
    /// Timeout for a single command response
    pub response_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            address: format!("localhost:{STANDARD_REDIS_PORT}"),
            db: 0,
            max_retries: 3,
            connection_timeout: Duration::from_secs(5),
            response_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisConfig {
    /// Create config with custom address.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Create config with custom database index.
    #[must_use]
    pub const fn with_db(mut self, db: i64) -> Self {
        self.db = db;
        self
    }

    /// Create config with custom retry count.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Connection URL for this config.
    #[must_use]
    pub fn url(&self) -> String {
        format!("redis://{}/{}", self.address, self.db)
    }
}

/// Build a Redis client for the host named by an environment variable.
///
/// An empty `host_var` falls back to `REDIS_HOST`. The client targets port
/// 6379, database 0.
///
/// # Errors
///
/// Returns a configuration error naming the variable when it is unset, or a
/// Redis error when the resulting URL is invalid.
pub fn standard_client(host_var: &str) -> Result<redis::Client, CommonError> {
    let host_var = if host_var.is_empty() {
        DEFAULT_REDIS_HOST_VAR
    } else {
        host_var
    };
    let host = env::var(host_var).map_err(|_| ConfigError::MissingEnv(host_var.to_string()))?;
    let config = RedisConfig::default().with_address(format!("{host}:{STANDARD_REDIS_PORT}"));
    Ok(redis::Client::open(config.url())?)
}

/// Cache backend stored in Redis.
///
/// Cloning is cheap; clones share the same managed connection.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl RedisBackend {
    /// Connect using the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the first connection fails.
    pub async fn connect(config: &RedisConfig) -> Result<Self, CommonError> {
        let client = redis::Client::open(config.url())?;
        Self::from_client(client, config).await
    }

    /// Connect an existing client using the retry and timeout settings of `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the first connection fails.
    pub async fn from_client(
        client: redis::Client,
        config: &RedisConfig,
    ) -> Result<Self, CommonError> {
        let manager_config = ConnectionManagerConfig::new()
            .set_number_of_retries(config.max_retries)
            .set_connection_timeout(config.connection_timeout)
            .set_response_timeout(config.response_timeout);
        let conn = ConnectionManager::new_with_config(client, manager_config).await?;
        info!(address = %config.address, db = config.db, "Connected to Redis");
        Ok(Self { conn })
    }
}

#[allow(clippy::cast_possible_truncation)]
fn ttl_millis(ttl: Duration) -> u64 {
    // Round up so sub-millisecond TTLs do not become "no expiry".
    ttl.as_millis().max(1) as u64
}

/// `SET` for a zero TTL, `PSETEX` otherwise.
fn set_command(key: &str, value: &[u8], ttl: Duration) -> redis::Cmd {
    if ttl.is_zero() {
        redis::Cmd::set(key, value)
    } else {
        redis::Cmd::pset_ex(key, value, ttl_millis(ttl))
    }
}

/// `MULTI`, `HSET`, then `PERSIST` or `PEXPIRE`, then `EXEC`.
///
/// A zero TTL clears any expiry instead of sending `PEXPIRE 0`, which would
/// delete the key.
fn set_map_pipeline(
    key: &str,
    fields: &HashMap<String, String>,
    ttl: Duration,
) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic().cmd("HSET").arg(key);
    for (name, value) in fields {
        pipe.arg(name).arg(value);
    }
    pipe.ignore();
    if ttl.is_zero() {
        pipe.cmd("PERSIST").arg(key).ignore();
    } else {
        pipe.cmd("PEXPIRE").arg(key).arg(ttl_millis(ttl)).ignore();
    }
    pipe
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CommonError> {
        let mut conn = self.conn.clone();
        Ok(conn.get::<_, Option<Vec<u8>>>(key).await?)
    }

    async fn get_map(&self, key: &str) -> Result<HashMap<String, String>, CommonError> {
        let mut conn = self.conn.clone();
        Ok(conn.hgetall::<_, HashMap<String, String>>(key).await?)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CommonError> {
        let mut conn = self.conn.clone();
        let () = set_command(key, value, ttl).query_async(&mut conn).await?;
        Ok(())
    }

    async fn set_map(
        &self,
        key: &str,
        fields: &HashMap<String, String>,
        ttl: Duration,
    ) -> Result<(), CommonError> {
        let mut conn = self.conn.clone();
        let () = set_map_pipeline(key, fields, ttl).query_async(&mut conn).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CommonError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RedisConfig::default();
        assert_eq!(config.address, "localhost:6379");
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.url(), "redis://localhost:6379/0");
    }

    #[test]
    fn test_config_builder() {
        let config = RedisConfig::default()
            .with_address("cache.internal:6380")
            .with_db(2)
            .with_max_retries(5);
        assert_eq!(config.url(), "redis://cache.internal:6380/2");
        assert_eq!(config.max_retries, 5);
    }

    #[test]
    fn test_ttl_millis_rounds_up() {
        assert_eq!(ttl_millis(Duration::from_micros(10)), 1);
        assert_eq!(ttl_millis(Duration::from_secs(2)), 2000);
    }

    fn packed(commands: &[redis::Cmd]) -> Vec<u8> {
        commands.iter().flat_map(redis::Cmd::get_packed_command).collect()
    }

    #[test]
    fn test_set_command_zero_ttl_has_no_expiry() {
        let cmd = set_command("session", &b"blob"[..], Duration::ZERO);
        let expected = redis::cmd("SET").arg("session").arg(&b"blob"[..]).get_packed_command();
        assert_eq!(cmd.get_packed_command(), expected);
    }

    #[test]
    fn test_set_command_uses_psetex() {
        let cmd = set_command("session", &b"blob"[..], Duration::from_secs(3));
        let expected = redis::cmd("PSETEX")
            .arg("session")
            .arg(3000u64)
            .arg(&b"blob"[..])
            .get_packed_command();
        assert_eq!(cmd.get_packed_command(), expected);
    }

    #[test]
    fn test_set_map_pipeline_zero_ttl_persists() {
        let fields = HashMap::from([("name".to_string(), "ada".to_string())]);
        let pipe = set_map_pipeline("user:1", &fields, Duration::ZERO);

        let expected = packed(&[
            redis::cmd("MULTI"),
            redis::cmd("HSET").arg("user:1").arg("name").arg("ada").clone(),
            redis::cmd("PERSIST").arg("user:1").clone(),
            redis::cmd("EXEC"),
        ]);
        assert_eq!(pipe.get_packed_pipeline(), expected);
    }

    #[test]
    fn test_set_map_pipeline_sets_expiry_in_millis() {
        let fields = HashMap::from([("name".to_string(), "ada".to_string())]);
        let pipe = set_map_pipeline("user:1", &fields, Duration::from_millis(1500));

        let expected = packed(&[
            redis::cmd("MULTI"),
            redis::cmd("HSET").arg("user:1").arg("name").arg("ada").clone(),
            redis::cmd("PEXPIRE").arg("user:1").arg(1500u64).clone(),
            redis::cmd("EXEC"),
        ]);
        assert_eq!(pipe.get_packed_pipeline(), expected);
    }

    #[test]
    fn test_standard_client_missing_env() {
        let err = standard_client("BACKEND_COMMON_TEST_UNSET_REDIS").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: environment variable BACKEND_COMMON_TEST_UNSET_REDIS must be set in order to retrieve the redis hostname"
        );
    }

    #[test]
    fn test_standard_client_reads_named_var() {
        env::set_var("BACKEND_COMMON_TEST_REDIS_HOST", "cache.internal");
        let client = standard_client("BACKEND_COMMON_TEST_REDIS_HOST").unwrap();
        let info = client.get_connection_info();
        assert_eq!(info.redis.db, 0);
        assert!(matches!(
            &info.addr,
            redis::ConnectionAddr::Tcp(host, 6379) if host == "cache.internal"
        ));
    }
}
