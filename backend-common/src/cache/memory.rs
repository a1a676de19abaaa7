//! In-process cache backend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CacheBackend;
use crate::CommonError;

enum Stored {
    Value(Vec<u8>),
    Map(HashMap<String, String>),
}

/// Local cache entry.
struct Entry {
    stored: Stored,
    expires_at: Option<Instant>,
    inserted_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

fn expiry(ttl: Duration) -> Option<Instant> {
    (!ttl.is_zero()).then(|| Instant::now() + ttl)
}

/// Cache backend held in process memory.
///
/// Mirrors Redis semantics for the operations [`CacheBackend`] exposes,
/// including type errors when string and hash operations target the same key.
#[derive(Clone)]
pub struct MemoryBackend {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    capacity: usize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::with_capacity(1000)
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl MemoryBackend {
    /// Create a backend holding at most `capacity` entries.
    ///
    /// Once a write goes over capacity, expired entries are dropped first,
    /// then the oldest writes until the backend is a tenth below capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether no entries are stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn evict(&self, entries: &mut HashMap<String, Entry>) {
        if entries.len() <= self.capacity {
            return;
        }
        let now = Instant::now();
        entries.retain(|_, entry| entry.is_live(now));

        // Trim to a tenth below capacity.
        let target = self.capacity - self.capacity / 10;
        let excess = entries.len().saturating_sub(target);
        if excess == 0 {
            return;
        }
        let mut by_age: Vec<(Instant, String)> = entries
            .iter()
            .map(|(key, entry)| (entry.inserted_at, key.clone()))
            .collect();
        by_age.sort_unstable();
        for (_, key) in by_age.into_iter().take(excess) {
            entries.remove(&key);
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CommonError> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.is_live(Instant::now()) => match &entry.stored {
                Stored::Value(value) => Ok(Some(value.clone())),
                Stored::Map(_) => Err(CommonError::wrong_type(key, "string")),
            },
            _ => Ok(None),
        }
    }

    async fn get_map(&self, key: &str) -> Result<HashMap<String, String>, CommonError> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.is_live(Instant::now()) => match &entry.stored {
                Stored::Map(fields) => Ok(fields.clone()),
                Stored::Value(_) => Err(CommonError::wrong_type(key, "hash")),
            },
            _ => Ok(HashMap::new()),
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CommonError> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry {
                stored: Stored::Value(value.to_vec()),
                expires_at: expiry(ttl),
                inserted_at: Instant::now(),
            },
        );
        self.evict(&mut entries);
        Ok(())
    }

    async fn set_map(
        &self,
        key: &str,
        fields: &HashMap<String, String>,
        ttl: Duration,
    ) -> Result<(), CommonError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();

        let mut merged = match entries.remove(key) {
            Some(entry) if entry.is_live(now) => match entry.stored {
                Stored::Map(existing) => existing,
                stored @ Stored::Value(_) => {
                    let restored = Entry {
                        stored,
                        expires_at: entry.expires_at,
                        inserted_at: entry.inserted_at,
                    };
                    entries.insert(key.to_string(), restored);
                    return Err(CommonError::wrong_type(key, "hash"));
                }
            },
            _ => HashMap::new(),
        };
        merged.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));

        entries.insert(
            key.to_string(),
            Entry {
                stored: Stored::Map(merged),
                expires_at: expiry(ttl),
                inserted_at: now,
            },
        );
        self.evict(&mut entries);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CommonError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ttl_expiration() {
        let backend = MemoryBackend::default();
        backend
            .set("key", b"value", Duration::from_millis(1))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(backend.get("key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_zero_ttl_never_expires() {
        let backend = MemoryBackend::default();
        backend.set("key", b"value", Duration::ZERO).await.unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(backend.get("key").await.unwrap(), Some(b"value".to_vec()));
    }

    #[tokio::test]
    async fn test_set_map_merges_fields() {
        let backend = MemoryBackend::default();
        let first = HashMap::from([("a".to_string(), "1".to_string())]);
        let second = HashMap::from([("b".to_string(), "2".to_string())]);

        backend.set_map("h", &first, Duration::ZERO).await.unwrap();
        backend.set_map("h", &second, Duration::ZERO).await.unwrap();

        let stored = backend.get_map("h").await.unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn test_wrong_type() {
        let backend = MemoryBackend::default();
        backend.set("s", b"value", Duration::ZERO).await.unwrap();
        let fields = HashMap::from([("a".to_string(), "1".to_string())]);
        backend.set_map("h", &fields, Duration::ZERO).await.unwrap();

        assert!(matches!(
            backend.get("h").await,
            Err(CommonError::WrongType { expected: "string", .. })
        ));
        assert!(matches!(
            backend.get_map("s").await,
            Err(CommonError::WrongType { expected: "hash", .. })
        ));
        assert!(backend.set_map("s", &fields, Duration::ZERO).await.is_err());
        // The string value survives the rejected write.
        assert_eq!(backend.get("s").await.unwrap(), Some(b"value".to_vec()));
    }

    #[tokio::test]
    async fn test_eviction_over_capacity() {
        let backend = MemoryBackend::with_capacity(2);
        backend.set("a", b"1", Duration::from_millis(1)).await.unwrap();
        backend.set("b", b"2", Duration::from_millis(1)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;

        backend.set("c", b"3", Duration::ZERO).await.unwrap();
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_eviction_drops_oldest_when_nothing_expired() {
        let backend = MemoryBackend::with_capacity(2);
        backend.set("a", b"1", Duration::ZERO).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        backend.set("b", b"2", Duration::ZERO).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        backend.set("c", b"3", Duration::ZERO).await.unwrap();

        assert_eq!(backend.len().await, 2);
        assert_eq!(backend.get("a").await.unwrap(), None);
        assert_eq!(backend.get("b").await.unwrap(), Some(b"2".to_vec()));
        assert_eq!(backend.get("c").await.unwrap(), Some(b"3".to_vec()));
    }

    #[tokio::test]
    async fn test_eviction_trims_below_capacity() {
        let backend = MemoryBackend::with_capacity(10);
        for i in 0..11 {
            backend.set(&format!("k{i}"), b"v", Duration::ZERO).await.unwrap();
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        assert_eq!(backend.len().await, 9);
        assert_eq!(backend.get("k0").await.unwrap(), None);
        assert_eq!(backend.get("k1").await.unwrap(), None);
        assert_eq!(backend.get("k10").await.unwrap(), Some(b"v".to_vec()));
    }
}
