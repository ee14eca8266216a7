//! Key-value cache store abstraction.
//!
//! Production deployments use the Redis-backed implementation in
//! `infra::redis`; tests use [`MemoryStore`].

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
}

impl CacheError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// A TTL-capable key-value store shared by every process of the deployment.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// In-process store with per-entry expiry.
///
/// Used by the test suites; expiry is checked lazily on read, which is
/// enough for a fake that nobody scans.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let expired = {
            let entries = rw_read(&self.entries, SOURCE, "get");
            match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => true,
                None => false,
            }
        };

        if expired {
            rw_write(&self.entries, SOURCE, "get.evict_expired").remove(key);
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let entry = MemoryEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        rw_write(&self.entries, SOURCE, "put").insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        rw_write(&self.entries, SOURCE, "delete").remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn put_get_delete_roundtrip() {
        let store = MemoryStore::new();

        assert!(store.get("k").await.expect("get").is_none());

        store
            .put("k", "v".to_string(), TTL)
            .await
            .expect("put");
        assert_eq!(store.get("k").await.expect("get"), Some("v".to_string()));

        store.delete("k").await.expect("delete");
        assert!(store.get("k").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn expired_entries_read_as_misses() {
        let store = MemoryStore::new();

        store
            .put("k", "v".to_string(), Duration::ZERO)
            .await
            .expect("put");

        assert!(store.get("k").await.expect("get").is_none());
        // The expired entry is evicted on read.
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn overwrite_replaces_value_and_ttl() {
        let store = MemoryStore::new();

        store
            .put("k", "old".to_string(), Duration::ZERO)
            .await
            .expect("put");
        store
            .put("k", "new".to_string(), TTL)
            .await
            .expect("put");

        assert_eq!(store.get("k").await.expect("get"), Some("new".to_string()));
    }

    #[tokio::test]
    async fn store_recovers_from_poisoned_lock() {
        let store = MemoryStore::new();

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store
                .entries
                .write()
                .expect("entries lock should be acquired");
            panic!("poison entries lock");
        }));

        store
            .put("k", "v".to_string(), TTL)
            .await
            .expect("put");
        assert_eq!(store.get("k").await.expect("get"), Some("v".to_string()));
    }
}
