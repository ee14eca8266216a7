//! Redis-backed implementation of the cache store.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::cache::{CacheError, CacheStore};

use super::error::InfraError;

/// Cache store over a shared Redis connection.
///
/// `ConnectionManager` multiplexes and reconnects internally, so one clone
/// per call is cheap and the store is safe for concurrent use.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, InfraError> {
        let client = redis::Client::open(url).map_err(|err| InfraError::cache(err.to_string()))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|err| InfraError::cache(err.to_string()))?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut connection = self.connection.clone();
        connection
            .get(key)
            .await
            .map_err(CacheError::backend)
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        let seconds = ttl.as_secs().max(1);
        connection
            .set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(CacheError::backend)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        connection
            .del::<_, ()>(key)
            .await
            .map_err(CacheError::backend)
    }
}
