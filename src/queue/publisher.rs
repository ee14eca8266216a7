//! Broker-facing publisher seam.

use async_trait::async_trait;
use apalis::prelude::Storage;
use apalis_sql::{Config as ApalisSqlConfig, postgres::PostgresStorage};
use sqlx::PgPool;
use thiserror::Error;

use super::events::LikeBatch;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("queue backend error: {0}")]
    Backend(String),
}

impl PublishError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Publishes flushed batches to the broker topic. The batcher's flusher
/// task is the only caller.
#[async_trait]
pub trait BatchPublisher: Send + Sync {
    async fn publish(&self, batch: LikeBatch) -> Result<(), PublishError>;
}

/// Production publisher backed by the Postgres-based queue storage.
#[derive(Clone)]
pub struct QueueBatchPublisher {
    storage: PostgresStorage<LikeBatch>,
}

impl QueueBatchPublisher {
    pub fn new(pool: PgPool, topic: &str) -> Self {
        let storage =
            PostgresStorage::new_with_config(pool, ApalisSqlConfig::new(topic));
        Self { storage }
    }
}

#[async_trait]
impl BatchPublisher for QueueBatchPublisher {
    async fn publish(&self, batch: LikeBatch) -> Result<(), PublishError> {
        let mut storage = self.storage.clone();
        storage
            .push(batch)
            .await
            .map(|_| ())
            .map_err(PublishError::backend)
    }
}
