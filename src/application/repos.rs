//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::domain::entities::PostRecord;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Read access to posts visible in a viewer's feed.
#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// One page of posts visible to `viewer` (own posts plus posts authored
    /// by followed users), newest first, with totals computed over the same
    /// filter.
    async fn list_feed_page(
        &self,
        viewer: Uuid,
        request: PageRequest,
    ) -> Result<Page<PostRecord>, RepoError>;

    async fn find_post(&self, post_id: Uuid) -> Result<Option<PostRecord>, RepoError>;
}

/// Durable like rows and the post like counter they maintain.
#[async_trait]
pub trait LikesRepo: Send + Sync {
    async fn like_exists(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, RepoError>;

    /// Of `post_ids`, the subset the user has a durable like row for,
    /// resolved in one batched query.
    async fn liked_post_ids(
        &self,
        user_id: Uuid,
        post_ids: &[Uuid],
    ) -> Result<Vec<Uuid>, RepoError>;

    /// Insert the like row and increment the post's like counter in one
    /// transaction.
    async fn create_like(&self, post_id: Uuid, user_id: Uuid) -> Result<(), RepoError>;

    /// Delete the like row and decrement the post's like counter in one
    /// transaction. Deleting an absent row is a no-op and leaves the
    /// counter untouched.
    async fn delete_like(&self, post_id: Uuid, user_id: Uuid) -> Result<(), RepoError>;
}
