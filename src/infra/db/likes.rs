use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{LikesRepo, RepoError};

use super::PostgresRepositories;
use super::util::map_sqlx_error;

#[async_trait]
impl LikesRepo for PostgresRepositories {
    async fn like_exists(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, RepoError> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM likes WHERE post_id = $1 AND user_id = $2)",
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn liked_post_ids(
        &self,
        user_id: Uuid,
        post_ids: &[Uuid],
    ) -> Result<Vec<Uuid>, RepoError> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_scalar("SELECT post_id FROM likes WHERE user_id = $1 AND post_id = ANY($2)")
            .bind(user_id)
            .bind(post_ids)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn create_like(&self, post_id: Uuid, user_id: Uuid) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("INSERT INTO likes (post_id, user_id, created_at) VALUES ($1, $2, now())")
            .bind(post_id)
            .bind(user_id)
            .execute(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?;

        sqlx::query("UPDATE posts SET like_count = like_count + 1 WHERE id = $1")
            .bind(post_id)
            .execute(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn delete_like(&self, post_id: Uuid, user_id: Uuid) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let deleted: Option<Uuid> = sqlx::query_scalar(
            "DELETE FROM likes WHERE post_id = $1 AND user_id = $2 RETURNING post_id",
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(tx.as_mut())
        .await
        .map_err(map_sqlx_error)?;

        // Decrement only when a row actually went away, so a redundant
        // unlike cannot drive the counter below the row count.
        if deleted.is_some() {
            sqlx::query("UPDATE posts SET like_count = like_count - 1 WHERE id = $1")
                .bind(post_id)
                .execute(tx.as_mut())
                .await
                .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)
    }
}
