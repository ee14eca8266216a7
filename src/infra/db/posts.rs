use async_trait::async_trait;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{PostsRepo, RepoError};
use crate::domain::entities::PostRecord;

use super::PostgresRepositories;
use super::util::map_sqlx_error;

/// Visibility filter shared by the page and count queries: the viewer's own
/// posts plus posts authored by users the viewer follows.
const FEED_VISIBILITY: &str = "p.author_id = $1 \
     OR p.author_id IN (SELECT f.user_id FROM follows f WHERE f.follower_id = $1)";

#[derive(FromRow)]
struct PostRow {
    id: Uuid,
    author_id: Uuid,
    author_username: String,
    like_count: i64,
    title: String,
    body: String,
    created_at: OffsetDateTime,
}

impl PostRow {
    fn into_record(self) -> Result<PostRecord, RepoError> {
        Ok(PostRecord {
            id: self.id,
            author_id: self.author_id,
            author_username: self.author_username,
            like_count: PostgresRepositories::convert_count(self.like_count)?,
            title: self.title,
            body: self.body,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_feed_page(
        &self,
        viewer: Uuid,
        request: PageRequest,
    ) -> Result<Page<PostRecord>, RepoError> {
        let count_sql = format!("SELECT COUNT(*) FROM posts p WHERE {FEED_VISIBILITY}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(viewer)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        let total_rows = Self::convert_count(total)?;

        // Creation timestamps are not unique at sub-second granularity;
        // the id tie-break keeps the order stable.
        let page_sql = format!(
            "SELECT p.id, p.author_id, u.username AS author_username, \
                    p.like_count, p.title, p.body, p.created_at \
             FROM posts p \
             INNER JOIN users u ON u.id = p.author_id \
             WHERE {FEED_VISIBILITY} \
             ORDER BY p.created_at DESC, p.id DESC \
             LIMIT $2 OFFSET $3"
        );
        let rows: Vec<PostRow> = sqlx::query_as(&page_sql)
            .bind(viewer)
            .bind(i64::from(request.size()))
            .bind(request.offset() as i64)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let records = rows
            .into_iter()
            .map(PostRow::into_record)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(records, request, total_rows))
    }

    async fn find_post(&self, post_id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let row: Option<PostRow> = sqlx::query_as(
            "SELECT p.id, p.author_id, u.username AS author_username, \
                    p.like_count, p.title, p.body, p.created_at \
             FROM posts p \
             INNER JOIN users u ON u.id = p.author_id \
             WHERE p.id = $1",
        )
        .bind(post_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(PostRow::into_record).transpose()
    }
}
