//! Persistent records and the transient feed projection.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A post as stored by the durable store.
///
/// `like_count` is maintained only by durable like mutations; the cache
/// layer never writes it.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub like_count: u64,
    pub title: String,
    pub body: String,
    pub created_at: OffsetDateTime,
}

/// A post rendered for one viewer's feed.
///
/// `liked_by_viewer` is transient: derived per request from the like
/// overlay and the durable store, never persisted on the post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedPost {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub like_count: u64,
    pub liked_by_viewer: bool,
    pub title: String,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl FeedPost {
    pub fn from_record(record: PostRecord, liked_by_viewer: bool) -> Self {
        Self {
            id: record.id,
            author_id: record.author_id,
            author_username: record.author_username,
            like_count: record.like_count,
            liked_by_viewer,
            title: record.title,
            body: record.body,
            created_at: record.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_post_carries_viewer_flag() {
        let record = PostRecord {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            author_username: "ada".to_string(),
            like_count: 3,
            title: "Hello".to_string(),
            body: "First post".to_string(),
            created_at: OffsetDateTime::now_utc(),
        };

        let rendered = FeedPost::from_record(record.clone(), true);
        assert!(rendered.liked_by_viewer);
        assert_eq!(rendered.id, record.id);
        assert_eq!(rendered.like_count, 3);

        let rendered = FeedPost::from_record(record, false);
        assert!(!rendered.liked_by_viewer);
    }
}
