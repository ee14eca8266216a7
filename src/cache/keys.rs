//! Cache key conventions.
//!
//! Keys are plain strings so that every process sharing the cache derives
//! the same key for the same logical entry.

use uuid::Uuid;

/// Key of a rendered feed page for one viewer.
pub fn feed_page_key(viewer: Uuid, page: u32, size: u32) -> String {
    format!("feed:user:{viewer}:page:{page}:size:{size}")
}

/// Key of a liked marker for one (post, user) pair.
pub fn like_overlay_key(post_id: Uuid, user_id: Uuid) -> String {
    format!("like:{post_id}:{user_id}")
}
