//! Feed read path: cache-aside page lookup with fallback to assembly.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{LikesRepo, PostsRepo, RepoError};
use crate::cache::{FeedPageCache, LikeOverlay};
use crate::domain::entities::FeedPost;

/// A rendered, viewer-specific feed page.
pub type FeedPage = Page<FeedPost>;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Serves paginated feeds for one viewer.
///
/// Reads hit the feed page cache first; on a miss the page is assembled
/// from the durable store with liked-state merged in from the like overlay
/// (overlay misses fall back to the durable like rows), then written back
/// to the page cache. Cache failures degrade latency, never availability:
/// only durable-store failures surface to the caller.
#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    likes: Arc<dyn LikesRepo>,
    page_cache: Arc<FeedPageCache>,
    overlay: Arc<LikeOverlay>,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        likes: Arc<dyn LikesRepo>,
        page_cache: Arc<FeedPageCache>,
        overlay: Arc<LikeOverlay>,
    ) -> Self {
        Self {
            posts,
            likes,
            page_cache,
            overlay,
        }
    }

    /// Fetch one page of the viewer's feed.
    pub async fn get_feed(
        &self,
        viewer: Uuid,
        request: PageRequest,
    ) -> Result<FeedPage, FeedError> {
        if let Some(page) = self.page_cache.get(viewer, request).await {
            debug!(
                target_module = "application::feed",
                %viewer,
                page = request.page(),
                "feed served from page cache"
            );
            return Ok(page);
        }

        let page = self.assemble(viewer, request).await?;
        self.page_cache.put(viewer, request, &page).await;
        Ok(page)
    }

    /// Build the page from the durable store and the like overlay.
    ///
    /// An empty page is a valid, cacheable result.
    async fn assemble(&self, viewer: Uuid, request: PageRequest) -> Result<FeedPage, FeedError> {
        let posts = self.posts.list_feed_page(viewer, request).await?;

        let post_ids: Vec<Uuid> = posts.rows.iter().map(|post| post.id).collect();
        let lookup = self.overlay.lookup_batch(viewer, &post_ids).await;

        let mut liked: HashSet<Uuid> = lookup.liked.into_iter().collect();
        if !lookup.missing.is_empty() {
            let resolved = self.likes.liked_post_ids(viewer, &lookup.missing).await?;
            self.overlay.fill_batch(viewer, &resolved).await;
            liked.extend(resolved);
        }

        Ok(posts.map(|record| {
            let liked_by_viewer = liked.contains(&record.id);
            FeedPost::from_record(record, liked_by_viewer)
        }))
    }
}
