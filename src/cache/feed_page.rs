//! Cache-aside store for rendered feed pages.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::domain::entities::FeedPost;

use super::config::CacheConfig;
use super::keys::feed_page_key;
use super::store::CacheStore;

const METRIC_FEED_PAGE_HIT: &str = "brusio_feed_page_hit_total";
const METRIC_FEED_PAGE_MISS: &str = "brusio_feed_page_miss_total";

/// Pass-through store of fully rendered feed pages keyed by
/// (viewer, page, size).
///
/// No merging logic lives here. A miss signals the caller to fall back to
/// feed assembly; a failed put is logged and swallowed, since caching is an
/// optimization, not a correctness requirement.
pub struct FeedPageCache {
    store: Arc<dyn CacheStore>,
    config: CacheConfig,
}

impl FeedPageCache {
    pub fn new(store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self { store, config }
    }

    /// Look up a cached page. Store errors, decode errors, and timeouts
    /// all read as misses.
    pub async fn get(&self, viewer: Uuid, request: PageRequest) -> Option<Page<FeedPost>> {
        let key = feed_page_key(viewer, request.page(), request.size());

        let value = match tokio::time::timeout(self.config.op_timeout, self.store.get(&key)).await
        {
            Ok(Ok(value)) => value,
            Ok(Err(err)) => {
                warn!(
                    target_module = "cache::feed_page",
                    key,
                    error = %err,
                    "feed page lookup failed, treating as miss"
                );
                None
            }
            Err(_) => {
                warn!(
                    target_module = "cache::feed_page",
                    key, "feed page lookup timed out, treating as miss"
                );
                None
            }
        };

        let Some(raw) = value else {
            counter!(METRIC_FEED_PAGE_MISS).increment(1);
            return None;
        };

        match serde_json::from_str(&raw) {
            Ok(page) => {
                counter!(METRIC_FEED_PAGE_HIT).increment(1);
                Some(page)
            }
            Err(err) => {
                warn!(
                    target_module = "cache::feed_page",
                    key,
                    error = %err,
                    "cached feed page failed to decode, treating as miss"
                );
                counter!(METRIC_FEED_PAGE_MISS).increment(1);
                None
            }
        }
    }

    /// Store an assembled page. Best-effort: failures are logged, never
    /// propagated.
    pub async fn put(&self, viewer: Uuid, request: PageRequest, page: &Page<FeedPost>) {
        let key = feed_page_key(viewer, request.page(), request.size());

        let encoded = match serde_json::to_string(page) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(
                    target_module = "cache::feed_page",
                    key,
                    error = %err,
                    "feed page failed to encode, skipping cache write"
                );
                return;
            }
        };

        match tokio::time::timeout(
            self.config.op_timeout,
            self.store.put(&key, encoded, self.config.feed_ttl),
        )
        .await
        {
            Ok(Ok(())) => debug!(target_module = "cache::feed_page", key, "feed page cached"),
            Ok(Err(err)) => warn!(
                target_module = "cache::feed_page",
                key,
                error = %err,
                "feed page cache write failed"
            ),
            Err(_) => warn!(
                target_module = "cache::feed_page",
                key, "feed page cache write timed out"
            ),
        }
    }
}
