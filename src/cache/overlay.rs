//! Optimistic per-(post, user) liked-state overlay.

use std::sync::Arc;

use metrics::counter;
use tracing::warn;
use uuid::Uuid;

use super::config::CacheConfig;
use super::keys::like_overlay_key;
use super::store::{CacheError, CacheStore};

const METRIC_OVERLAY_HIT: &str = "brusio_like_overlay_hit_total";
const METRIC_OVERLAY_MISS: &str = "brusio_like_overlay_miss_total";

/// Marker value stored for a liked pair. The value carries no information
/// beyond presence; it only has to match what every process writes.
const LIKED_MARKER: &str = "liked";

/// Result of a batched overlay lookup.
///
/// Ids in `missing` are unknown to the cache. Silence is not evidence of
/// "not liked"; the caller must resolve them against the durable store.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchLookup {
    pub liked: Vec<Uuid>,
    pub missing: Vec<Uuid>,
}

/// Overlay cache recording which posts a user has liked, written
/// synchronously on the toggle path so the user's next read reflects the
/// toggle before the durable mutation lands.
pub struct LikeOverlay {
    store: Arc<dyn CacheStore>,
    config: CacheConfig,
}

impl LikeOverlay {
    pub fn new(store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self { store, config }
    }

    /// Unconditionally mark the pair as liked. This runs on the write path
    /// and its failure is the caller's to surface.
    pub async fn mark_liked(&self, post_id: Uuid, user_id: Uuid) -> Result<(), CacheError> {
        let key = like_overlay_key(post_id, user_id);
        self.store
            .put(&key, LIKED_MARKER.to_string(), self.config.like_ttl)
            .await
    }

    /// Remove the liked marker for the pair.
    pub async fn unmark(&self, post_id: Uuid, user_id: Uuid) -> Result<(), CacheError> {
        let key = like_overlay_key(post_id, user_id);
        self.store.delete(&key).await
    }

    /// Split `post_ids` into cache-confirmed liked ids and unknown ids.
    ///
    /// Never fails: a store error or timeout degrades the whole batch to
    /// `missing`, which sends the caller to the durable store for every id.
    pub async fn lookup_batch(&self, user_id: Uuid, post_ids: &[Uuid]) -> BatchLookup {
        let mut lookup = BatchLookup::default();

        for &post_id in post_ids {
            let key = like_overlay_key(post_id, user_id);
            match tokio::time::timeout(self.config.op_timeout, self.store.get(&key)).await {
                Ok(Ok(Some(value))) if value == LIKED_MARKER => lookup.liked.push(post_id),
                Ok(Ok(_)) => lookup.missing.push(post_id),
                Ok(Err(err)) => {
                    warn!(
                        target_module = "cache::overlay",
                        %user_id,
                        error = %err,
                        "overlay lookup failed, falling back to durable store for the batch"
                    );
                    return BatchLookup {
                        liked: Vec::new(),
                        missing: post_ids.to_vec(),
                    };
                }
                Err(_) => {
                    warn!(
                        target_module = "cache::overlay",
                        %user_id,
                        "overlay lookup timed out, falling back to durable store for the batch"
                    );
                    return BatchLookup {
                        liked: Vec::new(),
                        missing: post_ids.to_vec(),
                    };
                }
            }
        }

        counter!(METRIC_OVERLAY_HIT).increment(lookup.liked.len() as u64);
        counter!(METRIC_OVERLAY_MISS).increment(lookup.missing.len() as u64);
        lookup
    }

    /// Mark every id in `post_ids` as liked, after a durable-store fallback
    /// resolved them. Ids resolved to not-liked stay uncached and are
    /// re-resolved on the next miss. Best-effort: failures are logged.
    pub async fn fill_batch(&self, user_id: Uuid, post_ids: &[Uuid]) {
        for &post_id in post_ids {
            if let Err(err) = self.mark_liked(post_id, user_id).await {
                warn!(
                    target_module = "cache::overlay",
                    %post_id,
                    %user_id,
                    error = %err,
                    "overlay fill failed, entry stays unknown"
                );
            }
        }
    }
}
