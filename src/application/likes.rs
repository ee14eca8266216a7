//! Like toggle write path.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::cache::{CacheError, LikeOverlay};
use crate::domain::types::LikeDirection;
use crate::queue::{LikeEvent, LikeEventBatcher};

#[derive(Debug, Error)]
pub enum LikeError {
    /// The synchronous overlay write failed. This is the only way a toggle
    /// can fail; downstream queue or consumer trouble never reaches the
    /// caller.
    #[error("like overlay write failed: {0}")]
    Cache(#[from] CacheError),
}

/// Accepts like toggles: the overlay write is synchronous so the user's
/// next read reflects the toggle, while the durable mutation rides the
/// batcher and lands later.
#[derive(Clone)]
pub struct LikeService {
    overlay: Arc<LikeOverlay>,
    batcher: Arc<LikeEventBatcher>,
}

impl LikeService {
    pub fn new(overlay: Arc<LikeOverlay>, batcher: Arc<LikeEventBatcher>) -> Self {
        Self { overlay, batcher }
    }

    /// Toggle liked state for (viewer, post). Returns as soon as the cache
    /// reflects the toggle and the event is buffered.
    pub async fn toggle_like(
        &self,
        viewer: Uuid,
        post_id: Uuid,
        direction: LikeDirection,
    ) -> Result<(), LikeError> {
        match direction {
            LikeDirection::Like => self.overlay.mark_liked(post_id, viewer).await?,
            LikeDirection::Unlike => self.overlay.unmark(post_id, viewer).await?,
        }

        self.batcher.add(LikeEvent {
            post_id,
            user_id: viewer,
            direction,
        });

        debug!(
            target_module = "application::likes",
            %viewer,
            %post_id,
            direction = direction.as_str(),
            "like toggle accepted"
        );

        Ok(())
    }
}
