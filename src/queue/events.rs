//! Queue payloads for like mutations.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::types::LikeDirection;

/// One pending like/unlike mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeEvent {
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub direction: LikeDirection,
}

/// A flushed buffer of events; the unit published to the queue topic.
/// Events keep their arrival order so opposite toggles inside one batch
/// apply in sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeBatch {
    pub events: Vec<LikeEvent>,
}

impl LikeBatch {
    pub fn new(events: Vec<LikeEvent>) -> Self {
        Self { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
