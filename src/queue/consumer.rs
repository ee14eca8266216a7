//! Durable consumer for like event batches.
//!
//! The consumer is the only writer of like rows, which keeps durable state
//! serializable per (post, user) even though the overlay cache may have
//! raced ahead.

use std::sync::Arc;

use apalis::prelude::{Data, Error as ApalisError};
use metrics::counter;
use tracing::{debug, error, info};

use crate::application::repos::{LikesRepo, PostsRepo, RepoError};
use crate::domain::types::LikeDirection;

use super::events::{LikeBatch, LikeEvent};

const SOURCE: &str = "queue::consumer";

const METRIC_EVENTS_APPLIED: &str = "brusio_like_events_applied_total";
const METRIC_EVENTS_DISCARDED: &str = "brusio_like_events_discarded_total";

/// Repository access handed to the consumer worker.
#[derive(Clone)]
pub struct ConsumerContext {
    pub posts: Arc<dyn PostsRepo>,
    pub likes: Arc<dyn LikesRepo>,
}

/// What applying one event did to durable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// The like row was created or deleted and the counter adjusted.
    Applied,
    /// The post no longer exists; the event is stale, not an error.
    PostMissing,
    /// A like event for an already-liked pair; duplicate delivery or a
    /// duplicate buffered toggle.
    AlreadyLiked,
    /// An unlike event for a pair with no like row.
    NotLiked,
}

/// Worker entry point: apply every event of the batch in order.
///
/// Per-event failures are logged and the event dropped; the batch itself
/// always acks so the broker does not resurrect half-applied batches.
pub async fn process_like_batch(
    batch: LikeBatch,
    context: Data<ConsumerContext>,
) -> Result<(), ApalisError> {
    let ctx = &*context;
    let count = batch.len();

    for event in &batch.events {
        match apply_event(ctx, event).await {
            Ok(EventOutcome::Applied) => {
                counter!(METRIC_EVENTS_APPLIED).increment(1);
                debug!(
                    target_module = SOURCE,
                    post_id = %event.post_id,
                    user_id = %event.user_id,
                    direction = event.direction.as_str(),
                    "like event applied"
                );
            }
            Ok(outcome) => {
                counter!(METRIC_EVENTS_DISCARDED).increment(1);
                debug!(
                    target_module = SOURCE,
                    post_id = %event.post_id,
                    user_id = %event.user_id,
                    direction = event.direction.as_str(),
                    outcome = ?outcome,
                    "like event discarded"
                );
            }
            Err(err) => {
                counter!(METRIC_EVENTS_DISCARDED).increment(1);
                error!(
                    target_module = SOURCE,
                    post_id = %event.post_id,
                    user_id = %event.user_id,
                    direction = event.direction.as_str(),
                    error = %err,
                    "like event failed, dropping it"
                );
            }
        }
    }

    info!(target_module = SOURCE, count, "like batch processed");
    Ok(())
}

/// Apply one event idempotently.
///
/// Check-then-act against the like row tolerates duplicate and
/// out-of-order delivery: re-applying an event leaves durable state
/// unchanged.
pub async fn apply_event(
    ctx: &ConsumerContext,
    event: &LikeEvent,
) -> Result<EventOutcome, RepoError> {
    let Some(_post) = ctx.posts.find_post(event.post_id).await? else {
        // Post deleted after the toggle; the event is stale.
        return Ok(EventOutcome::PostMissing);
    };

    let exists = ctx.likes.like_exists(event.post_id, event.user_id).await?;

    match event.direction {
        LikeDirection::Like if exists => Ok(EventOutcome::AlreadyLiked),
        LikeDirection::Like => {
            match ctx.likes.create_like(event.post_id, event.user_id).await {
                Ok(()) => Ok(EventOutcome::Applied),
                // A concurrent redelivery won the insert race; same end state.
                Err(RepoError::Duplicate { .. }) => Ok(EventOutcome::AlreadyLiked),
                Err(err) => Err(err),
            }
        }
        LikeDirection::Unlike if !exists => Ok(EventOutcome::NotLiked),
        LikeDirection::Unlike => {
            ctx.likes.delete_like(event.post_id, event.user_id).await?;
            Ok(EventOutcome::Applied)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use time::OffsetDateTime;
    use uuid::Uuid;

    use crate::application::pagination::{Page, PageRequest};
    use crate::domain::entities::PostRecord;

    use super::*;

    /// In-memory durable store: posts with counters plus like rows.
    #[derive(Default)]
    struct FakeStore {
        posts: Mutex<HashMap<Uuid, PostRecord>>,
        likes: Mutex<HashSet<(Uuid, Uuid)>>,
    }

    impl FakeStore {
        fn insert_post(&self, post_id: Uuid) {
            let post = PostRecord {
                id: post_id,
                author_id: Uuid::new_v4(),
                author_username: "ada".to_string(),
                like_count: 0,
                title: "Hello".to_string(),
                body: "First post".to_string(),
                created_at: OffsetDateTime::now_utc(),
            };
            self.posts.lock().expect("posts lock").insert(post_id, post);
        }

        fn like_count(&self, post_id: Uuid) -> u64 {
            self.posts.lock().expect("posts lock")[&post_id].like_count
        }
    }

    #[async_trait]
    impl PostsRepo for FakeStore {
        async fn list_feed_page(
            &self,
            _viewer: Uuid,
            request: PageRequest,
        ) -> Result<Page<PostRecord>, RepoError> {
            Ok(Page::empty(request))
        }

        async fn find_post(&self, post_id: Uuid) -> Result<Option<PostRecord>, RepoError> {
            Ok(self.posts.lock().expect("posts lock").get(&post_id).cloned())
        }
    }

    #[async_trait]
    impl LikesRepo for FakeStore {
        async fn like_exists(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, RepoError> {
            Ok(self
                .likes
                .lock()
                .expect("likes lock")
                .contains(&(post_id, user_id)))
        }

        async fn liked_post_ids(
            &self,
            user_id: Uuid,
            post_ids: &[Uuid],
        ) -> Result<Vec<Uuid>, RepoError> {
            let likes = self.likes.lock().expect("likes lock");
            Ok(post_ids
                .iter()
                .copied()
                .filter(|post_id| likes.contains(&(*post_id, user_id)))
                .collect())
        }

        async fn create_like(&self, post_id: Uuid, user_id: Uuid) -> Result<(), RepoError> {
            let mut likes = self.likes.lock().expect("likes lock");
            if !likes.insert((post_id, user_id)) {
                return Err(RepoError::Duplicate {
                    constraint: "likes_pkey".to_string(),
                });
            }
            let mut posts = self.posts.lock().expect("posts lock");
            if let Some(post) = posts.get_mut(&post_id) {
                post.like_count += 1;
            }
            Ok(())
        }

        async fn delete_like(&self, post_id: Uuid, user_id: Uuid) -> Result<(), RepoError> {
            let mut likes = self.likes.lock().expect("likes lock");
            if likes.remove(&(post_id, user_id)) {
                let mut posts = self.posts.lock().expect("posts lock");
                if let Some(post) = posts.get_mut(&post_id) {
                    post.like_count -= 1;
                }
            }
            Ok(())
        }
    }

    fn context() -> (ConsumerContext, Arc<FakeStore>) {
        let store = Arc::new(FakeStore::default());
        (
            ConsumerContext {
                posts: store.clone(),
                likes: store.clone(),
            },
            store,
        )
    }

    fn like_event(post_id: Uuid, user_id: Uuid) -> LikeEvent {
        LikeEvent {
            post_id,
            user_id,
            direction: LikeDirection::Like,
        }
    }

    fn unlike_event(post_id: Uuid, user_id: Uuid) -> LikeEvent {
        LikeEvent {
            post_id,
            user_id,
            direction: LikeDirection::Unlike,
        }
    }

    #[tokio::test]
    async fn like_creates_row_and_increments_counter() {
        let (ctx, store) = context();
        let post_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        store.insert_post(post_id);

        let outcome = apply_event(&ctx, &like_event(post_id, user_id))
            .await
            .expect("apply");

        assert_eq!(outcome, EventOutcome::Applied);
        assert_eq!(store.like_count(post_id), 1);
    }

    #[tokio::test]
    async fn reapplying_a_like_changes_nothing() {
        let (ctx, store) = context();
        let post_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        store.insert_post(post_id);

        let event = like_event(post_id, user_id);
        apply_event(&ctx, &event).await.expect("first apply");
        let outcome = apply_event(&ctx, &event).await.expect("second apply");

        assert_eq!(outcome, EventOutcome::AlreadyLiked);
        assert_eq!(store.like_count(post_id), 1);
    }

    #[tokio::test]
    async fn reapplying_an_unlike_changes_nothing() {
        let (ctx, store) = context();
        let post_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        store.insert_post(post_id);

        apply_event(&ctx, &like_event(post_id, user_id))
            .await
            .expect("seed like");

        let event = unlike_event(post_id, user_id);
        apply_event(&ctx, &event).await.expect("first apply");
        let outcome = apply_event(&ctx, &event).await.expect("second apply");

        assert_eq!(outcome, EventOutcome::NotLiked);
        assert_eq!(store.like_count(post_id), 0);
    }

    #[tokio::test]
    async fn event_for_a_deleted_post_is_discarded() {
        let (ctx, _store) = context();

        let outcome = apply_event(&ctx, &like_event(Uuid::new_v4(), Uuid::new_v4()))
            .await
            .expect("apply");

        assert_eq!(outcome, EventOutcome::PostMissing);
    }

    #[tokio::test]
    async fn opposite_toggles_in_one_batch_cancel_out() {
        let (ctx, store) = context();
        let post_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        store.insert_post(post_id);

        let batch = LikeBatch::new(vec![
            like_event(post_id, user_id),
            unlike_event(post_id, user_id),
        ]);

        process_like_batch(batch, Data::new(ctx))
            .await
            .expect("process batch");

        assert_eq!(store.like_count(post_id), 0);
        assert!(
            !store
                .likes
                .lock()
                .expect("likes lock")
                .contains(&(post_id, user_id))
        );
    }

    #[tokio::test]
    async fn a_failing_event_does_not_poison_the_batch() {
        let (ctx, store) = context();
        let present = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        store.insert_post(present);

        // First event targets a missing post, second is fine.
        let batch = LikeBatch::new(vec![
            like_event(Uuid::new_v4(), user_id),
            like_event(present, user_id),
        ]);

        process_like_batch(batch, Data::new(ctx))
            .await
            .expect("process batch");

        assert_eq!(store.like_count(present), 1);
    }
}
