//! Shared fakes for the integration suites: an in-memory durable store and
//! a recording queue publisher.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use brusio::application::pagination::{Page, PageRequest};
use brusio::application::repos::{LikesRepo, PostsRepo, RepoError};
use brusio::domain::entities::PostRecord;
use brusio::queue::{BatchPublisher, LikeBatch, PublishError};

/// In-memory durable store covering posts, follow edges, and like rows,
/// with call counters so tests can assert which paths were exercised.
#[derive(Default)]
pub struct FakeRepo {
    posts: Mutex<Vec<PostRecord>>,
    likes: Mutex<HashSet<(Uuid, Uuid)>>,
    follows: Mutex<HashSet<(Uuid, Uuid)>>,
    pub list_calls: AtomicUsize,
    pub liked_lookup_calls: AtomicUsize,
}

impl FakeRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a post; `age_seconds` pushes it back in time so ordering is
    /// deterministic.
    pub fn insert_post(&self, author_id: Uuid, username: &str, title: &str, age_seconds: i64) -> Uuid {
        let post = PostRecord {
            id: Uuid::new_v4(),
            author_id,
            author_username: username.to_string(),
            like_count: 0,
            title: title.to_string(),
            body: format!("{title} body"),
            created_at: OffsetDateTime::now_utc() - Duration::seconds(age_seconds),
        };
        let id = post.id;
        self.posts.lock().expect("posts lock").push(post);
        id
    }

    pub fn follow(&self, follower_id: Uuid, user_id: Uuid) {
        self.follows
            .lock()
            .expect("follows lock")
            .insert((follower_id, user_id));
    }

    /// Seed a durable like row directly, bypassing the consumer.
    pub fn seed_like(&self, post_id: Uuid, user_id: Uuid) {
        let mut likes = self.likes.lock().expect("likes lock");
        if likes.insert((post_id, user_id)) {
            let mut posts = self.posts.lock().expect("posts lock");
            if let Some(post) = posts.iter_mut().find(|post| post.id == post_id) {
                post.like_count += 1;
            }
        }
    }

    pub fn like_count(&self, post_id: Uuid) -> u64 {
        self.posts
            .lock()
            .expect("posts lock")
            .iter()
            .find(|post| post.id == post_id)
            .map(|post| post.like_count)
            .unwrap_or(0)
    }

    pub fn has_like(&self, post_id: Uuid, user_id: Uuid) -> bool {
        self.likes
            .lock()
            .expect("likes lock")
            .contains(&(post_id, user_id))
    }

    fn visible_to(&self, viewer: Uuid) -> Vec<PostRecord> {
        let follows = self.follows.lock().expect("follows lock");
        let mut visible: Vec<PostRecord> = self
            .posts
            .lock()
            .expect("posts lock")
            .iter()
            .filter(|post| {
                post.author_id == viewer || follows.contains(&(viewer, post.author_id))
            })
            .cloned()
            .collect();
        visible.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        visible
    }
}

#[async_trait]
impl PostsRepo for FakeRepo {
    async fn list_feed_page(
        &self,
        viewer: Uuid,
        request: PageRequest,
    ) -> Result<Page<PostRecord>, RepoError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let visible = self.visible_to(viewer);
        let total_rows = visible.len() as u64;
        let rows = visible
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.size() as usize)
            .collect();

        Ok(Page::new(rows, request, total_rows))
    }

    async fn find_post(&self, post_id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        Ok(self
            .posts
            .lock()
            .expect("posts lock")
            .iter()
            .find(|post| post.id == post_id)
            .cloned())
    }
}

#[async_trait]
impl LikesRepo for FakeRepo {
    async fn like_exists(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, RepoError> {
        Ok(self.has_like(post_id, user_id))
    }

    async fn liked_post_ids(
        &self,
        user_id: Uuid,
        post_ids: &[Uuid],
    ) -> Result<Vec<Uuid>, RepoError> {
        self.liked_lookup_calls.fetch_add(1, Ordering::SeqCst);
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
        if let Some(post) = posts.iter_mut().find(|post| post.id == post_id) {
            post.like_count += 1;
        }
        Ok(())
    }

    async fn delete_like(&self, post_id: Uuid, user_id: Uuid) -> Result<(), RepoError> {
        let mut likes = self.likes.lock().expect("likes lock");
        if likes.remove(&(post_id, user_id)) {
            let mut posts = self.posts.lock().expect("posts lock");
            if let Some(post) = posts.iter_mut().find(|post| post.id == post_id) {
                post.like_count -= 1;
            }
        }
        Ok(())
    }
}

/// Publisher that records every batch it receives.
#[derive(Default)]
pub struct RecordingPublisher {
    batches: Mutex<Vec<LikeBatch>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<LikeBatch> {
        self.batches.lock().expect("batches lock").clone()
    }

    pub fn publish_count(&self) -> usize {
        self.batches.lock().expect("batches lock").len()
    }
}

#[async_trait]
impl BatchPublisher for RecordingPublisher {
    async fn publish(&self, batch: LikeBatch) -> Result<(), PublishError> {
        self.batches.lock().expect("batches lock").push(batch);
        Ok(())
    }
}

/// Poll until `done` holds, panicking after a generous number of yields.
pub async fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
