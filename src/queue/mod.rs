//! Like event pipeline: in-process batching, queue publishing, and the
//! durable consumer.
//!
//! Toggles are already visible through the like overlay by the time they
//! reach this module, so the durable mutation is not latency-sensitive.
//! Batching amortizes bursts (a double-tap like/unlike becomes one queue
//! message) before they hit the broker and the database.

mod batcher;
mod consumer;
mod events;
mod publisher;

pub use batcher::{BatcherConfig, BatcherHandle, LikeEventBatcher};
pub use consumer::{ConsumerContext, EventOutcome, apply_event, process_like_batch};
pub use events::{LikeBatch, LikeEvent};
pub use publisher::{BatchPublisher, PublishError, QueueBatchPublisher};
