//! Brusio, the feed/like caching subsystem of a social-network backend.
//!
//! Serves paginated per-user feeds from a key-value cache with fallback to
//! the relational store, overlays per-(post, user) liked state written
//! optimistically to cache, and propagates like/unlike mutations to durable
//! storage asynchronously through a batched queue.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod queue;
