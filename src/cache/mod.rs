//! Brusio cache subsystem.
//!
//! Two cooperating layers over one external key-value store:
//!
//! - **Feed page cache**: fully rendered feed pages, keyed by
//!   (viewer, page, size). Disposable snapshots, replaced wholesale.
//! - **Like overlay**: per-(post, user) liked markers. Absence means
//!   "unknown", never "not liked"; callers fall back to the durable
//!   store on a miss.
//!
//! Both layers absorb store failures: a broken or slow cache degrades the
//! read path to the durable store, it never fails it.

mod config;
mod feed_page;
mod keys;
pub(crate) mod lock;
mod overlay;
mod store;

pub use config::CacheConfig;
pub use feed_page::FeedPageCache;
pub use keys::{feed_page_key, like_overlay_key};
pub use overlay::{BatchLookup, LikeOverlay};
pub use store::{CacheError, CacheStore, MemoryStore};
