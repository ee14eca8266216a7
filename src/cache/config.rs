//! Cache configuration.

use std::time::Duration;

const DEFAULT_FEED_TTL_SECONDS: u64 = 300;
const DEFAULT_LIKE_TTL_SECONDS: u64 = 300;
const DEFAULT_OP_TIMEOUT_MS: u64 = 250;

/// Tunables shared by the feed page cache and the like overlay.
///
/// The two TTLs are independent: feed pages are bulky snapshots that age
/// quickly, overlay markers are tiny and only need to outlive consumer lag.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// Lifetime of a cached feed page.
    pub feed_ttl: Duration,
    /// Lifetime of a liked marker in the overlay.
    pub like_ttl: Duration,
    /// Upper bound on any single cache store call; a timed-out call is
    /// treated as a miss.
    pub op_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            feed_ttl: Duration::from_secs(DEFAULT_FEED_TTL_SECONDS),
            like_ttl: Duration::from_secs(DEFAULT_LIKE_TTL_SECONDS),
            op_timeout: Duration::from_millis(DEFAULT_OP_TIMEOUT_MS),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            feed_ttl: Duration::from_secs(settings.feed_ttl_seconds),
            like_ttl: Duration::from_secs(settings.like_ttl_seconds),
            op_timeout: Duration::from_millis(settings.op_timeout_ms),
        }
    }
}
