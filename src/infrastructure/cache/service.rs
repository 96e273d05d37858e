//! Cache service trait and error types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::entities::ShortUrl;

/// Errors that can occur during cache operations.
///
/// Never surfaced to HTTP callers: the orchestrator logs them and falls back
/// to durable storage.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    ConnectionError(String),

    #[error("Cache operation error: {0}")]
    OperationError(String),

    #[error("Cache payload error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// The resolvable fields of a [`ShortUrl`], as mirrored in the cache.
///
/// Possibly stale: durable storage stays authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedLink {
    pub short_code: String,
    pub original_url: String,
}

impl From<&ShortUrl> for CachedLink {
    fn from(record: &ShortUrl) -> Self {
        Self {
            short_code: record.short_code.clone(),
            original_url: record.original_url.clone(),
        }
    }
}

/// Volatile, TTL-bound mirror of hot short URLs plus a presentation counter.
///
/// The record entry and the counter live under independent keys and are not
/// updated atomically with each other or with durable storage. Counter values
/// are never reconciled into durable storage and may be lost on eviction or
/// restart.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache with TTL support
/// - [`crate::infrastructure::cache::MemoryCache`] - in-process cache with TTL support
/// - [`crate::infrastructure::cache::NullCache`] - No-op implementation for disabled caching
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Looks up the cached entry for a short code.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(entry))` on cache hit
    /// - `Ok(None)` on cache miss or expired entry
    async fn lookup(&self, short_code: &str) -> CacheResult<Option<CachedLink>>;

    /// Stores an entry that expires after `ttl`.
    async fn put(&self, entry: &CachedLink, ttl: Duration) -> CacheResult<()>;

    /// Removes the entry for a short code. Removing a missing entry succeeds.
    async fn invalidate(&self, short_code: &str) -> CacheResult<()>;

    /// Increments the presentation counter and returns the new value.
    async fn increment_counter(&self, short_code: &str) -> CacheResult<i64>;

    /// Reads the presentation counter, if one exists.
    async fn read_counter(&self, short_code: &str) -> CacheResult<Option<i64>>;

    /// Checks if the cache backend is healthy.
    ///
    /// Used by health check endpoints to report cache status.
    async fn health_check(&self) -> bool;

    /// Human-readable backend name for logs and health output.
    fn backend_name(&self) -> &'static str;
}
