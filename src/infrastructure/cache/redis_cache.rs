//! Redis-backed cache implementation.

use super::service::{CacheError, CacheResult, CacheService, CachedLink};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::time::Duration;
use tracing::{debug, info};

/// Redis cache for fast short-code lookups.
///
/// Entries are JSON documents under `url:{code}` written with `SET EX`.
/// Presentation counters live under `count:{code}` and are refreshed to the
/// counter TTL on every increment so counters of deleted codes age out.
///
/// Errors are returned to the caller, which treats them as soft failures.
pub struct RedisCache {
    client: ConnectionManager,
    counter_ttl: Duration,
}

impl RedisCache {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Arguments
    ///
    /// - `redis_url` - Redis connection string (e.g., `"redis://localhost:6379"`)
    /// - `counter_ttl` - lifetime of presentation counters after their last increment
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionError`] if the URL is invalid, the connection cannot
    /// be established, or the PING health check fails.
    pub async fn connect(redis_url: &str, counter_ttl: Duration) -> CacheResult<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {}", e)))?;

        info!("Connected to Redis");

        Ok(Self {
            client: manager,
            counter_ttl,
        })
    }

    fn counter_ttl_seconds(&self) -> i64 {
        i64::try_from(self.counter_ttl.as_secs().max(1)).unwrap_or(i64::MAX)
    }

    fn entry_key(short_code: &str) -> String {
        format!("url:{}", short_code)
    }

    fn counter_key(short_code: &str) -> String {
        format!("count:{}", short_code)
    }
}

fn op_error(e: redis::RedisError) -> CacheError {
    CacheError::OperationError(e.to_string())
}

#[async_trait]
impl CacheService for RedisCache {
    async fn lookup(&self, short_code: &str) -> CacheResult<Option<CachedLink>> {
        let mut conn = self.client.clone();

        let raw: Option<String> = conn
            .get(Self::entry_key(short_code))
            .await
            .map_err(op_error)?;

        match raw {
            Some(payload) => {
                debug!(short_code, "Redis HIT");
                Ok(Some(serde_json::from_str(&payload)?))
            }
            None => {
                debug!(short_code, "Redis MISS");
                Ok(None)
            }
        }
    }

    async fn put(&self, entry: &CachedLink, ttl: Duration) -> CacheResult<()> {
        let payload = serde_json::to_string(entry)?;
        let mut conn = self.client.clone();
        let ttl_seconds = ttl.as_secs().max(1);

        conn.set_ex::<_, _, ()>(Self::entry_key(&entry.short_code), payload, ttl_seconds)
            .await
            .map_err(op_error)?;

        debug!(short_code = %entry.short_code, ttl_seconds, "Redis SET");
        Ok(())
    }

    async fn invalidate(&self, short_code: &str) -> CacheResult<()> {
        let mut conn = self.client.clone();

        let deleted: i64 = conn
            .del(Self::entry_key(short_code))
            .await
            .map_err(op_error)?;

        if deleted > 0 {
            debug!(short_code, "Redis INVALIDATE");
        }
        Ok(())
    }

    async fn increment_counter(&self, short_code: &str) -> CacheResult<i64> {
        let key = Self::counter_key(short_code);
        let mut conn = self.client.clone();

        let (value,): (i64,) = redis::pipe()
            .atomic()
            .incr(&key, 1)
            .expire(&key, self.counter_ttl_seconds())
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(op_error)?;

        Ok(value)
    }

    async fn read_counter(&self, short_code: &str) -> CacheResult<Option<i64>> {
        let mut conn = self.client.clone();

        conn.get(Self::counter_key(short_code))
            .await
            .map_err(op_error)
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
