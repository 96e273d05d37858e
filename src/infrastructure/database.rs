//! PostgreSQL pool construction with bounded startup retries.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_retry::Retry;
use tokio_retry::strategy::FixedInterval;
use tracing::{info, warn};

/// Pool sizing and startup retry policy.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
    /// Additional attempts after the first one fails.
    pub connect_retries: usize,
    pub connect_backoff: Duration,
}

/// Connects the pool, retrying with a fixed backoff.
///
/// The first attempt plus `connect_retries` retries are made, waiting
/// `connect_backoff` between them. The service must not serve without durable
/// storage, so the caller treats the returned error as fatal.
///
/// # Errors
///
/// Returns the last connection error once all attempts are exhausted.
pub async fn connect_with_retry(
    database_url: &str,
    settings: &PoolSettings,
) -> Result<PgPool, sqlx::Error> {
    let attempts = AtomicUsize::new(0);
    let attempt = &attempts;
    let strategy = FixedInterval::new(settings.connect_backoff).take(settings.connect_retries);

    let pool = Retry::spawn(strategy, || async move {
        let n = attempt.fetch_add(1, Ordering::Relaxed) + 1;

        PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .idle_timeout(settings.idle_timeout)
            .max_lifetime(settings.max_lifetime)
            .connect(database_url)
            .await
            .inspect_err(|e| {
                warn!(
                    attempt = n,
                    max_attempts = settings.connect_retries + 1,
                    error = %e,
                    "Failed to connect to database"
                );
            })
    })
    .await?;

    info!(
        attempts = attempts.load(Ordering::Relaxed),
        "Connected to database"
    );
    Ok(pool)
}
