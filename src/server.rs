//! Process runtime: connections, worker, HTTP server and shutdown.

use crate::application::services::{RateLimiter, StaticTokenProvider};
use crate::config::{CacheBackend, Config};
use crate::domain::access_worker::AccessRecorder;
use crate::infrastructure::cache::{CacheService, MemoryCache, NullCache, RedisCache};
use crate::infrastructure::database::connect_with_retry;
use crate::infrastructure::persistence::PgLinkRepository;
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

/// Runs the service until a shutdown signal arrives.
///
/// Startup order:
/// - PostgreSQL pool, with bounded retries
/// - migrations
/// - cache backend (a Redis connect failure degrades to [`NullCache`])
/// - access accounting worker
/// - HTTP listener
///
/// On shutdown the listener stops accepting, in-flight requests finish and the
/// access queue is flushed before returning.
///
/// # Errors
///
/// Returns an error if the database stays unreachable, migrations fail or the
/// listener cannot bind.
pub async fn run(config: Config) -> Result<()> {
    let pool = connect_with_retry(&config.database_url, &config.pool_settings())
        .await
        .context("Database unreachable after retries")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations applied");

    let cache = build_cache(&config).await;

    let repository = Arc::new(PgLinkRepository::new(Arc::new(pool)));
    let (recorder, worker) = AccessRecorder::spawn(
        repository.clone(),
        cache.clone(),
        config.access_queue_capacity,
        config.access_worker_concurrency,
    );
    tracing::info!(
        capacity = config.access_queue_capacity,
        concurrency = config.access_worker_concurrency,
        "Access worker started"
    );

    let identity = Arc::new(StaticTokenProvider::new(config.api_tokens.clone()));
    let rate_limiter = Arc::new(RateLimiter::new(
        config.rate_limit_capacity,
        config.rate_limit_refill_per_sec,
    ));

    let state = AppState::new(
        repository,
        cache,
        recorder.clone(),
        identity,
        rate_limiter,
        config.link_settings(),
    )
    .with_behind_proxy(config.behind_proxy);

    let app = app_router(state);

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid LISTEN address '{}'", config.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Draining access queue");
    if let Err(e) = recorder.flush().await {
        tracing::warn!(error = %e, "Access queue was not drained");
    }
    drop(recorder);
    worker.abort();

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn build_cache(config: &Config) -> Arc<dyn CacheService> {
    match (config.cache_backend, &config.redis_url) {
        (CacheBackend::Redis, Some(redis_url)) => {
            match RedisCache::connect(redis_url, config.cache_ttl()).await {
                Ok(redis) => {
                    tracing::info!("Cache enabled (Redis)");
                    Arc::new(redis)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to connect to Redis, caching disabled");
                    Arc::new(NullCache::new())
                }
            }
        }
        (CacheBackend::Memory, _) => {
            tracing::info!("Cache enabled (in-process)");
            Arc::new(MemoryCache::new().with_counter_ttl(config.cache_ttl()))
        }
        _ => {
            tracing::info!("Cache disabled");
            Arc::new(NullCache::new())
        }
    }
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
