#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use link_relay::application::services::{LinkService, LinkSettings, RateLimiter, StaticTokenProvider};
use link_relay::domain::access_worker::AccessRecorder;
use link_relay::infrastructure::cache::{CacheError, CacheResult, CacheService, CachedLink, MemoryCache};
use link_relay::infrastructure::persistence::MemoryLinkRepository;
use link_relay::routes::router;
use link_relay::state::AppState;

/// Knobs for [`test_app`]. Defaults admit far more requests than any test sends.
pub struct TestOptions {
    pub rate_limit_capacity: u32,
    pub rate_limit_refill_per_sec: f64,
    pub api_tokens: Vec<(String, String)>,
    pub behind_proxy: bool,
    pub queue_capacity: usize,
    pub cache: Option<Arc<dyn CacheService>>,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            rate_limit_capacity: 10_000,
            rate_limit_refill_per_sec: 10_000.0,
            api_tokens: Vec::new(),
            behind_proxy: false,
            queue_capacity: 1_000,
            cache: None,
        }
    }
}

/// A fully wired application over in-memory backends.
pub struct TestApp {
    pub state: AppState,
    pub repository: Arc<MemoryLinkRepository>,
    pub cache: Arc<dyn CacheService>,
    pub recorder: AccessRecorder,
    pub worker: JoinHandle<()>,
}

impl TestApp {
    pub fn service(&self) -> Arc<LinkService> {
        self.state.link_service.clone()
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(router(self.state.clone())).unwrap()
    }

    /// Waits for every access enqueued so far to reach the repository.
    pub async fn settle(&self) {
        self.recorder.flush().await.unwrap();
    }
}

/// Must be called from within a Tokio runtime: the accounting worker is spawned.
pub fn test_app(options: TestOptions) -> TestApp {
    let repository = Arc::new(MemoryLinkRepository::new());
    let cache = options
        .cache
        .unwrap_or_else(|| Arc::new(MemoryCache::new()) as Arc<dyn CacheService>);

    let (recorder, worker) =
        AccessRecorder::spawn(repository.clone(), cache.clone(), options.queue_capacity, 4);

    let state = AppState::new(
        repository.clone(),
        cache.clone(),
        recorder.clone(),
        Arc::new(StaticTokenProvider::new(options.api_tokens)),
        Arc::new(RateLimiter::new(
            options.rate_limit_capacity,
            options.rate_limit_refill_per_sec,
        )),
        LinkSettings {
            code_length: 6,
            max_attempts: 5,
            cache_ttl: Duration::from_secs(60),
        },
    )
    .with_behind_proxy(options.behind_proxy);

    TestApp {
        state,
        repository,
        cache,
        recorder,
        worker,
    }
}

pub fn default_app() -> TestApp {
    test_app(TestOptions::default())
}

/// A cache whose backend is permanently unreachable.
pub struct FailingCache;

fn down<T>() -> CacheResult<T> {
    Err(CacheError::ConnectionError("connection refused".to_string()))
}

#[async_trait]
impl CacheService for FailingCache {
    async fn lookup(&self, _short_code: &str) -> CacheResult<Option<CachedLink>> {
        down()
    }

    async fn put(&self, _entry: &CachedLink, _ttl: Duration) -> CacheResult<()> {
        down()
    }

    async fn invalidate(&self, _short_code: &str) -> CacheResult<()> {
        down()
    }

    async fn increment_counter(&self, _short_code: &str) -> CacheResult<i64> {
        down()
    }

    async fn read_counter(&self, _short_code: &str) -> CacheResult<Option<i64>> {
        down()
    }

    async fn health_check(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}
