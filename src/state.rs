//! Shared application state injected into handlers and middleware.

use std::sync::Arc;

use crate::application::services::{IdentityProvider, LinkService, LinkSettings, RateLimiter};
use crate::domain::access_worker::AccessRecorder;
use crate::domain::repositories::LinkRepository;
use crate::infrastructure::cache::CacheService;

/// Cheap to clone: every field is a handle.
#[derive(Clone)]
pub struct AppState {
    pub link_service: Arc<LinkService>,
    pub rate_limiter: Arc<RateLimiter>,
    pub identity: Arc<dyn IdentityProvider>,
    /// Kept for health checks; request paths go through `link_service`.
    pub repository: Arc<dyn LinkRepository>,
    pub cache: Arc<dyn CacheService>,
    pub recorder: AccessRecorder,
    /// Derive the rate-limit key from forwarding headers.
    pub behind_proxy: bool,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn LinkRepository>,
        cache: Arc<dyn CacheService>,
        recorder: AccessRecorder,
        identity: Arc<dyn IdentityProvider>,
        rate_limiter: Arc<RateLimiter>,
        settings: LinkSettings,
    ) -> Self {
        let link_service = Arc::new(LinkService::new(
            repository.clone(),
            cache.clone(),
            recorder.clone(),
            settings,
        ));

        Self {
            link_service,
            rate_limiter,
            identity,
            repository,
            cache,
            recorder,
            behind_proxy: false,
        }
    }

    pub fn with_behind_proxy(mut self, behind_proxy: bool) -> Self {
        self.behind_proxy = behind_proxy;
        self
    }
}
