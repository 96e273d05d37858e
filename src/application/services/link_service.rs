//! Resolution and accounting orchestrator.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::access_worker::AccessRecorder;
use crate::domain::entities::{NewShortUrl, ShortUrl};
use crate::domain::repositories::{LinkRepository, RepositoryError};
use crate::error::AppError;
use crate::infrastructure::cache::{CacheService, CachedLink};
use crate::utils::code_generator::{DEFAULT_CODE_LENGTH, generate_code, is_valid_code};
use crate::utils::url_validator::validate_url;
use serde_json::json;

/// Tunables for [`LinkService`].
#[derive(Debug, Clone)]
pub struct LinkSettings {
    pub code_length: usize,
    /// Insert attempts before a create gives up with a conflict.
    pub max_attempts: usize,
    pub cache_ttl: Duration,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            code_length: DEFAULT_CODE_LENGTH,
            max_attempts: 5,
            cache_ttl: Duration::from_secs(3600),
        }
    }
}

/// Creates, resolves and maintains short URLs.
///
/// Durable storage is authoritative. The cache is consulted first on resolve
/// and is refreshed on create and invalidated on update and delete; any cache
/// failure is logged and the call proceeds against durable storage. Successful
/// resolves hand an access event to the accounting worker without waiting.
pub struct LinkService {
    repository: Arc<dyn LinkRepository>,
    cache: Arc<dyn CacheService>,
    recorder: AccessRecorder,
    settings: LinkSettings,
}

impl LinkService {
    pub fn new(
        repository: Arc<dyn LinkRepository>,
        cache: Arc<dyn CacheService>,
        recorder: AccessRecorder,
        settings: LinkSettings,
    ) -> Self {
        Self {
            repository,
            cache,
            recorder,
            settings,
        }
    }

    /// Shortens `url` under a freshly generated code.
    ///
    /// The URL is validated before any storage or cache call. A generated code
    /// that collides with an existing one is regenerated, up to
    /// `max_attempts` inserts in total.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] if the URL is rejected
    /// - [`AppError::Conflict`] if every attempt collided
    /// - [`AppError::Internal`] / [`AppError::ServiceUnavailable`] on storage failure
    pub async fn create_short_url(
        &self,
        url: &str,
        owner_id: Option<String>,
    ) -> Result<ShortUrl, AppError> {
        let original_url = validate_url(url)?;

        let record = self.insert_with_fresh_code(original_url, owner_id).await?;
        self.write_through(&record).await;

        Ok(record)
    }

    async fn insert_with_fresh_code(
        &self,
        original_url: String,
        owner_id: Option<String>,
    ) -> Result<ShortUrl, AppError> {
        let attempts = self.settings.max_attempts.max(1);

        for attempt in 1..=attempts {
            let new_url = NewShortUrl {
                short_code: generate_code(self.settings.code_length)?,
                original_url: original_url.clone(),
                owner_id: owner_id.clone(),
            };

            match self.repository.create(new_url).await {
                Ok(record) => return Ok(record),
                Err(RepositoryError::DuplicateCode) => {
                    metrics::counter!("code_collisions_total").increment(1);
                    debug!(attempt, "Short code collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::conflict(
            "Failed to generate a unique short code",
            json!({ "attempts": attempts }),
        ))
    }

    /// Returns the target URL for `code` and schedules one access.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no record exists.
    pub async fn resolve(&self, code: &str) -> Result<String, AppError> {
        if !is_valid_code(code) {
            return Err(not_found(code));
        }

        let target = match self.cache.lookup(code).await {
            Ok(Some(entry)) => {
                metrics::counter!("cache_lookups_total", "result" => "hit").increment(1);
                debug!(code, "Cache hit");
                entry.original_url
            }
            Ok(None) => {
                metrics::counter!("cache_lookups_total", "result" => "miss").increment(1);
                debug!(code, "Cache miss");
                self.load_and_cache(code).await?
            }
            Err(e) => {
                metrics::counter!("cache_lookups_total", "result" => "error").increment(1);
                warn!(code, error = %e, "Cache lookup failed, falling back to storage");
                self.load_and_cache(code).await?
            }
        };

        self.recorder.record(code);
        Ok(target)
    }

    async fn load_and_cache(&self, code: &str) -> Result<String, AppError> {
        let record = self
            .repository
            .find_by_code(code)
            .await?
            .ok_or_else(|| not_found(code))?;

        self.write_through(&record).await;
        Ok(record.original_url)
    }

    /// Points `code` at a new URL.
    ///
    /// Leaves `access_count` and `created_at` untouched and drops the cached
    /// entry so the next resolve reads the new target.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] if the URL is rejected
    /// - [`AppError::NotFound`] if no record exists
    pub async fn update(&self, code: &str, url: &str) -> Result<ShortUrl, AppError> {
        let original_url = validate_url(url)?;
        if !is_valid_code(code) {
            return Err(not_found(code));
        }

        let record = self
            .repository
            .update_url(code, &original_url)
            .await
            .map_err(|e| map_missing(e, code))?;

        self.invalidate(code).await;
        Ok(record)
    }

    /// Removes `code`. The code may be issued again afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no record exists.
    pub async fn delete(&self, code: &str) -> Result<(), AppError> {
        if !is_valid_code(code) {
            return Err(not_found(code));
        }

        self.repository
            .delete_by_code(code)
            .await
            .map_err(|e| map_missing(e, code))?;

        self.invalidate(code).await;
        Ok(())
    }

    /// Reads the authoritative record, bypassing the cache.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no record exists.
    pub async fn stats(&self, code: &str) -> Result<ShortUrl, AppError> {
        if !is_valid_code(code) {
            return Err(not_found(code));
        }

        self.repository
            .find_by_code(code)
            .await?
            .ok_or_else(|| not_found(code))
    }

    /// Same read as [`Self::stats`]; does not count an access.
    pub async fn get(&self, code: &str) -> Result<ShortUrl, AppError> {
        self.stats(code).await
    }

    async fn write_through(&self, record: &ShortUrl) {
        if let Err(e) = self
            .cache
            .put(&CachedLink::from(record), self.settings.cache_ttl)
            .await
        {
            warn!(code = %record.short_code, error = %e, "Failed to cache short URL");
        }
    }

    async fn invalidate(&self, code: &str) {
        if let Err(e) = self.cache.invalidate(code).await {
            warn!(code, error = %e, "Failed to invalidate cached short URL");
        }
    }
}

fn not_found(code: &str) -> AppError {
    AppError::not_found("Short URL not found", json!({ "code": code }))
}

fn map_missing(e: RepositoryError, code: &str) -> AppError {
    match e {
        RepositoryError::NotFound => not_found(code),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::access_event::AccessEvent;
    use crate::domain::repositories::MockLinkRepository;
    use crate::infrastructure::cache::{CacheError, MockCacheService};
    use chrono::Utc;
    use tokio::sync::mpsc;

    fn record(code: &str, url: &str) -> ShortUrl {
        let now = Utc::now();
        ShortUrl::new(1, code.to_string(), url.to_string(), 0, now, now, None)
    }

    fn service(
        repo: MockLinkRepository,
        cache: MockCacheService,
    ) -> (LinkService, mpsc::Receiver<AccessEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let service = LinkService::new(
            Arc::new(repo),
            Arc::new(cache),
            AccessRecorder::new(tx),
            LinkSettings::default(),
        );
        (service, rx)
    }

    fn recorded(rx: &mut mpsc::Receiver<AccessEvent>) -> Vec<String> {
        let mut codes = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let AccessEvent::Hit { code } = event {
                codes.push(code);
            }
        }
        codes
    }

    #[tokio::test]
    async fn test_create_writes_through_to_cache() {
        let mut repo = MockLinkRepository::new();
        repo.expect_create()
            .withf(|new_url| {
                new_url.short_code.len() == DEFAULT_CODE_LENGTH
                    && new_url.original_url == "https://example.com/page"
                    && new_url.owner_id.as_deref() == Some("alice")
            })
            .times(1)
            .returning(|new_url| Ok(record(&new_url.short_code, &new_url.original_url)));

        let mut cache = MockCacheService::new();
        cache
            .expect_put()
            .withf(|entry, ttl| {
                entry.original_url == "https://example.com/page" && *ttl == Duration::from_secs(3600)
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let (service, _rx) = service(repo, cache);
        let created = service
            .create_short_url("https://example.com/page", Some("alice".to_string()))
            .await
            .unwrap();

        assert_eq!(created.access_count, 0);
        assert_eq!(created.original_url, "https://example.com/page");
    }

    #[tokio::test]
    async fn test_create_retries_after_collision() {
        let mut repo = MockLinkRepository::new();
        let mut seq = mockall::Sequence::new();
        repo.expect_create()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(RepositoryError::DuplicateCode));
        repo.expect_create()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|new_url| Ok(record(&new_url.short_code, &new_url.original_url)));

        let mut cache = MockCacheService::new();
        cache.expect_put().returning(|_, _| Ok(()));

        let (service, _rx) = service(repo, cache);
        let result = service.create_short_url("https://example.com", None).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_create_exhausts_attempts_with_conflict() {
        let mut repo = MockLinkRepository::new();
        repo.expect_create()
            .times(5)
            .returning(|_| Err(RepositoryError::DuplicateCode));

        let mut cache = MockCacheService::new();
        cache.expect_put().times(0);

        let (service, _rx) = service(repo, cache);
        let result = service.create_short_url("https://example.com", None).await;

        assert!(matches!(result, Err(AppError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_create_rejects_dangerous_url_before_storage() {
        let mut repo = MockLinkRepository::new();
        repo.expect_create().times(0);
        let mut cache = MockCacheService::new();
        cache.expect_put().times(0);

        let (service, _rx) = service(repo, cache);
        let result = service
            .create_short_url("javascript:alert(1)", None)
            .await;

        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_create_survives_cache_failure() {
        let mut repo = MockLinkRepository::new();
        repo.expect_create()
            .returning(|new_url| Ok(record(&new_url.short_code, &new_url.original_url)));

        let mut cache = MockCacheService::new();
        cache
            .expect_put()
            .returning(|_, _| Err(CacheError::ConnectionError("down".to_string())));

        let (service, _rx) = service(repo, cache);
        assert!(service.create_short_url("https://example.com", None).await.is_ok());
    }

    #[tokio::test]
    async fn test_resolve_cache_hit_skips_storage() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code().times(0);

        let mut cache = MockCacheService::new();
        cache.expect_lookup().times(1).returning(|code| {
            Ok(Some(CachedLink {
                short_code: code.to_string(),
                original_url: "https://example.com".to_string(),
            }))
        });

        let (service, mut rx) = service(repo, cache);
        let target = service.resolve("abc123").await.unwrap();

        assert_eq!(target, "https://example.com");
        assert_eq!(recorded(&mut rx), vec!["abc123".to_string()]);
    }

    #[tokio::test]
    async fn test_resolve_cache_miss_reads_storage_and_caches() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code()
            .times(1)
            .returning(|code| Ok(Some(record(code, "https://example.com"))));

        let mut cache = MockCacheService::new();
        cache.expect_lookup().times(1).returning(|_| Ok(None));
        cache
            .expect_put()
            .withf(|entry, _| entry.short_code == "abc123")
            .times(1)
            .returning(|_, _| Ok(()));

        let (service, mut rx) = service(repo, cache);
        let target = service.resolve("abc123").await.unwrap();

        assert_eq!(target, "https://example.com");
        assert_eq!(recorded(&mut rx).len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_cache_error_falls_back_to_storage() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code()
            .times(1)
            .returning(|code| Ok(Some(record(code, "https://example.com"))));

        let mut cache = MockCacheService::new();
        cache
            .expect_lookup()
            .returning(|_| Err(CacheError::ConnectionError("down".to_string())));
        cache
            .expect_put()
            .returning(|_, _| Err(CacheError::ConnectionError("down".to_string())));

        let (service, _rx) = service(repo, cache);
        assert_eq!(
            service.resolve("abc123").await.unwrap(),
            "https://example.com"
        );
    }

    #[tokio::test]
    async fn test_resolve_unknown_code_records_nothing() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code().returning(|_| Ok(None));
        let mut cache = MockCacheService::new();
        cache.expect_lookup().returning(|_| Ok(None));
        cache.expect_put().times(0);

        let (service, mut rx) = service(repo, cache);
        let result = service.resolve("nope12").await;

        assert!(matches!(result, Err(AppError::NotFound { .. })));
        assert!(recorded(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_resolve_malformed_code_touches_nothing() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code().times(0);
        let mut cache = MockCacheService::new();
        cache.expect_lookup().times(0);

        let (service, _rx) = service(repo, cache);
        let result = service.resolve("not/a code").await;

        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_update_invalidates_cache() {
        let mut repo = MockLinkRepository::new();
        repo.expect_update_url()
            .withf(|code, url| code == "abc123" && url == "https://example.com/new")
            .times(1)
            .returning(|code, url| Ok(record(code, url)));

        let mut cache = MockCacheService::new();
        cache
            .expect_invalidate()
            .withf(|code| code == "abc123")
            .times(1)
            .returning(|_| Ok(()));

        let (service, _rx) = service(repo, cache);
        let updated = service
            .update("abc123", "https://example.com/new")
            .await
            .unwrap();

        assert_eq!(updated.original_url, "https://example.com/new");
    }

    #[tokio::test]
    async fn test_update_missing_code_is_not_found() {
        let mut repo = MockLinkRepository::new();
        repo.expect_update_url()
            .returning(|_, _| Err(RepositoryError::NotFound));
        let mut cache = MockCacheService::new();
        cache.expect_invalidate().times(0);

        let (service, _rx) = service(repo, cache);
        let result = service.update("abc123", "https://example.com").await;

        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_url_before_storage() {
        let mut repo = MockLinkRepository::new();
        repo.expect_update_url().times(0);

        let (service, _rx) = service(repo, MockCacheService::new());
        let result = service.update("abc123", "ftp://example.com").await;

        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_delete_invalidates_cache() {
        let mut repo = MockLinkRepository::new();
        repo.expect_delete_by_code().times(1).returning(|_| Ok(()));

        let mut cache = MockCacheService::new();
        cache.expect_invalidate().times(1).returning(|_| Ok(()));

        let (service, _rx) = service(repo, cache);
        assert!(service.delete("abc123").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_missing_code_is_not_found() {
        let mut repo = MockLinkRepository::new();
        repo.expect_delete_by_code()
            .returning(|_| Err(RepositoryError::NotFound));

        let (service, _rx) = service(repo, MockCacheService::new());
        let result = service.delete("abc123").await;

        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_stats_never_reads_cache() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code().times(1).returning(|code| {
            let mut r = record(code, "https://example.com");
            r.access_count = 42;
            Ok(Some(r))
        });

        let mut cache = MockCacheService::new();
        cache.expect_lookup().times(0);
        cache.expect_read_counter().times(0);

        let (service, mut rx) = service(repo, cache);
        let stats = service.stats("abc123").await.unwrap();

        assert_eq!(stats.access_count, 42);
        assert!(recorded(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_storage_outage_is_unavailable() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code()
            .returning(|_| Err(RepositoryError::Unavailable("pool timed out".to_string())));

        let (service, _rx) = service(repo, MockCacheService::new());
        let result = service.stats("abc123").await;

        assert!(matches!(result, Err(AppError::ServiceUnavailable { .. })));
    }
}
