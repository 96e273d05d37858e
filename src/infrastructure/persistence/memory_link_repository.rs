//! In-process implementation of the link repository.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::domain::entities::{NewShortUrl, ShortUrl};
use crate::domain::repositories::{LinkRepository, RepositoryError};

#[derive(Default)]
struct Inner {
    next_id: i64,
    records: HashMap<String, ShortUrl>,
}

/// A [`LinkRepository`] backed by a mutex-guarded map.
///
/// Honors the same contract as the PostgreSQL repository: codes are unique,
/// not-found is reported for missing codes and increments are applied under
/// the lock so none are lost. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryLinkRepository {
    inner: Mutex<Inner>,
}

impl MemoryLinkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LinkRepository for MemoryLinkRepository {
    async fn create(&self, new_url: NewShortUrl) -> Result<ShortUrl, RepositoryError> {
        let mut inner = self.inner.lock();

        if inner.records.contains_key(&new_url.short_code) {
            return Err(RepositoryError::DuplicateCode);
        }

        inner.next_id += 1;
        let now = Utc::now();
        let record = ShortUrl::new(
            inner.next_id,
            new_url.short_code,
            new_url.original_url,
            0,
            now,
            now,
            new_url.owner_id,
        );

        inner
            .records
            .insert(record.short_code.clone(), record.clone());
        Ok(record)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<ShortUrl>, RepositoryError> {
        Ok(self.inner.lock().records.get(code).cloned())
    }

    async fn update_url(
        &self,
        code: &str,
        original_url: &str,
    ) -> Result<ShortUrl, RepositoryError> {
        let mut inner = self.inner.lock();
        let record = inner
            .records
            .get_mut(code)
            .ok_or(RepositoryError::NotFound)?;

        record.original_url = original_url.to_string();
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn delete_by_code(&self, code: &str) -> Result<(), RepositoryError> {
        self.inner
            .lock()
            .records
            .remove(code)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn increment_access_count(&self, code: &str) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock();
        let record = inner
            .records
            .get_mut(code)
            .ok_or(RepositoryError::NotFound)?;

        record.access_count += 1;
        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
