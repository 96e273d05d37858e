//! PostgreSQL implementation of the link repository.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{NewShortUrl, ShortUrl};
use crate::domain::repositories::{LinkRepository, RepositoryError};

/// Name of the uniqueness constraint on `short_urls.short_code`.
const SHORT_CODE_CONSTRAINT: &str = "short_urls_short_code_key";

const RECORD_COLUMNS: &str =
    "id, short_code, original_url, access_count, created_at, updated_at, owner_id";

/// PostgreSQL repository for short URLs.
///
/// Uses bound parameters throughout. Not-found outcomes are derived from zero
/// affected rows; uniqueness violations on the short-code constraint become
/// [`RepositoryError::DuplicateCode`]; pool and I/O failures become
/// [`RepositoryError::Unavailable`].
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

/// Returns true if the error is a unique violation on the short-code constraint.
fn is_duplicate_code(e: &sqlx::Error) -> bool {
    let Some(db_err) = e.as_database_error() else {
        return false;
    };

    db_err.is_unique_violation() && matches!(db_err.constraint(), Some(SHORT_CODE_CONSTRAINT))
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn create(&self, new_url: NewShortUrl) -> Result<ShortUrl, RepositoryError> {
        let query = format!(
            "INSERT INTO short_urls (short_code, original_url, owner_id) \
             VALUES ($1, $2, $3) \
             RETURNING {RECORD_COLUMNS}"
        );

        sqlx::query_as::<_, ShortUrl>(&query)
            .bind(&new_url.short_code)
            .bind(&new_url.original_url)
            .bind(&new_url.owner_id)
            .fetch_one(self.pool.as_ref())
            .await
            .map_err(|e| {
                if is_duplicate_code(&e) {
                    RepositoryError::DuplicateCode
                } else {
                    RepositoryError::from(e)
                }
            })
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<ShortUrl>, RepositoryError> {
        let query = format!("SELECT {RECORD_COLUMNS} FROM short_urls WHERE short_code = $1");

        let record = sqlx::query_as::<_, ShortUrl>(&query)
            .bind(code)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(record)
    }

    async fn update_url(
        &self,
        code: &str,
        original_url: &str,
    ) -> Result<ShortUrl, RepositoryError> {
        let query = format!(
            "UPDATE short_urls \
             SET original_url = $2, updated_at = NOW() \
             WHERE short_code = $1 \
             RETURNING {RECORD_COLUMNS}"
        );

        sqlx::query_as::<_, ShortUrl>(&query)
            .bind(code)
            .bind(original_url)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete_by_code(&self, code: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM short_urls WHERE short_code = $1")
            .bind(code)
            .execute(self.pool.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn increment_access_count(&self, code: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE short_urls SET access_count = access_count + 1 WHERE short_code = $1",
        )
        .bind(code)
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .map(|_| ())
            .map_err(|e| match RepositoryError::from(e) {
                RepositoryError::Database(e) => RepositoryError::Unavailable(e.to_string()),
                other => other,
            })
    }
}
