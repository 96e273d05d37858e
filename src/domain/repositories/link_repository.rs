//! Repository trait for durable short URL storage.

use crate::domain::entities::{NewShortUrl, ShortUrl};
use async_trait::async_trait;

/// Failure kinds reported by a [`LinkRepository`].
///
/// `NotFound` and `DuplicateCode` are expected outcomes the orchestrator
/// branches on; the remaining variants are genuine storage failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// No row matched the short code (zero affected rows).
    #[error("short URL not found")]
    NotFound,

    /// The short code violates the uniqueness constraint.
    #[error("short code already exists")]
    DuplicateCode,

    /// The backend could not be reached.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepositoryError {
    /// Connectivity failures become [`RepositoryError::Unavailable`]; anything
    /// the database itself reported stays [`RepositoryError::Database`].
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => RepositoryError::Unavailable(e.to_string()),
            e => RepositoryError::Database(e),
        }
    }
}

/// Durable storage for short URLs, keyed by short code.
///
/// This is the single source of truth for both the code → URL mapping and the
/// access count. Implementations must enforce short-code uniqueness at the
/// storage level and report violations as [`RepositoryError::DuplicateCode`].
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL
/// - [`crate::infrastructure::persistence::MemoryLinkRepository`] - in-process map
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Inserts a new record with `access_count = 0`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::DuplicateCode`] if the code is taken.
    async fn create(&self, new_url: NewShortUrl) -> Result<ShortUrl, RepositoryError>;

    /// Finds a record by its short code.
    async fn find_by_code(&self, code: &str) -> Result<Option<ShortUrl>, RepositoryError>;

    /// Replaces the target URL and bumps `updated_at`.
    ///
    /// `access_count` and `created_at` are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if no record matches.
    async fn update_url(&self, code: &str, original_url: &str)
    -> Result<ShortUrl, RepositoryError>;

    /// Removes a record.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if no record matches.
    async fn delete_by_code(&self, code: &str) -> Result<(), RepositoryError>;

    /// Adds one to `access_count` relative to the stored value.
    ///
    /// Must be a single conditional update, never read-modify-write from the
    /// caller, so concurrent increments are not lost. `updated_at` is not
    /// touched.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if no record matches.
    async fn increment_access_count(&self, code: &str) -> Result<(), RepositoryError>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_errors_are_unavailable() {
        for e in [
            sqlx::Error::PoolTimedOut,
            sqlx::Error::PoolClosed,
            sqlx::Error::Io(std::io::Error::from(std::io::ErrorKind::ConnectionRefused)),
        ] {
            assert!(matches!(
                RepositoryError::from(e),
                RepositoryError::Unavailable(_)
            ));
        }
    }

    #[test]
    fn test_query_errors_stay_database() {
        assert!(matches!(
            RepositoryError::from(sqlx::Error::RowNotFound),
            RepositoryError::Database(_)
        ));
        assert!(matches!(
            RepositoryError::from(sqlx::Error::ColumnNotFound("id".to_string())),
            RepositoryError::Database(_)
        ));
    }
}
