//! Short URL entity representing a code → target mapping.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A stored short URL with its access accounting.
///
/// `access_count` is authoritative only when read from durable storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ShortUrl {
    pub id: i64,
    pub short_code: String,
    pub original_url: String,
    pub access_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

impl ShortUrl {
    /// Creates a new ShortUrl instance.
    pub fn new(
        id: i64,
        short_code: String,
        original_url: String,
        access_count: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        owner_id: Option<String>,
    ) -> Self {
        Self {
            id,
            short_code,
            original_url,
            access_count,
            created_at,
            updated_at,
            owner_id,
        }
    }
}

/// Input data for creating a new short URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewShortUrl {
    pub short_code: String,
    pub original_url: String,
    pub owner_id: Option<String>,
}
