//! Bearer-token identity adapter for the `/api` routes.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::error::AppError;
use serde_json::json;

/// The caller on whose behalf an `/api` request runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    /// `None` for anonymous callers.
    pub owner_id: Option<String>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn owner(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: Some(owner_id.into()),
        }
    }
}

/// Maps a bearer token to an [`Identity`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns false when callers may proceed without a token.
    fn requires_token(&self) -> bool;

    /// Resolves a raw bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unauthorized`] for unknown tokens.
    async fn verify(&self, token: &str) -> Result<Identity, AppError>;
}

/// Identity provider over a fixed set of `owner:token` pairs.
///
/// Only SHA-256 digests of the tokens are kept in memory. With no pairs
/// configured every caller is anonymous.
#[derive(Debug, Default)]
pub struct StaticTokenProvider {
    owners_by_digest: HashMap<String, String>,
}

impl StaticTokenProvider {
    pub fn new<I, O, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (O, T)>,
        O: Into<String>,
        T: AsRef<str>,
    {
        let owners_by_digest = pairs
            .into_iter()
            .map(|(owner, token)| (digest(token.as_ref()), owner.into()))
            .collect();

        Self { owners_by_digest }
    }

    pub fn open() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.owners_by_digest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners_by_digest.is_empty()
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenProvider {
    fn requires_token(&self) -> bool {
        !self.is_empty()
    }

    async fn verify(&self, token: &str) -> Result<Identity, AppError> {
        if self.is_empty() {
            return Ok(Identity::anonymous());
        }

        self.owners_by_digest
            .get(&digest(token))
            .map(|owner| Identity::owner(owner.clone()))
            .ok_or_else(|| {
                AppError::unauthorized("Unauthorized", json!({"reason": "Invalid token"}))
            })
    }
}

/// Lowercase hex SHA-256 of a raw token.
fn digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Generates a random 32-byte token, hex encoded.
///
/// # Errors
///
/// Fails only if the operating system's random source is unavailable.
pub fn generate_token() -> Result<String, getrandom::Error> {
    let mut bytes = [0u8; 32];
    getrandom::fill(&mut bytes)?;
    Ok(hex::encode(bytes))
}
