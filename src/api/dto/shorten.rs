//! DTO for the shorten endpoint.

use serde::Deserialize;
use validator::Validate;

/// Request body for `POST /api/shorten`.
///
/// Only the length is checked here; scheme, host and content rules are
/// enforced by [`crate::utils::url_validator::validate_url`].
#[derive(Debug, Deserialize, Validate)]
pub struct ShortenRequest {
    #[validate(length(min = 1, max = 2048, message = "URL must be 1 to 2048 characters"))]
    pub url: String,
}
