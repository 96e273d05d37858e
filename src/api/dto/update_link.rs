//! DTO for the link update endpoint.

use serde::Deserialize;
use validator::Validate;

/// Request body for `PUT /api/shorten/{code}`.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLinkRequest {
    /// New destination. The access count and creation time are kept.
    #[validate(length(min = 1, max = 2048, message = "URL must be 1 to 2048 characters"))]
    pub url: String,
}
