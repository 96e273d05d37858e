//! Target URL validation.
//!
//! Rejects malformed input, non-HTTP(S) schemes, embedded script payloads and
//! oversized URLs before anything touches the cache or durable storage.

use url::Url;

/// Longest accepted target URL, in bytes.
pub const MAX_URL_LENGTH: usize = 2048;

/// Markers that are never allowed anywhere in a target URL.
const DANGEROUS_MARKERS: &[&str] = &[
    "javascript:",
    "data:",
    "vbscript:",
    "file:",
    "about:",
    "<script",
    "</script>",
];

/// Errors produced by [`validate_url`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UrlValidationError {
    #[error("URL is required")]
    Empty,

    #[error("URL length exceeds maximum allowed length of {MAX_URL_LENGTH} characters")]
    TooLong,

    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("URL must use HTTP or HTTPS scheme")]
    UnsupportedScheme,

    #[error("URL must contain a valid host")]
    MissingHost,

    #[error("URL contains potentially malicious content")]
    Dangerous,
}

/// Validates a target URL and returns it trimmed.
///
/// The URL is stored as submitted (after trimming) so that a resolve returns
/// exactly what the caller created.
///
/// # Errors
///
/// See [`UrlValidationError`] for the individual rejection reasons.
///
/// # Examples
///
/// ```ignore
/// assert!(validate_url("https://example.com/page").is_ok());
/// assert_eq!(validate_url("javascript:alert(1)"), Err(UrlValidationError::UnsupportedScheme));
/// ```
pub fn validate_url(input: &str) -> Result<String, UrlValidationError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlValidationError::Empty);
    }

    if trimmed.len() > MAX_URL_LENGTH {
        return Err(UrlValidationError::TooLong);
    }

    let url = Url::parse(trimmed).map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlValidationError::UnsupportedScheme);
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    let lowered = trimmed.to_ascii_lowercase();
    if DANGEROUS_MARKERS.iter().any(|m| lowered.contains(m)) {
        return Err(UrlValidationError::Dangerous);
    }

    Ok(trimmed.to_string())
}
