//! Tracing subscriber setup.

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber.
///
/// `level` is an `EnvFilter` directive string such as `info` or
/// `link_relay=debug,tower_http=info`. `format` is `json` for one JSON object
/// per line; anything else gives human-readable text.
///
/// # Errors
///
/// Fails if the filter does not parse or a global subscriber is already set.
pub fn init(level: &str, format: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true);

    let installed = if format == "json" {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| anyhow!("Failed to install tracing subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_is_rejected() {
        assert!(init("link_relay=notalevel", "text").is_err());
    }
}
