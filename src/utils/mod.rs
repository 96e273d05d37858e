//! Utility functions for code generation, URL validation, and request handling.
//!
//! - [`code_generator`] - Cryptographically secure short code generation
//! - [`url_validator`] - Target URL validation and sanitization
//! - [`client_key`] - Rate-limiter key extraction from requests

pub mod client_key;
pub mod code_generator;
pub mod url_validator;
