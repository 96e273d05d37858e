//! Core domain entities.
//!
//! - [`ShortUrl`] - A stored code → target mapping with its access count
//! - [`NewShortUrl`] - Input for creating a record
//!
//! Entities are plain data; ordering and caching decisions live in
//! [`crate::application::services::LinkService`].

pub mod short_url;

pub use short_url::{NewShortUrl, ShortUrl};
