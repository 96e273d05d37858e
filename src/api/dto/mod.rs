//! Request and response bodies for the HTTP API.
//!
//! Records are returned as [`crate::domain::entities::ShortUrl`] directly.

pub mod health;
pub mod shorten;
pub mod update_link;
