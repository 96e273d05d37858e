//! Application layer services implementing business logic.
//!
//! Services coordinate repository and cache calls, validation and admission
//! control, and give HTTP handlers a narrow API.
//!
//! # Available Services
//!
//! - [`services::link_service::LinkService`] - create, resolve, update, delete and stats
//! - [`services::rate_limiter::RateLimiter`] - per-client token buckets
//! - [`services::identity::StaticTokenProvider`] - bearer token to owner mapping

pub mod services;
