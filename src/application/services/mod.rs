//! Business logic services for the application layer.

pub mod identity;
pub mod link_service;
pub mod rate_limiter;

pub use identity::{Identity, IdentityProvider, StaticTokenProvider};
pub use link_service::{LinkService, LinkSettings};
pub use rate_limiter::{Decision, RateLimiter};
