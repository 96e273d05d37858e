//! Repository trait definitions for the domain layer.
//!
//! Traits define the storage contract; implementations live in
//! `crate::infrastructure::persistence`, and `mockall` generates mocks for
//! unit tests.
//!
//! # Testing
//!
//! See `tests/repository_link.rs` for the PostgreSQL contract tests.

pub mod link_repository;

pub use link_repository::{LinkRepository, RepositoryError};

#[cfg(test)]
pub use link_repository::MockLinkRepository;
