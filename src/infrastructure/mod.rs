//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer, providing
//! concrete implementations for data persistence and caching.
//!
//! # Modules
//!
//! - [`cache`] - Cache-aside tier (Redis, in-memory and no-op implementations)
//! - [`database`] - Pool construction with bounded startup retries
//! - [`persistence`] - Durable repository implementations

pub mod cache;
pub mod database;
pub mod persistence;
