//! Domain layer: entities, storage contracts and access accounting.
//!
//! Nothing here depends on HTTP. Repository traits are implemented in
//! [`crate::infrastructure::persistence`].
//!
//! # Access accounting flow
//!
//! 1. A resolve succeeds in [`crate::application::services::LinkService`]
//! 2. [`access_worker::AccessRecorder::record`] enqueues an [`access_event::AccessEvent`]
//! 3. [`access_worker::run_access_worker`] applies the durable increment

pub mod access_event;
pub mod access_worker;
pub mod entities;
pub mod repositories;
