//! Asynchronous access accounting.
//!
//! Resolves hand an [`AccessEvent`] to a bounded queue and never wait for it.
//! A single worker task drains the queue and applies durable increments with
//! bounded concurrency.
//!
//! Delivery is at-most-once and best-effort: a full queue drops the event, a
//! failed increment is logged and not retried, and events still queued when
//! the process dies are lost.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use crate::domain::access_event::AccessEvent;
use crate::domain::repositories::{LinkRepository, RepositoryError};
use crate::error::AppError;
use crate::infrastructure::cache::CacheService;
use serde_json::json;

/// Sending half of the accounting queue.
///
/// Cheap to clone; every clone feeds the same worker.
#[derive(Clone)]
pub struct AccessRecorder {
    tx: mpsc::Sender<AccessEvent>,
}

impl AccessRecorder {
    /// Wraps an existing sender. The receiver must be driven by
    /// [`run_access_worker`] or drained by a test.
    pub fn new(tx: mpsc::Sender<AccessEvent>) -> Self {
        Self { tx }
    }

    /// Creates the queue and spawns the worker on the current runtime.
    ///
    /// # Arguments
    ///
    /// - `capacity` - queue length; events beyond it are dropped
    /// - `concurrency` - maximum increments in flight
    pub fn spawn(
        repository: Arc<dyn LinkRepository>,
        cache: Arc<dyn CacheService>,
        capacity: usize,
        concurrency: usize,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = tokio::spawn(run_access_worker(rx, repository, cache, concurrency));
        (Self::new(tx), handle)
    }

    /// Enqueues one access of `code` without waiting.
    ///
    /// Returns `false` if the event was dropped because the queue is full or
    /// the worker has stopped.
    pub fn record(&self, code: &str) -> bool {
        match self.tx.try_send(AccessEvent::hit(code)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(code, "Access queue full, dropping access event");
                metrics::counter!("accesses_dropped_total", "reason" => "queue_full").increment(1);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(code, "Access queue closed, dropping access event");
                metrics::counter!("accesses_dropped_total", "reason" => "closed").increment(1);
                false
            }
        }
    }

    /// Waits until every event enqueued before this call has been applied.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ServiceUnavailable`] if the worker has stopped.
    pub async fn flush(&self) -> Result<(), AppError> {
        let (ack, done) = oneshot::channel();
        let stopped = || AppError::unavailable("Access worker stopped", json!({}));

        self.tx
            .send(AccessEvent::Flush { ack })
            .await
            .map_err(|_| stopped())?;
        done.await.map_err(|_| stopped())
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Free slots in the queue.
    pub fn capacity(&self) -> usize {
        self.tx.capacity()
    }

    pub fn max_capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

/// Drains the accounting queue until every sender is dropped.
///
/// Each hit becomes one `increment_access_count` on durable storage. After a
/// successful increment the cache's presentation counter is bumped; that
/// counter is never read back into durable storage.
pub async fn run_access_worker(
    mut rx: mpsc::Receiver<AccessEvent>,
    repository: Arc<dyn LinkRepository>,
    cache: Arc<dyn CacheService>,
    concurrency: usize,
) {
    let concurrency = concurrency.max(1);
    let mut in_flight = JoinSet::new();

    while let Some(event) = rx.recv().await {
        match event {
            AccessEvent::Hit { code } => {
                while in_flight.len() >= concurrency {
                    in_flight.join_next().await;
                }

                let repository = repository.clone();
                let cache = cache.clone();
                in_flight.spawn(async move {
                    apply_hit(repository.as_ref(), cache.as_ref(), &code).await;
                });
            }
            AccessEvent::Flush { ack } => {
                while in_flight.join_next().await.is_some() {}
                let _ = ack.send(());
            }
        }
    }

    while in_flight.join_next().await.is_some() {}
    debug!("Access worker stopped");
}

async fn apply_hit(repository: &dyn LinkRepository, cache: &dyn CacheService, code: &str) {
    match repository.increment_access_count(code).await {
        Ok(()) => {
            metrics::counter!("accesses_recorded_total").increment(1);

            if let Err(e) = cache.increment_counter(code).await {
                debug!(code, error = %e, "Failed to bump cached access counter");
            }
        }
        Err(RepositoryError::NotFound) => {
            // Deleted between resolve and accounting.
            debug!(code, "Access for missing short code ignored");
        }
        Err(e) => {
            metrics::counter!("accesses_failed_total").increment(1);
            warn!(code, error = %e, "Failed to record access");
        }
    }
}
