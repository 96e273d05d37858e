//! In-process cache with per-entry expiry.

use super::service::{CacheResult, CacheService, CachedLink};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Counter lifetime when none is configured.
const DEFAULT_COUNTER_TTL: Duration = Duration::from_secs(3600);

/// Every this many writes, expired entries and counters are swept.
const SWEEP_EVERY: u64 = 1024;

/// `None` never expires: the deadline does not fit in an `Instant`.
fn deadline(now: Instant, ttl: Duration) -> Option<Instant> {
    now.checked_add(ttl)
}

fn is_live(expires_at: Option<Instant>, now: Instant) -> bool {
    expires_at.is_none_or(|at| at > now)
}

struct Slot {
    entry: CachedLink,
    expires_at: Option<Instant>,
}

struct Counter {
    value: i64,
    expires_at: Option<Instant>,
}

/// A cache held in process memory.
///
/// Suitable for single-instance deployments and tests. Expired entries are
/// dropped on lookup and by a periodic sweep. Counters live for
/// `counter_ttl` after their last increment, like their Redis counterparts,
/// and vanish on restart.
pub struct MemoryCache {
    entries: DashMap<String, Slot>,
    counters: DashMap<String, Counter>,
    counter_ttl: Duration,
    writes: AtomicU64,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
            counters: DashMap::new(),
            counter_ttl: DEFAULT_COUNTER_TTL,
            writes: AtomicU64::new(0),
        }
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        debug!("Using MemoryCache");
        Self::default()
    }

    pub fn with_counter_ttl(mut self, counter_ttl: Duration) -> Self {
        self.counter_ttl = counter_ttl;
        self
    }

    /// Number of stored entries, including ones that expired but were not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of tracked counters, including expired ones not yet swept.
    pub fn counter_count(&self) -> usize {
        self.counters.len()
    }

    /// Drops every expired entry and counter.
    pub fn sweep(&self) {
        let now = Instant::now();
        self.entries.retain(|_, slot| is_live(slot.expires_at, now));
        self.counters.retain(|_, counter| is_live(counter.expires_at, now));
    }

    fn note_write(&self) {
        if self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.sweep();
        }
    }
}

#[async_trait]
impl CacheService for MemoryCache {
    async fn lookup(&self, short_code: &str) -> CacheResult<Option<CachedLink>> {
        let now = Instant::now();

        if let Some(slot) = self.entries.get(short_code) {
            if is_live(slot.expires_at, now) {
                return Ok(Some(slot.entry.clone()));
            }
        } else {
            return Ok(None);
        }

        // Only evict if the slot is still the expired one we saw.
        self.entries
            .remove_if(short_code, |_, slot| !is_live(slot.expires_at, now));
        Ok(None)
    }

    async fn put(&self, entry: &CachedLink, ttl: Duration) -> CacheResult<()> {
        self.entries.insert(
            entry.short_code.clone(),
            Slot {
                entry: entry.clone(),
                expires_at: deadline(Instant::now(), ttl),
            },
        );
        self.note_write();
        Ok(())
    }

    async fn invalidate(&self, short_code: &str) -> CacheResult<()> {
        self.entries.remove(short_code);
        Ok(())
    }

    async fn increment_counter(&self, short_code: &str) -> CacheResult<i64> {
        let now = Instant::now();
        let value = {
            let mut counter = self
                .counters
                .entry(short_code.to_string())
                .or_insert(Counter {
                    value: 0,
                    expires_at: None,
                });
            if !is_live(counter.expires_at, now) {
                counter.value = 0;
            }
            counter.value += 1;
            counter.expires_at = deadline(now, self.counter_ttl);
            counter.value
        };
        self.note_write();
        Ok(value)
    }

    async fn read_counter(&self, short_code: &str) -> CacheResult<Option<i64>> {
        let now = Instant::now();
        Ok(self
            .counters
            .get(short_code)
            .filter(|c| is_live(c.expires_at, now))
            .map(|c| c.value))
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
