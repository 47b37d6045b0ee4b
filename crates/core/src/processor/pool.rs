//! Bounded, cancellable permit pools.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use super::types::PoolStatus;
use crate::metrics;

/// Acquisition was abandoned because the run was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Pool acquisition cancelled")]
pub struct Cancelled;

/// Tracks statistics for a pool.
#[derive(Default)]
struct PoolStats {
    active: AtomicU64,
    queued: AtomicU64,
    total_acquired: AtomicU64,
    total_cancelled: AtomicU64,
}

/// Fixed-capacity set of interchangeable permits.
///
/// Capacity never changes; resizing means building a new pool.
pub struct ResourcePool {
    name: &'static str,
    capacity: usize,
    semaphore: Arc<Semaphore>,
    stats: Arc<PoolStats>,
}

/// A held pool slot. Dropping it releases the slot.
pub struct PoolPermit {
    _permit: OwnedSemaphorePermit,
    stats: Arc<PoolStats>,
}

impl Drop for PoolPermit {
    fn drop(&mut self) {
        self.stats.active.fetch_sub(1, Ordering::Relaxed);
    }
}

impl PoolPermit {
    /// Returns the slot to the pool.
    pub fn release(self) {}
}

impl ResourcePool {
    /// Creates a pool with `capacity` permits (at least one).
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            name,
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity)),
            stats: Arc::new(PoolStats::default()),
        }
    }

    /// Pool name used in logs and status.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of permits.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Waits for a free permit or for `cancel` to fire.
    ///
    /// Cancellation wins when both are ready.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<PoolPermit, Cancelled> {
        if cancel.is_cancelled() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            return Err(Cancelled);
        }

        self.stats.queued.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();

        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            permit = Arc::clone(&self.semaphore).acquire_owned() => permit.ok(),
        };

        self.stats.queued.fetch_sub(1, Ordering::Relaxed);

        match permit {
            Some(permit) => {
                self.stats.active.fetch_add(1, Ordering::Relaxed);
                self.stats.total_acquired.fetch_add(1, Ordering::Relaxed);
                metrics::POOL_WAIT_DURATION
                    .with_label_values(&[self.name])
                    .observe(started.elapsed().as_secs_f64());
                Ok(PoolPermit {
                    _permit: permit,
                    stats: Arc::clone(&self.stats),
                })
            }
            None => {
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                Err(Cancelled)
            }
        }
    }

    /// Current usage figures.
    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            name: self.name.to_string(),
            active: self.stats.active.load(Ordering::Relaxed) as usize,
            capacity: self.capacity,
            queued: self.stats.queued.load(Ordering::Relaxed) as usize,
            total_acquired: self.stats.total_acquired.load(Ordering::Relaxed),
            total_cancelled: self.stats.total_cancelled.load(Ordering::Relaxed),
        }
    }
}
