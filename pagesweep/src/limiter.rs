//! Counting permit pool shared by every fetch of a sweep.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Default)]
struct Gauge {
    in_flight: AtomicUsize,
    high_water: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Bounds the number of fetches in progress at once.
///
/// Waiters are served in arrival order. Closing the limiter wakes every
/// waiter with `None`, which is how a cancelled sweep stops queued pages.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    gauge: Arc<Gauge>,
}

impl ConcurrencyLimiter {
    /// Creates a pool of `capacity` permits.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            gauge: Arc::new(Gauge::default()),
        }
    }

    /// Waits for a permit. Returns `None` once the limiter is closed.
    pub async fn acquire(&self) -> Option<Permit> {
        let permit = Arc::clone(&self.semaphore).acquire_owned().await.ok()?;
        self.gauge.enter();
        Some(Permit {
            _permit: permit,
            gauge: Arc::clone(&self.gauge),
        })
    }

    /// Closes the pool; pending and future `acquire` calls return `None`.
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Whether the pool has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    /// Pool size.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently handed out.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.gauge.in_flight.load(Ordering::SeqCst)
    }

    /// Most permits ever held at the same time.
    #[must_use]
    pub fn high_water_mark(&self) -> usize {
        self.gauge.high_water.load(Ordering::SeqCst)
    }
}

/// A held slot in a [`ConcurrencyLimiter`]. Dropping it releases the slot.
#[derive(Debug)]
pub struct Permit {
    _permit: OwnedSemaphorePermit,
    gauge: Arc<Gauge>,
}

impl Permit {
    /// Releases the slot explicitly.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.gauge.leave();
    }
}
