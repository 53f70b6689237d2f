//! Time-based result caching
//!
//! Feature scans over slow-moving inputs (higher-timeframe bars, external
//! feeds) do not need recomputing on every call. [`TtlCache`] holds one
//! value with a time-to-live: within the TTL the cached value is served,
//! after it the fetch runs again. A failed refresh degrades gracefully by
//! serving the stale value, or a caller-supplied neutral fallback if
//! nothing was ever cached.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Time source, swappable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Single-slot cache with a time-to-live.
pub struct TtlCache<T: Clone, C: Clock = SystemClock> {
    ttl: Duration,
    clock: C,
    slot: Mutex<Option<(Instant, T)>>,
}

impl<T: Clone> TtlCache<T> {
    /// Cache with the given TTL and the system clock.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<T: Clone, C: Clock> TtlCache<T, C> {
    /// Cache with an explicit time source.
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            ttl,
            clock,
            slot: Mutex::new(None),
        }
    }

    /// Serve the cached value, refreshing it through `fetch` when the TTL
    /// has elapsed.
    ///
    /// A fetch failure never propagates: the stale value is served if one
    /// exists, otherwise `neutral`. The stale value keeps its original
    /// timestamp, so the next call retries the fetch.
    pub fn get_or_update<E>(
        &self,
        fetch: impl FnOnce() -> std::result::Result<T, E>,
        neutral: T,
    ) -> T {
        let now = self.clock.now();
        // A poisoned lock only means a panic mid-update; the slot itself
        // is still a coherent Option
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());

        if let Some((stored_at, value)) = slot.as_ref() {
            if now.duration_since(*stored_at) < self.ttl {
                return value.clone();
            }
        }

        match fetch() {
            Ok(value) => {
                *slot = Some((now, value.clone()));
                value
            }
            Err(_) => match slot.as_ref() {
                Some((_, stale)) => stale.clone(),
                None => neutral,
            },
        }
    }

    /// Drop the cached value; the next call must fetch.
    pub fn invalidate(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }
}
