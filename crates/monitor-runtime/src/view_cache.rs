//! Single-value time-to-live cache for the read views.
//!
//! Each cache holds at most one computed value plus the instant it expires.
//! A hit returns the stored value untouched; a miss recomputes, stores the new
//! value with a fresh expiry and returns it. Concurrent callers during a miss
//! serialize on the inner lock and share one recomputation.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
struct Entry<T> {
    value: Arc<T>,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct TtlCache<T> {
    ttl: Duration,
    entry: Mutex<Option<Entry<T>>>,
}

impl<T> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached value, or compute and store it when absent or expired.
    pub fn get_or_compute(&self, compute: impl FnOnce() -> T) -> Arc<T> {
        let mut entry = self.entry.lock();
        let now = Instant::now();

        if let Some(cached) = entry.as_ref() {
            if now < cached.expires_at {
                return cached.value.clone();
            }
        }

        let value = Arc::new(compute());
        *entry = Some(Entry {
            value: value.clone(),
            expires_at: now + self.ttl,
        });
        value
    }

    /// Drop the stored value so the next access recomputes.
    pub fn invalidate(&self) {
        *self.entry.lock() = None;
    }

    /// `true` while a value is stored and not yet expired.
    pub fn is_fresh(&self) -> bool {
        self.entry
            .lock()
            .as_ref()
            .is_some_and(|cached| Instant::now() < cached.expires_at)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
