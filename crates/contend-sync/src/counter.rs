// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Monotonic counters.
//!
//! `AtomicCounter` is the correct one: a single `fetch_add` per increment.
//! `RacyCounter` splits the increment into a load and a store, so concurrent
//! callers overwrite each other. It stays free of undefined behaviour (both
//! steps are atomic on their own) but the read-modify-write is not.

use crate::sync::{AtomicU64, Ordering};

/// Concurrency-safe monotonically incrementing counter.
#[derive(Debug)]
pub struct AtomicCounter {
    value: AtomicU64,
}

impl AtomicCounter {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    /// Atomically add 1. Returns the value after this increment.
    ///
    /// Release ordering pairs with the Acquire in `read()`, so a reader that
    /// observes this increment also observes everything before it.
    pub fn increment(&self) -> u64 {
        self.value.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Current value.
    pub fn read(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }
}

impl Default for AtomicCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter whose increment is a separate load and store.
#[derive(Debug)]
pub struct RacyCounter {
    value: AtomicU64,
}

impl RacyCounter {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn increment(&self) {
        let seen = self.value.load(Ordering::Relaxed);
        self.value.store(seen + 1, Ordering::Relaxed);
    }

    pub fn read(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Default for RacyCounter {
    fn default() -> Self {
        Self::new()
    }
}
