// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Stock ledger with two sell paths over one register.
//!
//! `sell_unsafe` checks then acts in two steps and oversells under
//! contention. `sell_safe` is a compare-and-swap loop: stock never drops
//! below zero and successful sales never exceed what was stocked.
//!
//! Neither path takes a lock. Out of stock is an outcome, not an error.

use tracing::trace;

use crate::config::{LedgerConfig, RaceWindow};
use crate::sync::{self, AtomicI64, AtomicU64, Ordering};

/// Result of a single CAS sale attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleOutcome {
    Sold,
    /// Stock was observed at or below zero.
    OutOfStock,
    /// The configured retry cap ran out before the CAS landed.
    Contended,
}

/// Point-in-time copy of the ledger's bookkeeping counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerStats {
    pub sold: u64,
    pub rejected: u64,
    pub abandoned: u64,
    pub cas_retries: u64,
}

/// Bounded stock register with an unsafe and a safe decrement path.
#[derive(Debug)]
pub struct ResourceLedger {
    stock: AtomicI64,
    config: LedgerConfig,
    sold: AtomicU64,
    rejected: AtomicU64,
    abandoned: AtomicU64,
    cas_retries: AtomicU64,
}

impl ResourceLedger {
    /// Ledger starting at `initial_stock` with default settings.
    pub fn new(initial_stock: i64) -> Self {
        Self::with_config(LedgerConfig::new(initial_stock))
    }

    pub fn with_config(config: LedgerConfig) -> Self {
        Self {
            stock: AtomicI64::new(config.initial_stock),
            config,
            sold: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            abandoned: AtomicU64::new(0),
            cas_retries: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Check-then-act sale. NOT atomic.
    ///
    /// Two callers can both see a positive stock and both decrement, which
    /// drives the register negative. This path exists to reproduce that race.
    pub fn sell_unsafe(&self) -> bool {
        let seen = self.stock.load(Ordering::Acquire);
        if seen <= 0 {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        match self.config.race_window {
            RaceWindow::None => {}
            RaceWindow::Yield => sync::yield_now(),
            RaceWindow::Sleep(d) => sync::sleep(d),
        }

        // Decrement whatever is there now, not what was checked.
        self.stock.fetch_sub(1, Ordering::AcqRel);
        self.sold.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// CAS-loop sale. Returns `false` only when stock is exhausted (or the
    /// optional retry cap runs out).
    pub fn sell_safe(&self) -> bool {
        self.try_sell() == SaleOutcome::Sold
    }

    /// CAS-loop sale reporting why it failed.
    ///
    /// Every failed CAS means another caller's CAS succeeded, so the system
    /// as a whole always makes progress. A single caller has no retry bound
    /// unless `max_retries` is configured.
    pub fn try_sell(&self) -> SaleOutcome {
        let mut retries: u32 = 0;
        let mut current = self.stock.load(Ordering::Acquire);

        loop {
            if current <= 0 {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                return SaleOutcome::OutOfStock;
            }

            match self.stock.compare_exchange(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.sold.fetch_add(1, Ordering::Relaxed);
                    return SaleOutcome::Sold;
                }
                Err(actual) => {
                    self.cas_retries.fetch_add(1, Ordering::Relaxed);
                    if let Some(cap) = self.config.max_retries {
                        if retries >= cap {
                            trace!(retries, "sale abandoned after retry cap");
                            self.abandoned.fetch_add(1, Ordering::Relaxed);
                            return SaleOutcome::Contended;
                        }
                    }
                    retries += 1;
                    // The failed CAS already reported the fresh value.
                    current = actual;
                }
            }
        }
    }

    /// Add `units` to the stock. Returns the new stock, or `None` with
    /// nothing written if the register would overflow.
    pub fn restock(&self, units: u32) -> Option<i64> {
        let units = i64::from(units);
        self.stock
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| s.checked_add(units))
            .ok()
            .map(|prev| prev + units)
    }

    pub fn current_stock(&self) -> i64 {
        self.stock.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            sold: self.sold.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            cas_retries: self.cas_retries.load(Ordering::Relaxed),
        }
    }
}
