// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Shared registers mutated under contention.
//!
//! Each register is owned by exactly one object. Nothing here is a
//! process-wide static: build one per test or run and share it by
//! reference (scoped threads) or `Arc`.
//!
//! Components:
//! - counter: `AtomicCounter` (safe) and `RacyCounter` (lost updates)
//! - ledger: `ResourceLedger`: stock with unsafe and CAS sell paths
//! - config: ledger construction parameters

pub mod config;
pub mod counter;
pub mod ledger;

mod sync;

pub use config::{LedgerConfig, RaceWindow};
pub use counter::{AtomicCounter, RacyCounter};
pub use ledger::{LedgerStats, ResourceLedger, SaleOutcome};
