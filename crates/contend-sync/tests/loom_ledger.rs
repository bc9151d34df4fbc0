// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Exhaustive interleaving checks with loom.
//!
//! Run with: RUSTFLAGS="--cfg loom" cargo test -p contend-sync --test loom_ledger --release
//!
//! Under a normal `cargo test` this file compiles to nothing.

#![cfg(loom)]

use loom::sync::Arc;
use loom::thread;

use contend_sync::{AtomicCounter, LedgerConfig, RaceWindow, RacyCounter, ResourceLedger};

#[test]
fn loom_counter_increments_are_exact() {
    loom::model(|| {
        let counter = Arc::new(AtomicCounter::new());
        let c = counter.clone();
        let h = thread::spawn(move || {
            c.increment();
        });
        counter.increment();
        h.join().unwrap();
        assert_eq!(counter.read(), 2);
    });
}

#[test]
fn loom_racy_counter_can_lose_an_update() {
    let lost = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let seen = lost.clone();
    loom::model(move || {
        let counter = Arc::new(RacyCounter::new());
        let c = counter.clone();
        let h = thread::spawn(move || c.increment());
        counter.increment();
        h.join().unwrap();
        if counter.read() == 1 {
            seen.store(true, std::sync::atomic::Ordering::Relaxed);
        }
    });
    assert!(lost.load(std::sync::atomic::Ordering::Relaxed));
}

#[test]
fn loom_cas_sale_of_last_unit_has_one_winner() {
    loom::model(|| {
        let ledger = Arc::new(ResourceLedger::new(1));
        let l = ledger.clone();
        let h = thread::spawn(move || l.sell_safe());
        let mine = ledger.sell_safe();
        let theirs = h.join().unwrap();
        assert!(mine ^ theirs);
        assert_eq!(ledger.current_stock(), 0);
    });
}

#[test]
fn loom_unsafe_sale_of_last_unit_can_go_negative() {
    let negative = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let seen = negative.clone();
    loom::model(move || {
        let ledger = Arc::new(ResourceLedger::with_config(
            LedgerConfig::new(1).with_race_window(RaceWindow::None),
        ));
        let l = ledger.clone();
        let h = thread::spawn(move || l.sell_unsafe());
        ledger.sell_unsafe();
        h.join().unwrap();
        if ledger.current_stock() < 0 {
            seen.store(true, std::sync::atomic::Ordering::Relaxed);
        }
    });
    assert!(negative.load(std::sync::atomic::Ordering::Relaxed));
}
