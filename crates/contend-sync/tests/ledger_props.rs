// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Property tests for the CAS sell path.

#![cfg(not(loom))]

use std::thread;

use contend_sync::{LedgerConfig, ResourceLedger, SaleOutcome};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn cas_sales_conserve_stock(stock in 0i64..200, threads in 1usize..8, per_thread in 0usize..60) {
        let ledger = ResourceLedger::new(stock);
        let wins: usize = thread::scope(|s| {
            let handles: Vec<_> = (0..threads)
                .map(|_| s.spawn(|| (0..per_thread).filter(|_| ledger.sell_safe()).count()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });
        let attempts = (threads * per_thread) as i64;
        prop_assert_eq!(wins as i64, stock.min(attempts));
        prop_assert_eq!(ledger.current_stock(), (stock - attempts).max(0));
        prop_assert_eq!(ledger.stats().sold as usize, wins);
    }

    #[test]
    fn capped_retries_never_go_negative(stock in 0i64..50, cap in 0u32..4) {
        let ledger = ResourceLedger::with_config(LedgerConfig::new(stock).with_max_retries(cap));
        let outcomes: Vec<SaleOutcome> = thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| (0..20).map(|_| ledger.try_sell()).collect::<Vec<_>>()))
                .collect();
            handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
        });
        let sold = outcomes.iter().filter(|o| **o == SaleOutcome::Sold).count() as i64;
        prop_assert!(ledger.current_stock() >= 0);
        prop_assert!(sold <= stock);
        prop_assert_eq!(ledger.current_stock(), stock - sold);
    }

    #[test]
    fn sequential_unsafe_matches_safe(stock in -5i64..30, attempts in 0usize..40) {
        let unsafe_ledger = ResourceLedger::new(stock);
        let safe_ledger = ResourceLedger::new(stock);
        for _ in 0..attempts {
            prop_assert_eq!(unsafe_ledger.sell_unsafe(), safe_ledger.sell_safe());
        }
        prop_assert_eq!(unsafe_ledger.current_stock(), safe_ledger.current_stock());
    }
}
