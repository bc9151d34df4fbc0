// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `contend ledger`: many buyers race for limited stock.

use std::time::Duration;

use tracing::{debug, info};

use contend_sync::{LedgerConfig, LedgerStats, RaceWindow, ResourceLedger};

use super::{stampede, CliError};
use crate::output;

#[derive(Debug, Clone, Copy)]
pub struct LedgerArgs {
    pub stock: i64,
    pub buyers: usize,
    pub trials: usize,
    pub unsafe_path: bool,
    /// Sleep between check and act on the unsafe path. `None` yields.
    pub window: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trial {
    pub sold: u64,
    pub final_stock: i64,
}

#[derive(Debug, Clone)]
pub struct LedgerReport {
    pub args: LedgerArgs,
    pub trials: Vec<Trial>,
    /// Pause the ledgers used between check and act.
    pub window: RaceWindow,
    /// Bookkeeping from the last trial.
    pub last_stats: LedgerStats,
}

impl LedgerReport {
    /// Most sales a correct ledger can make.
    pub fn allowed(&self) -> u64 {
        (self.args.buyers as u64).min(self.args.stock.max(0) as u64)
    }

    /// Trials that sold more than allowed or pushed stock below its floor.
    pub fn oversold_trials(&self) -> usize {
        let floor = self.args.stock.min(0);
        self.trials
            .iter()
            .filter(|t| t.sold > self.allowed() || t.final_stock < floor)
            .count()
    }

    pub fn worst_stock(&self) -> i64 {
        self.trials
            .iter()
            .map(|t| t.final_stock)
            .min()
            .unwrap_or(self.args.stock)
    }
}

pub fn run(args: LedgerArgs) -> Result<LedgerReport, CliError> {
    let requested = match args.window {
        Some(d) if !d.is_zero() => RaceWindow::Sleep(d),
        Some(_) => RaceWindow::None,
        None => RaceWindow::Yield,
    };
    let config = LedgerConfig::new(args.stock).with_race_window(requested);

    let mut trials = Vec::with_capacity(args.trials);
    let mut last_stats = LedgerStats::default();
    for trial in 0..args.trials {
        let ledger = ResourceLedger::with_config(config);
        stampede("buyer", args.buyers, |_| {
            if args.unsafe_path {
                ledger.sell_unsafe();
            } else {
                ledger.sell_safe();
            }
        })?;
        let stats = ledger.stats();
        let t = Trial {
            sold: stats.sold,
            final_stock: ledger.current_stock(),
        };
        debug!(
            trial,
            window = ?ledger.config().race_window,
            sold = t.sold,
            final_stock = t.final_stock,
            "ledger trial"
        );
        trials.push(t);
        last_stats = stats;
    }

    let report = LedgerReport {
        args,
        trials,
        window: config.race_window,
        last_stats,
    };
    info!(
        trials = args.trials,
        oversold = report.oversold_trials(),
        "ledger run finished"
    );
    Ok(report)
}

pub fn print(report: &LedgerReport) {
    let path = if report.args.unsafe_path {
        "unsafe sell (check then act)"
    } else {
        "safe sell (compare-and-swap)"
    };
    println!("{}", output::section_header(path));
    println!("{}", output::separator(40));
    println!("{} {}", output::label("stock"), report.args.stock);
    println!("{} {}", output::label("buyers"), report.args.buyers);
    println!("{} {}", output::label("trials"), report.trials.len());
    if report.args.unsafe_path {
        let window = match report.window {
            RaceWindow::None => "none".to_string(),
            RaceWindow::Yield => "yield".to_string(),
            RaceWindow::Sleep(d) => format!("{}us", d.as_micros()),
        };
        println!("{} {}", output::label("race window"), window);
    }
    println!();

    for (i, t) in report.trials.iter().enumerate() {
        println!(
            "  trial {:<3} sold {:>6}  stock {:>6}",
            i + 1,
            output::checked_count(t.sold, report.allowed()),
            t.final_stock
        );
    }
    println!();

    let stats = &report.last_stats;
    println!("{} {}", output::label("rejected"), stats.rejected);
    println!("{} {}", output::label("cas retries"), stats.cas_retries);
    println!(
        "{} {}",
        output::label("oversold"),
        output::hazard_count(report.oversold_trials() as u64)
    );
    println!(
        "{}",
        output::verdict(
            report.oversold_trials() == 0,
            "stock never oversold",
            &format!("oversold, stock reached {}", report.worst_stock()),
        )
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(stock: i64, buyers: usize, unsafe_path: bool) -> LedgerArgs {
        LedgerArgs {
            stock,
            buyers,
            trials: 3,
            unsafe_path,
            window: None,
        }
    }

    #[test]
    fn safe_path_sells_min_of_buyers_and_stock() {
        let r = run(args(10, 64, false)).unwrap();
        assert_eq!(r.allowed(), 10);
        assert_eq!(r.oversold_trials(), 0);
        for t in &r.trials {
            assert_eq!(t.sold, 10);
            assert_eq!(t.final_stock, 0);
        }
        assert_eq!(r.last_stats.rejected, 54);
    }

    #[test]
    fn surplus_stock_serves_every_buyer() {
        let r = run(args(100, 8, true)).unwrap();
        assert_eq!(r.allowed(), 8);
        for t in &r.trials {
            assert_eq!(t.sold, 8);
            assert_eq!(t.final_stock, 92);
        }
    }

    #[test]
    fn negative_stock_allows_nothing() {
        let r = run(args(-3, 4, false)).unwrap();
        assert_eq!(r.allowed(), 0);
        assert_eq!(r.worst_stock(), -3);
        assert_eq!(r.oversold_trials(), 0);
        assert!(r.trials.iter().all(|t| t.sold == 0));
    }

    #[test]
    fn zero_window_maps_to_no_pause() {
        let mut a = args(5, 4, true);
        a.window = Some(Duration::ZERO);
        let r = run(a).unwrap();
        assert_eq!(r.trials.len(), 3);
        assert_eq!(r.window, RaceWindow::None);
    }

    #[test]
    fn window_maps_to_sleep() {
        let mut a = args(5, 4, true);
        a.window = Some(Duration::from_micros(200));
        let r = run(a).unwrap();
        assert_eq!(r.window, RaceWindow::Sleep(Duration::from_micros(200)));
        assert_eq!(run(args(5, 4, true)).unwrap().window, RaceWindow::Yield);
    }
}
