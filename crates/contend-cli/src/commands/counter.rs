// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `contend counter`: hammer a shared counter from many threads.

use tracing::info;

use contend_sync::{AtomicCounter, RacyCounter};

use super::{stampede, CliError};
use crate::output;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterReport {
    pub expected: u64,
    pub observed: u64,
    pub racy: bool,
}

impl CounterReport {
    pub fn lost(&self) -> u64 {
        self.expected.saturating_sub(self.observed)
    }
}

pub fn run(threads: usize, increments: u64, racy: bool) -> Result<CounterReport, CliError> {
    let expected = u64::try_from(threads)
        .ok()
        .and_then(|t| t.checked_mul(increments))
        .ok_or(CliError::CounterOverflow {
            threads,
            increments,
        })?;
    let observed = if racy {
        let counter = RacyCounter::new();
        stampede("counter", threads, |_| {
            for _ in 0..increments {
                counter.increment();
            }
        })?;
        counter.read()
    } else {
        let counter = AtomicCounter::new();
        stampede("counter", threads, |_| {
            for _ in 0..increments {
                counter.increment();
            }
        })?;
        counter.read()
    };

    let report = CounterReport {
        expected,
        observed,
        racy,
    };
    info!(threads, increments, observed, lost = report.lost(), "counter run finished");
    Ok(report)
}

pub fn print(report: &CounterReport) {
    let kind = if report.racy { "racy counter" } else { "atomic counter" };
    println!("{}", output::section_header(kind));
    println!("{}", output::separator(40));
    println!("{} {}", output::label("expected"), report.expected);
    println!(
        "{} {}",
        output::label("observed"),
        output::checked_count(report.observed, report.expected)
    );
    println!("{} {}", output::label("lost updates"), output::hazard_count(report.lost()));
    println!(
        "{}",
        output::verdict(report.lost() == 0, "no updates lost", "updates were lost")
    );
}
