// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Report formatting with colors.
//!
//! Respects NO_COLOR and FORCE_COLOR. Colors are dropped when output is
//! piped.

use std::time::Duration;

use colored::{ColoredString, Colorize};

/// Apply color overrides from the environment. Call once at startup.
pub fn init() {
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    } else if std::env::var("FORCE_COLOR").is_ok() {
        colored::control::set_override(true);
    }
}

pub fn error_label() -> ColoredString {
    "error".red().bold()
}

pub fn section_header(header: &str) -> ColoredString {
    header.yellow().bold()
}

pub fn separator(width: usize) -> ColoredString {
    "─".repeat(width).dimmed()
}

pub fn status_pass() -> ColoredString {
    "✓".green()
}

pub fn status_fail() -> ColoredString {
    "✗".red()
}

pub fn label(name: &str) -> ColoredString {
    format!("{:<14}", name).cyan()
}

/// A count that should match `expected`; red when it doesn't.
pub fn checked_count(actual: u64, expected: u64) -> ColoredString {
    let s = actual.to_string();
    if actual == expected {
        s.green()
    } else {
        s.red().bold()
    }
}

/// A quantity that signals trouble when non-zero.
pub fn hazard_count(n: u64) -> ColoredString {
    if n > 0 {
        n.to_string().red().bold()
    } else {
        n.to_string().normal()
    }
}

pub fn elapsed(d: Duration) -> ColoredString {
    if d.as_secs() >= 1 {
        format!("{:.2}s", d.as_secs_f64()).bold()
    } else {
        format!("{}ms", d.as_millis()).bold()
    }
}

pub fn verdict(ok: bool, ok_msg: &str, bad_msg: &str) -> String {
    if ok {
        format!("{} {}", status_pass(), ok_msg.green())
    } else {
        format!("{} {}", status_fail(), bad_msg.red().bold())
    }
}
