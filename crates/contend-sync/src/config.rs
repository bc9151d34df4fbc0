// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Ledger construction parameters.

use std::time::Duration;

/// Pause inserted between the check and the act on the unsafe sell path.
///
/// Widening the window makes the lost-update race reproducible; it has no
/// effect on the CAS path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RaceWindow {
    /// Check and act run back to back.
    None,
    /// Yield the thread between check and act.
    #[default]
    Yield,
    /// Sleep for the given duration between check and act.
    Sleep(Duration),
}

/// Configuration for a [`crate::ResourceLedger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    pub initial_stock: i64,
    pub race_window: RaceWindow,
    /// Hard cap on CAS retries per sale. `None` relies on lock-free
    /// global progress and never gives up.
    pub max_retries: Option<u32>,
}

impl LedgerConfig {
    pub fn new(initial_stock: i64) -> Self {
        Self {
            initial_stock,
            ..Self::default()
        }
    }

    pub fn with_race_window(mut self, window: RaceWindow) -> Self {
        self.race_window = window;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            initial_stock: 0,
            race_window: RaceWindow::default(),
            max_retries: None,
        }
    }
}
