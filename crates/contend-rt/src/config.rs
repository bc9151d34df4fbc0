// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Harness configuration.

use std::time::Duration;

/// Simulated blocking time per task when nothing else is configured.
pub const DEFAULT_TASK_DURATION: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarnessConfig {
    /// How long each task blocks.
    pub task_duration: Duration,
    /// Worker threads for the green scheduler. 0 = one per available core.
    pub lightweight_workers: usize,
}

impl HarnessConfig {
    pub fn with_task_duration(mut self, duration: Duration) -> Self {
        self.task_duration = duration;
        self
    }

    pub fn with_lightweight_workers(mut self, workers: usize) -> Self {
        self.lightweight_workers = workers;
        self
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            task_duration: DEFAULT_TASK_DURATION,
            lightweight_workers: 0,
        }
    }
}
