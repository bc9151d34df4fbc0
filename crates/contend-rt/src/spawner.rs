// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The "spawn a concurrent unit of work" seam.
//!
//! The harness only needs to hand off tasks and later wait for all of
//! them. Anything that can do that (a thread pool, a green scheduler,
//! raw OS threads) plugs in here.

use crate::error::HarnessError;
use crate::work::{BlockingTask, SchedulingModel};

pub trait Spawner {
    /// Which model this spawner implements, for reporting.
    fn model(&self) -> SchedulingModel;

    /// Hand off one task. May return before the task starts.
    fn spawn(&self, task: BlockingTask) -> Result<(), HarnessError>;

    /// Stop accepting work and block until every spawned task has ended.
    fn finish(self) -> Result<(), HarnessError>
    where
        Self: Sized;
}
