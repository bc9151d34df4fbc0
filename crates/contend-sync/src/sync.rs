// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Atomic primitives, swapped for loom's model-checked versions under
//! `--cfg loom`.

#[cfg(loom)]
pub(crate) use loom::sync::atomic::{AtomicI64, AtomicU64, Ordering};
#[cfg(not(loom))]
pub(crate) use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

#[cfg(loom)]
pub(crate) fn yield_now() {
    loom::thread::yield_now();
}
#[cfg(not(loom))]
pub(crate) fn yield_now() {
    std::thread::yield_now();
}

#[cfg(loom)]
pub(crate) fn sleep(_duration: std::time::Duration) {
    // loom has no clock; a yield is the closest schedulable point.
    loom::thread::yield_now();
}
#[cfg(not(loom))]
pub(crate) fn sleep(duration: std::time::Duration) {
    std::thread::sleep(duration);
}
