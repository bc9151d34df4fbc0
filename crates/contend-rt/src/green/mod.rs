// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Green tasks: the lightweight scheduling model.
//!
//! Stackless coroutine tasks on a work-stealing M:N scheduler. A task
//! that waits parks itself on the timer driver; its worker thread moves
//! on, so thousands of waiting tasks cost a handful of OS threads.
//!
//! Components:
//! - `task`: RawTask, state machine, waker
//! - `queue`: work-stealing local queues + global injector
//! - `timer`: deadline heap on a dedicated thread
//! - `scheduler`: worker threads + polling loop
//! - `runtime`: `GreenRuntime`, the `Spawner` front end

pub mod queue;
pub mod runtime;
pub mod scheduler;
pub mod task;
pub mod timer;

pub use runtime::GreenRuntime;
