// SPDX-License-Identifier: (MIT OR Apache-2.0)
pub mod counter;
pub mod ledger;
pub mod schedule;

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use thiserror::Error;

use contend_rt::HarnessError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Harness(#[from] HarnessError),

    #[error("failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("{0} thread panicked")]
    Panicked(&'static str),

    #[error("{threads} threads x {increments} increments overflows a u64 counter")]
    CounterOverflow { threads: usize, increments: u64 },
}

/// Run `body` on `threads` named threads released together, so their
/// critical sections overlap as much as possible.
pub(crate) fn stampede<F>(name: &'static str, threads: usize, body: F) -> Result<(), CliError>
where
    F: Fn(usize) + Sync,
{
    let go = AtomicBool::new(false);
    thread::scope(|s| {
        let mut handles = Vec::with_capacity(threads);
        for i in 0..threads {
            let go = &go;
            let body = &body;
            let spawned = thread::Builder::new()
                .name(format!("{}-{}", name, i))
                .spawn_scoped(s, move || {
                    while !go.load(Ordering::Acquire) {
                        std::hint::spin_loop();
                        thread::yield_now();
                    }
                    body(i);
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    // Release the threads already started so the scope can join them.
                    go.store(true, Ordering::Release);
                    return Err(e.into());
                }
            }
        }
        go.store(true, Ordering::Release);
        let panicked = handles
            .into_iter()
            .map(|h| h.join())
            .filter(Result::is_err)
            .count();
        match panicked {
            0 => Ok(()),
            _ => Err(CliError::Panicked(name)),
        }
    })
}
