// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! contend - concurrency demonstrations.
//!
//! Lost updates on a shared counter, overselling on a stock ledger, and
//! wall-clock cost of blocking tasks under different scheduling models.

mod commands;
mod output;

use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::ledger::LedgerArgs;
use commands::schedule::{ModelArg, ScheduleArgs};
use commands::{counter, ledger, schedule, CliError};

#[derive(Parser)]
#[command(name = "contend")]
#[command(version, about = "Race conditions and scheduling models, measured", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Increment a shared counter from many threads
    Counter {
        /// Concurrent incrementing threads
        #[arg(long, default_value_t = 8)]
        threads: usize,

        /// Increments per thread
        #[arg(long, default_value_t = 100_000)]
        increments: u64,

        /// Use the split load/store counter
        #[arg(long)]
        racy: bool,
    },

    /// Let buyers race for limited stock
    Ledger {
        /// Starting stock
        #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
        stock: i64,

        /// Concurrent buyers, one purchase each
        #[arg(long, default_value_t = 100)]
        buyers: usize,

        /// Independent trials
        #[arg(long, default_value_t = 5)]
        trials: usize,

        /// Use the check-then-act sale instead of compare-and-swap
        #[arg(long = "unsafe")]
        unsafe_path: bool,

        /// Sleep between check and act on the unsafe path, in microseconds
        #[arg(long)]
        window_us: Option<u64>,
    },

    /// Time a batch of blocking tasks
    Schedule {
        /// Number of tasks
        #[arg(long, default_value_t = 20)]
        tasks: usize,

        /// Worker threads for the bounded pool
        #[arg(long, default_value_t = 5)]
        pool_size: usize,

        /// How long each task blocks, in milliseconds
        #[arg(long, default_value_t = 1_000)]
        duration_ms: u64,

        /// Scheduling model to run
        #[arg(long, value_enum, default_value_t = ModelArg::All)]
        model: ModelArg,

        /// Green worker threads (0 = one per core)
        #[arg(long, default_value_t = 0)]
        workers: usize,
    },
}

fn main() {
    let cli = Cli::parse();
    output::init();

    let filter_layer = if cli.debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else if cli.verbose {
        tracing_subscriber::EnvFilter::new("info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("contend v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli.command) {
        eprintln!("{}: {}", output::error_label(), e);
        process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Counter {
            threads,
            increments,
            racy,
        } => {
            let report = counter::run(threads, increments, racy)?;
            counter::print(&report);
        }
        Commands::Ledger {
            stock,
            buyers,
            trials,
            unsafe_path,
            window_us,
        } => {
            let report = ledger::run(LedgerArgs {
                stock,
                buyers,
                trials,
                unsafe_path,
                window: window_us.map(Duration::from_micros),
            })?;
            ledger::print(&report);
        }
        Commands::Schedule {
            tasks,
            pool_size,
            duration_ms,
            model,
            workers,
        } => {
            let args = ScheduleArgs {
                tasks,
                pool_size,
                duration: Duration::from_millis(duration_ms),
                model,
                workers,
            };
            let report = schedule::run(args)?;
            schedule::print(&args, &report);
        }
    }
    Ok(())
}
