// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `contend schedule`: time a batch of blocking tasks per scheduling model.

use std::time::Duration;

use clap::ValueEnum;

use contend_rt::harness::bounded_lower_bound;
use contend_rt::{Harness, HarnessConfig, SchedulingModel, TaskResult};

use super::CliError;
use crate::output;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelArg {
    Bounded,
    Lightweight,
    Thread,
    All,
}

#[derive(Debug, Clone, Copy)]
pub struct ScheduleArgs {
    pub tasks: usize,
    pub pool_size: usize,
    pub duration: Duration,
    pub model: ModelArg,
    /// Green worker threads, 0 for one per core.
    pub workers: usize,
}

#[derive(Debug, Clone)]
pub struct ScheduleReport {
    /// Per-task blocking time the harness ran with.
    pub task_duration: Duration,
    pub results: Vec<TaskResult>,
}

pub fn run(args: ScheduleArgs) -> Result<ScheduleReport, CliError> {
    let config = HarnessConfig::default()
        .with_task_duration(args.duration)
        .with_lightweight_workers(args.workers);
    let harness = Harness::new(config);
    let task_duration = harness.config().task_duration;

    let mut results = Vec::new();
    if matches!(args.model, ModelArg::Bounded | ModelArg::All) {
        results.push(harness.run_bounded(args.tasks, args.pool_size)?);
    }
    if matches!(args.model, ModelArg::Lightweight | ModelArg::All) {
        results.push(harness.run_lightweight(args.tasks)?);
    }
    if matches!(args.model, ModelArg::Thread | ModelArg::All) {
        results.push(harness.run_thread_per_task(args.tasks)?);
    }
    Ok(ScheduleReport {
        task_duration,
        results,
    })
}

pub fn print(args: &ScheduleArgs, report: &ScheduleReport) {
    println!(
        "{}",
        output::section_header(&format!(
            "{} tasks x {}ms",
            args.tasks,
            report.task_duration.as_millis()
        ))
    );
    println!("{}", output::separator(52));
    for r in &report.results {
        let floor = match r.model() {
            SchedulingModel::Bounded { pool_size } => {
                let waves = bounded_lower_bound(r.task_count(), pool_size, report.task_duration);
                format!("  (floor {})", output::elapsed(waves))
            }
            _ => String::new(),
        };
        println!(
            "{} {:>8}  done {:>6}  interrupted {}{}",
            output::label(&r.model().to_string()),
            output::elapsed(r.elapsed()),
            r.completed(),
            output::hazard_count(r.interrupted() as u64),
            floor
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contend_rt::HarnessError;

    fn args(model: ModelArg) -> ScheduleArgs {
        ScheduleArgs {
            tasks: 6,
            pool_size: 3,
            duration: Duration::from_millis(50),
            model,
            workers: 2,
        }
    }

    #[test]
    fn all_runs_every_model() {
        let report = run(args(ModelArg::All)).unwrap();
        assert_eq!(report.task_duration, Duration::from_millis(50));
        let results = report.results;
        let models: Vec<_> = results.iter().map(TaskResult::model).collect();
        assert_eq!(
            models,
            vec![
                SchedulingModel::Bounded { pool_size: 3 },
                SchedulingModel::Lightweight,
                SchedulingModel::ThreadPerTask,
            ]
        );
        assert!(results.iter().all(|r| r.completed() == 6));
    }

    #[test]
    fn single_model() {
        let results = run(args(ModelArg::Lightweight)).unwrap().results;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].model(), SchedulingModel::Lightweight);
    }

    #[test]
    fn zero_pool_surfaces_harness_error() {
        let mut a = args(ModelArg::Bounded);
        a.pool_size = 0;
        assert!(matches!(
            run(a),
            Err(CliError::Harness(HarnessError::InvalidPoolSize))
        ));
    }
}
