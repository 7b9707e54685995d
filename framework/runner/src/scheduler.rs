mod constant_arrival_rate;
mod shared_iterations;

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use gale_instruments::ThresholdAggregator;

use crate::context::{RunnerContext, UserValuesConstraint};
use crate::iteration::run_iteration;
use crate::step::Step;

pub(crate) use constant_arrival_rate::run_constant_arrival_rate;
pub(crate) use shared_iterations::run_shared_iterations;

/// What the scheduler did over the course of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleSummary {
    /// Iterations that were due to start.
    pub scheduled: u64,
    pub started: u64,
    pub finished: u64,
    /// Arrivals that found every worker busy and the queue full.
    pub dropped: u64,
    /// Iterations that were due but never started because the run stopped first.
    pub abandoned: u64,
    /// Worker threads used.
    pub workers: usize,
}

#[derive(Debug, Default)]
struct ScheduleCounters {
    scheduled: AtomicU64,
    started: AtomicU64,
    finished: AtomicU64,
    dropped: AtomicU64,
    abandoned: AtomicU64,
    workers: AtomicUsize,
}

impl ScheduleCounters {
    fn summary(&self) -> ScheduleSummary {
        ScheduleSummary {
            scheduled: self.scheduled.load(Ordering::Acquire),
            started: self.started.load(Ordering::Acquire),
            finished: self.finished.load(Ordering::Acquire),
            dropped: self.dropped.load(Ordering::Acquire),
            abandoned: self.abandoned.load(Ordering::Acquire),
            workers: self.workers.load(Ordering::Acquire),
        }
    }
}

/// The pieces every worker needs to run an iteration and hand its result over.
pub(crate) struct IterationRunner<RV: UserValuesConstraint, V: UserValuesConstraint> {
    steps: Arc<Vec<Step<RV, V>>>,
    runner_context: Arc<RunnerContext<RV>>,
    aggregator: Arc<ThresholdAggregator>,
    counters: Arc<ScheduleCounters>,
}

impl<RV: UserValuesConstraint, V: UserValuesConstraint> Clone for IterationRunner<RV, V> {
    fn clone(&self) -> Self {
        Self {
            steps: self.steps.clone(),
            runner_context: self.runner_context.clone(),
            aggregator: self.aggregator.clone(),
            counters: self.counters.clone(),
        }
    }
}

impl<RV: UserValuesConstraint, V: UserValuesConstraint> IterationRunner<RV, V> {
    pub(crate) fn new(
        steps: Vec<Step<RV, V>>,
        runner_context: Arc<RunnerContext<RV>>,
        aggregator: Arc<ThresholdAggregator>,
    ) -> Self {
        Self {
            steps: Arc::new(steps),
            runner_context,
            aggregator,
            counters: Arc::new(ScheduleCounters::default()),
        }
    }

    fn runner_context(&self) -> &Arc<RunnerContext<RV>> {
        &self.runner_context
    }

    fn counters(&self) -> &ScheduleCounters {
        &self.counters
    }

    fn run_one(&self, worker_id: &str, iteration: u64, worker_iteration: u64) {
        log::debug!("Starting iteration {iteration} on {worker_id}");
        self.counters.started.fetch_add(1, Ordering::AcqRel);

        let result = run_iteration(
            &self.steps,
            &self.runner_context,
            worker_id,
            iteration,
            worker_iteration,
        );
        self.aggregator.record(&result);

        self.counters.finished.fetch_add(1, Ordering::AcqRel);
    }

    fn summary(&self) -> ScheduleSummary {
        self.counters.summary()
    }
}

fn worker_name(index: usize) -> String {
    format!("worker-{index}")
}
