use std::time::Duration;

use gale_instruments::{MetricsSnapshot, Threshold, ThresholdVerdict};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::scheduler::ScheduleSummary;

/// The outcome of a run, returned by [crate::run::run] and printed when the run finishes.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub scenario_name: String,
    pub run_id: String,
    pub elapsed: Duration,
    pub schedule: ScheduleSummary,
    pub metrics: MetricsSnapshot,
    pub verdict: ThresholdVerdict,
    /// The abort-on-fail threshold that stopped the run early.
    pub aborted_by: Option<Threshold>,
}

impl RunReport {
    /// Whether every threshold held.
    pub fn passed(&self) -> bool {
        self.verdict.passed
    }

    /// Whether every iteration that was due also finished.
    pub fn is_complete(&self) -> bool {
        self.schedule.finished >= self.schedule.scheduled
    }

    pub fn print_summary(&self) {
        println!(
            "\nRun {} of {} finished after {:.2}s",
            self.run_id,
            self.scenario_name,
            self.elapsed.as_secs_f64()
        );

        let mut table = Table::new(self.counter_rows());
        table.with(Style::modern());
        println!("{table}");

        if !self.verdict.outcomes.is_empty() {
            let mut table = Table::new(self.threshold_rows());
            table.with(Style::modern());
            println!("{table}");
        }

        if let Some(threshold) = &self.aborted_by {
            println!("Aborted early by threshold [{threshold}]");
        }
        if !self.is_complete() {
            println!(
                "Incomplete run: {} of {} scheduled iterations finished",
                self.schedule.finished, self.schedule.scheduled
            );
        }
        println!(
            "Thresholds {}",
            if self.passed() { "passed" } else { "FAILED" }
        );
    }

    fn counter_rows(&self) -> Vec<CounterRow> {
        let schedule = &self.schedule;
        let metrics = &self.metrics;

        vec![
            CounterRow::new("iterations scheduled", schedule.scheduled),
            CounterRow::new("iterations started", schedule.started),
            CounterRow::new("iterations finished", schedule.finished),
            CounterRow::new("iterations interrupted", metrics.interrupted_iterations),
            CounterRow::new("scheduling misses", schedule.dropped),
            CounterRow::new("iterations abandoned", schedule.abandoned),
            CounterRow::new("workers", schedule.workers as u64),
            CounterRow::new("http requests", metrics.http_requests),
            CounterRow::new("network errors", metrics.network_errors),
            CounterRow::new("http status errors", metrics.http_status_errors),
            CounterRow::new("checks passed", metrics.checks.hits),
            CounterRow::new("checks failed", metrics.checks.total - metrics.checks.hits),
        ]
    }

    fn threshold_rows(&self) -> Vec<ThresholdRow> {
        self.verdict
            .outcomes
            .iter()
            .map(|outcome| ThresholdRow {
                threshold: outcome.threshold.to_string(),
                observed: outcome.observed,
                abort_on_fail: outcome.threshold.aborts_on_fail(),
                result: match (outcome.passed, outcome.tripped) {
                    (true, _) => "pass",
                    (false, true) => "fail (aborted)",
                    (false, false) => "fail",
                },
            })
            .collect()
    }
}

#[derive(Tabled)]
struct CounterRow {
    counter: &'static str,
    value: u64,
}

impl CounterRow {
    fn new(counter: &'static str, value: u64) -> Self {
        Self { counter, value }
    }
}

#[derive(Tabled)]
struct ThresholdRow {
    threshold: String,
    #[tabled(display = "opt_float4")]
    observed: Option<f64>,
    abort_on_fail: bool,
    result: &'static str,
}

fn opt_float4(n: &Option<f64>) -> String {
    n.map(|n| format!("{:.4}", n))
        .unwrap_or_else(|| "-".to_string())
}
