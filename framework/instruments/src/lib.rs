mod checks;
mod metrics;
mod report;
mod threshold;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

pub use checks::CheckEvaluator;
pub use metrics::{AggregateMetrics, MetricKind, MetricName, MetricsSnapshot, RateMetric, TrendMetric};
pub use report::{report_operation, ReportCollector, ReportConfig, Reporter};
pub use threshold::{
    AbortBreaker, Aggregation, BreakerState, Comparison, Condition, Threshold,
    ThresholdAggregator, ThresholdOutcome, ThresholdParseError, ThresholdVerdict,
};

/// Timing of a single operation, usually one HTTP call made by a step.
#[derive(Debug, Clone)]
pub struct OperationRecord {
    operation_id: String,
    started: Instant,
    elapsed: Option<Duration>,
    is_error: bool,
    attr: BTreeMap<String, String>,
}

impl OperationRecord {
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            started: Instant::now(),
            elapsed: None,
            is_error: false,
            attr: BTreeMap::new(),
        }
    }

    pub fn add_attr(&mut self, key: impl Into<String>, value: impl ToString) {
        self.attr.insert(key.into(), value.to_string());
    }

    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }

    pub fn attr(&self) -> &BTreeMap<String, String> {
        &self.attr
    }

    /// The time taken by the operation, once it has been reported.
    pub fn duration(&self) -> Option<Duration> {
        self.elapsed
    }

    pub(crate) fn finish(&mut self, is_error: bool) {
        self.elapsed = Some(self.started.elapsed());
        self.is_error = is_error;
    }
}
