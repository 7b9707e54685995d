use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use gale_core::prelude::{IterationResult, RequestError};
use hdrhistogram::Histogram;

use crate::threshold::{Aggregation, ThresholdParseError};

/// The metrics that thresholds can be defined over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum MetricName {
    /// Rate of passed checks.
    #[display("checks")]
    Checks,
    /// Rate of requests that failed with a network error or an unexpected status.
    #[display("http_req_failed")]
    HttpReqFailed,
    /// Request latency in milliseconds.
    #[display("http_req_duration")]
    HttpReqDuration,
    /// Whole iteration time in milliseconds.
    #[display("iteration_duration")]
    IterationDuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Rate,
    Trend,
}

impl MetricName {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricName::Checks | MetricName::HttpReqFailed => MetricKind::Rate,
            MetricName::HttpReqDuration | MetricName::IterationDuration => MetricKind::Trend,
        }
    }
}

impl FromStr for MetricName {
    type Err = ThresholdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "checks" => Ok(MetricName::Checks),
            "http_req_failed" => Ok(MetricName::HttpReqFailed),
            "http_req_duration" => Ok(MetricName::HttpReqDuration),
            "iteration_duration" => Ok(MetricName::IterationDuration),
            other => Err(ThresholdParseError::new(format!("unknown metric `{other}`"))),
        }
    }
}

/// Counts hits out of a total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateMetric {
    pub hits: u64,
    pub total: u64,
}

impl RateMetric {
    pub fn add(&mut self, hit: bool) {
        self.total += 1;
        if hit {
            self.hits += 1;
        }
    }

    /// `None` until at least one sample has been added.
    pub fn rate(&self) -> Option<f64> {
        (self.total > 0).then(|| self.hits as f64 / self.total as f64)
    }
}

/// Streaming latency distribution, stored in microseconds and read in milliseconds.
#[derive(Clone)]
pub struct TrendMetric {
    histogram: Histogram<u64>,
}

impl Default for TrendMetric {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TrendMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrendMetric")
            .field("count", &self.histogram.len())
            .finish()
    }
}

impl TrendMetric {
    pub fn new() -> Self {
        Self {
            // Auto-resizing, so recording never fails on large values.
            histogram: Histogram::new(3).expect("3 significant figures is a valid precision"),
        }
    }

    pub fn record(&mut self, duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        self.histogram.saturating_record(micros.max(1));
    }

    pub fn count(&self) -> u64 {
        self.histogram.len()
    }

    /// The aggregated value in milliseconds, `None` if nothing was recorded or the aggregation does
    /// not apply to a trend.
    pub fn value(&self, aggregation: Aggregation) -> Option<f64> {
        if self.histogram.is_empty() {
            return None;
        }

        let micros = match aggregation {
            Aggregation::Avg => self.histogram.mean(),
            Aggregation::Min => self.histogram.min() as f64,
            Aggregation::Max => self.histogram.max() as f64,
            Aggregation::Med => self.histogram.value_at_quantile(0.5) as f64,
            Aggregation::Percentile(p) => self.histogram.value_at_quantile(p / 100.0) as f64,
            Aggregation::Rate => return None,
        };

        Some(micros / 1000.0)
    }
}

/// Running aggregates over every recorded iteration.
#[derive(Debug, Default, Clone)]
pub struct AggregateMetrics {
    checks: RateMetric,
    checks_by_name: BTreeMap<String, RateMetric>,
    http_req_failed: RateMetric,
    network_errors: u64,
    http_status_errors: u64,
    http_req_duration: TrendMetric,
    iteration_duration: TrendMetric,
    iterations: u64,
    interrupted_iterations: u64,
}

impl AggregateMetrics {
    pub fn record(&mut self, result: &IterationResult) {
        self.iterations += 1;
        if result.interrupted_by().is_some() {
            self.interrupted_iterations += 1;
        }
        self.iteration_duration.record(result.duration);

        for check in result.checks() {
            self.checks.add(check.passed);
            self.checks_by_name
                .entry(check.name.clone())
                .or_default()
                .add(check.passed);
        }

        for step in result.requests() {
            let error = step.request_error();
            self.http_req_failed.add(error.is_some());
            match error {
                Some(RequestError::Network { .. }) => self.network_errors += 1,
                Some(RequestError::HttpStatus { .. }) => self.http_status_errors += 1,
                None => {}
            }

            // Network errors have no meaningful response time.
            if step.status.is_some() {
                self.http_req_duration.record(step.latency);
            }
        }
    }

    pub fn value(&self, metric: MetricName, aggregation: Aggregation) -> Option<f64> {
        match (metric, aggregation) {
            (MetricName::Checks, Aggregation::Rate) => self.checks.rate(),
            (MetricName::HttpReqFailed, Aggregation::Rate) => self.http_req_failed.rate(),
            (MetricName::HttpReqDuration, aggregation) => self.http_req_duration.value(aggregation),
            (MetricName::IterationDuration, aggregation) => {
                self.iteration_duration.value(aggregation)
            }
            _ => None,
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            iterations: self.iterations,
            interrupted_iterations: self.interrupted_iterations,
            checks: self.checks,
            checks_by_name: self.checks_by_name.clone(),
            http_requests: self.http_req_failed.total,
            http_failures: self.http_req_failed.hits,
            network_errors: self.network_errors,
            http_status_errors: self.http_status_errors,
            http_req_duration_p99_ms: self.http_req_duration.value(Aggregation::Percentile(99.0)),
        }
    }
}

/// Plain counters copied out of [AggregateMetrics] for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub iterations: u64,
    pub interrupted_iterations: u64,
    pub checks: RateMetric,
    pub checks_by_name: BTreeMap<String, RateMetric>,
    pub http_requests: u64,
    pub http_failures: u64,
    pub network_errors: u64,
    pub http_status_errors: u64,
    pub http_req_duration_p99_ms: Option<f64>,
}
