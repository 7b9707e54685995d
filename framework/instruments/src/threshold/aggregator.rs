use std::time::Instant;

use gale_core::prelude::{IterationResult, ShutdownHandle};
use parking_lot::Mutex;

use crate::metrics::{AggregateMetrics, MetricsSnapshot};
use crate::threshold::{AbortBreaker, Threshold};

/// How one threshold fared.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdOutcome {
    pub threshold: Threshold,
    /// `None` when the metric has no samples.
    pub observed: Option<f64>,
    pub passed: bool,
    /// Set when an abort-on-fail threshold stopped the run.
    pub tripped: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdVerdict {
    pub passed: bool,
    pub outcomes: Vec<ThresholdOutcome>,
}

impl ThresholdVerdict {
    pub fn breaches(&self) -> impl Iterator<Item = &Threshold> {
        self.outcomes
            .iter()
            .filter(|o| !o.passed)
            .map(|o| &o.threshold)
    }
}

struct WatchedThreshold {
    threshold: Threshold,
    breaker: Option<AbortBreaker>,
}

struct AggregatorState {
    metrics: AggregateMetrics,
    watched: Vec<WatchedThreshold>,
    aborted_by: Option<Threshold>,
}

/// Collects iteration results from every worker and judges the configured thresholds.
///
/// Abort-on-fail thresholds are checked after every recorded iteration. When one trips, the
/// shutdown handle is triggered so that no new iterations are started.
pub struct ThresholdAggregator {
    started: Instant,
    shutdown_handle: ShutdownHandle,
    state: Mutex<AggregatorState>,
}

impl ThresholdAggregator {
    pub fn new(thresholds: Vec<Threshold>, shutdown_handle: ShutdownHandle) -> Self {
        let watched = thresholds
            .into_iter()
            .map(|threshold| WatchedThreshold {
                breaker: threshold
                    .aborts_on_fail()
                    .then(|| AbortBreaker::new(threshold.delay_abort_eval())),
                threshold,
            })
            .collect();

        Self {
            started: Instant::now(),
            shutdown_handle,
            state: Mutex::new(AggregatorState {
                metrics: AggregateMetrics::default(),
                watched,
                aborted_by: None,
            }),
        }
    }

    pub fn record(&self, result: &IterationResult) {
        let elapsed = self.started.elapsed();
        let mut tripped = None;

        {
            let mut state = self.state.lock();
            let AggregatorState {
                metrics,
                watched,
                aborted_by,
            } = &mut *state;
            metrics.record(result);

            for watched in watched.iter_mut() {
                let Some(breaker) = watched.breaker.as_mut() else {
                    continue;
                };

                let breached = is_breached(metrics, &watched.threshold);
                if breaker.observe(breached, elapsed) && aborted_by.is_none() {
                    *aborted_by = Some(watched.threshold.clone());
                    tripped = Some(watched.threshold.clone());
                }
            }
        }

        if let Some(threshold) = tripped {
            log::warn!(
                "Threshold [{threshold}] breached after {elapsed:?}, no new iterations will be started"
            );
            self.shutdown_handle.shutdown();
        }
    }

    /// Judge every threshold against the current aggregates.
    pub fn evaluate(&self) -> ThresholdVerdict {
        let state = self.state.lock();

        let outcomes = state
            .watched
            .iter()
            .map(|watched| {
                let tripped = watched
                    .breaker
                    .as_ref()
                    .map(|b| b.is_tripped())
                    .unwrap_or(false);
                ThresholdOutcome {
                    threshold: watched.threshold.clone(),
                    observed: observe(&state.metrics, &watched.threshold),
                    passed: !tripped && !is_breached(&state.metrics, &watched.threshold),
                    tripped,
                }
            })
            .collect::<Vec<_>>();

        ThresholdVerdict {
            passed: outcomes.iter().all(|o| o.passed),
            outcomes,
        }
    }

    /// The abort-on-fail threshold that stopped the run, if any.
    pub fn aborted_by(&self) -> Option<Threshold> {
        self.state.lock().aborted_by.clone()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.state.lock().metrics.snapshot()
    }
}

fn observe(metrics: &AggregateMetrics, threshold: &Threshold) -> Option<f64> {
    metrics.value(threshold.metric(), threshold.condition().aggregation)
}

/// A metric without samples is not considered breached.
fn is_breached(metrics: &AggregateMetrics, threshold: &Threshold) -> bool {
    observe(metrics, threshold)
        .map(|value| !threshold.condition().holds(value))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gale_core::prelude::{CheckResult, RequestError, StepFailure, StepResult};
    use std::time::Duration;

    fn iteration(index: u64, status: u16) -> IterationResult {
        let failure = (status != 200)
            .then_some(StepFailure::Request(RequestError::HttpStatus { status }));
        IterationResult {
            iteration: index,
            worker_id: "worker-0".to_string(),
            steps: vec![StepResult {
                step_id: "add_activity".to_string(),
                status: Some(status),
                latency: Duration::from_millis(2),
                checks: vec![CheckResult {
                    name: "status was 200".to_string(),
                    passed: status == 200,
                }],
                failure,
            }],
            duration: Duration::from_millis(2),
        }
    }

    fn error_rate_threshold(delay: Option<Duration>) -> Threshold {
        let threshold = Threshold::new("http_req_failed", "rate<0.01").unwrap();
        match delay {
            Some(delay) => threshold.abort_on_fail(delay),
            None => threshold,
        }
    }

    #[test]
    fn check_rate_matches_raw_samples() {
        let aggregator = ThresholdAggregator::new(
            vec![Threshold::new("checks", "rate>0.5").unwrap()],
            ShutdownHandle::new(),
        );

        let results = (0..20)
            .map(|i| iteration(i, if i % 3 == 0 { 500 } else { 200 }))
            .collect::<Vec<_>>();
        for result in &results {
            aggregator.record(result);
        }

        let passed = results.iter().flat_map(|r| r.checks()).filter(|c| c.passed).count();
        let total = results.iter().flat_map(|r| r.checks()).count();

        let verdict = aggregator.evaluate();
        assert_eq!(verdict.outcomes[0].observed, Some(passed as f64 / total as f64));
        assert!(verdict.passed);
    }

    #[test]
    fn error_count_never_decreases() {
        let aggregator = ThresholdAggregator::new(Vec::new(), ShutdownHandle::new());

        let mut last_failures = 0;
        for i in 0..50 {
            aggregator.record(&iteration(i, if i % 7 == 0 { 500 } else { 200 }));
            let snapshot = aggregator.snapshot();
            assert!(snapshot.http_failures >= last_failures);
            last_failures = snapshot.http_failures;
        }
        assert_eq!(last_failures, 8);
    }

    #[test]
    fn abort_threshold_trips_and_signals_shutdown() {
        let shutdown = ShutdownHandle::new();
        let aggregator =
            ThresholdAggregator::new(vec![error_rate_threshold(Some(Duration::ZERO))], shutdown.clone());

        aggregator.record(&iteration(0, 200));
        assert!(!shutdown.is_shutdown());

        aggregator.record(&iteration(1, 500));
        assert!(shutdown.is_shutdown());
        assert_eq!(aggregator.aborted_by(), Some(error_rate_threshold(Some(Duration::ZERO))));

        let verdict = aggregator.evaluate();
        assert!(!verdict.passed);
        assert!(verdict.outcomes[0].tripped);
        assert_eq!(verdict.breaches().count(), 1);
    }

    #[test]
    fn abort_waits_for_grace_period() {
        let shutdown = ShutdownHandle::new();
        let aggregator = ThresholdAggregator::new(
            vec![error_rate_threshold(Some(Duration::from_secs(3600)))],
            shutdown.clone(),
        );

        aggregator.record(&iteration(0, 500));
        assert!(!shutdown.is_shutdown());
        assert_eq!(aggregator.aborted_by(), None);
    }

    #[test]
    fn non_abort_threshold_fails_only_at_evaluation() {
        let shutdown = ShutdownHandle::new();
        let aggregator = ThresholdAggregator::new(vec![error_rate_threshold(None)], shutdown.clone());

        aggregator.record(&iteration(0, 500));
        assert!(!shutdown.is_shutdown());

        let verdict = aggregator.evaluate();
        assert!(!verdict.passed);
        assert!(!verdict.outcomes[0].tripped);
        assert_eq!(verdict.outcomes[0].observed, Some(1.0));
    }

    #[test]
    fn thresholds_without_samples_pass() {
        let aggregator = ThresholdAggregator::new(
            vec![Threshold::new("http_req_duration", "p(99)<100").unwrap()],
            ShutdownHandle::new(),
        );

        let verdict = aggregator.evaluate();
        assert!(verdict.passed);
        assert_eq!(verdict.outcomes[0].observed, None);
    }
}
