mod aggregator;
mod breaker;
mod expression;

use std::fmt::{Display, Formatter};
use std::time::Duration;

use crate::metrics::{MetricKind, MetricName};

pub use aggregator::{ThresholdAggregator, ThresholdOutcome, ThresholdVerdict};
pub use breaker::{AbortBreaker, BreakerState};
pub use expression::{Aggregation, Comparison, Condition, ThresholdParseError};

/// A pass/fail condition over an aggregate metric, optionally aborting the run early.
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    metric: MetricName,
    condition: Condition,
    abort_on_fail: bool,
    delay_abort_eval: Duration,
}

impl Threshold {
    /// Parse a threshold such as `Threshold::new("http_req_failed", "rate<0.01")`.
    ///
    /// Rate metrics only accept `rate`, trend metrics accept `avg`, `min`, `max`, `med` and `p(N)`.
    pub fn new(metric: &str, condition: &str) -> Result<Self, ThresholdParseError> {
        let metric: MetricName = metric.parse()?;
        let condition: Condition = condition.parse()?;

        let applies = match metric.kind() {
            MetricKind::Rate => condition.aggregation == Aggregation::Rate,
            MetricKind::Trend => condition.aggregation != Aggregation::Rate,
        };
        if !applies {
            return Err(ThresholdParseError::new(format!(
                "`{}` cannot be applied to {metric}",
                condition.aggregation
            )));
        }

        Ok(Self {
            metric,
            condition,
            abort_on_fail: false,
            delay_abort_eval: Duration::ZERO,
        })
    }

    /// Stop starting new iterations once this threshold is breached, but not before `delay` has
    /// passed since the start of the run.
    pub fn abort_on_fail(mut self, delay: Duration) -> Self {
        self.abort_on_fail = true;
        self.delay_abort_eval = delay;
        self
    }

    pub fn metric(&self) -> MetricName {
        self.metric
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn aborts_on_fail(&self) -> bool {
        self.abort_on_fail
    }

    pub fn delay_abort_eval(&self) -> Duration {
        self.delay_abort_eval
    }
}

impl Display for Threshold {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.metric, self.condition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_metrics_need_rate() {
        assert!(Threshold::new("checks", "rate>0.99").is_ok());
        assert!(Threshold::new("checks", "p(99)<1").is_err());
    }

    #[test]
    fn trend_metrics_reject_rate() {
        assert!(Threshold::new("http_req_duration", "p(99) < 100").is_ok());
        assert!(Threshold::new("iteration_duration", "avg<1000").is_ok());
        assert!(Threshold::new("http_req_duration", "rate<1").is_err());
    }

    #[test]
    fn abort_settings() {
        let threshold = Threshold::new("http_req_failed", "rate<0.01")
            .unwrap()
            .abort_on_fail(Duration::from_secs(5));
        assert!(threshold.aborts_on_fail());
        assert_eq!(threshold.delay_abort_eval(), Duration::from_secs(5));
        assert_eq!(threshold.to_string(), "http_req_failed rate<0.01");
    }
}
