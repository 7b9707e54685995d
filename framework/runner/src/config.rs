use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use gale_instruments::Threshold;
use serde::{Deserialize, Deserializer};

/// A run configuration file.
///
/// ```toml
/// base_url = "http://localhost:3030"
/// request_timeout = "10s"
///
/// [scenario]
/// executor = "constant-arrival-rate"
/// rate = 30
/// time_unit = "1m"
/// duration = "2m"
/// pre_allocated_workers = 1
///
/// [[thresholds]]
/// metric = "http_req_failed"
/// condition = "rate<0.01"
/// abort_on_fail = true
/// delay_abort_eval = "10s"
///
/// [credentials]
/// email = "load@scheduler.iv"
/// password = "secret"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub base_url: Option<String>,
    #[serde(default, deserialize_with = "optional_duration")]
    pub request_timeout: Option<Duration>,
    pub scenario: Option<ExecutorConfig>,
    /// Replaces the scenario's default thresholds when present, even if empty.
    pub thresholds: Option<Vec<ThresholdConfig>>,
    pub credentials: Option<Credentials>,
}

impl RunConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read run configuration {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Invalid run configuration {}", path.display()))
    }
}

/// How iterations are started.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "executor", rename_all = "kebab-case")]
pub enum ExecutorConfig {
    /// Start `rate` iterations per `time_unit` for `duration`, regardless of how long each takes.
    ConstantArrivalRate {
        rate: u32,
        #[serde(default = "one_second", deserialize_with = "duration")]
        time_unit: Duration,
        #[serde(deserialize_with = "duration")]
        duration: Duration,
        #[serde(default = "one")]
        pre_allocated_workers: usize,
    },
    /// Run a fixed number of iterations shared between `workers`.
    SharedIterations {
        iterations: u64,
        #[serde(default = "one")]
        workers: usize,
        #[serde(default, deserialize_with = "optional_duration")]
        pause: Option<Duration>,
        #[serde(deserialize_with = "duration")]
        max_duration: Duration,
    },
}

impl ExecutorConfig {
    pub fn constant_arrival_rate(
        rate: u32,
        time_unit: Duration,
        duration: Duration,
        pre_allocated_workers: usize,
    ) -> Self {
        Self::ConstantArrivalRate {
            rate,
            time_unit,
            duration,
            pre_allocated_workers,
        }
    }

    pub fn shared_iterations(
        iterations: u64,
        workers: usize,
        pause: Option<Duration>,
        max_duration: Duration,
    ) -> Self {
        Self::SharedIterations {
            iterations,
            workers,
            pause,
            max_duration,
        }
    }

    /// The longest the scheduler will keep starting iterations for.
    pub fn planned_runtime(&self) -> Duration {
        match self {
            Self::ConstantArrivalRate { duration, .. } => *duration,
            Self::SharedIterations { max_duration, .. } => *max_duration,
        }
    }

    pub(crate) fn with_planned_runtime(self, runtime: Duration) -> Self {
        match self {
            Self::ConstantArrivalRate {
                rate,
                time_unit,
                pre_allocated_workers,
                ..
            } => Self::ConstantArrivalRate {
                rate,
                time_unit,
                duration: runtime,
                pre_allocated_workers,
            },
            Self::SharedIterations {
                iterations,
                workers,
                pause,
                ..
            } => Self::SharedIterations {
                iterations,
                workers,
                pause,
                max_duration: runtime,
            },
        }
    }

    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        match self {
            Self::ConstantArrivalRate {
                rate,
                time_unit,
                duration,
                pre_allocated_workers,
            } => {
                anyhow::ensure!(*rate > 0, "rate must be at least 1");
                anyhow::ensure!(!time_unit.is_zero(), "time_unit must not be zero");
                anyhow::ensure!(!duration.is_zero(), "duration must not be zero");
                anyhow::ensure!(
                    *pre_allocated_workers > 0,
                    "pre_allocated_workers must be at least 1"
                );
            }
            Self::SharedIterations {
                workers,
                max_duration,
                ..
            } => {
                anyhow::ensure!(*workers > 0, "workers must be at least 1");
                anyhow::ensure!(!max_duration.is_zero(), "max_duration must not be zero");
            }
        }

        Ok(())
    }
}

impl Display for ExecutorConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConstantArrivalRate {
                rate,
                time_unit,
                duration,
                pre_allocated_workers,
            } => write!(
                f,
                "constant-arrival-rate: {rate} per {} for {} with up to {pre_allocated_workers} workers",
                humantime::format_duration(*time_unit),
                humantime::format_duration(*duration),
            ),
            Self::SharedIterations {
                iterations,
                workers,
                max_duration,
                ..
            } => write!(
                f,
                "shared-iterations: {iterations} iterations over {workers} workers, at most {}",
                humantime::format_duration(*max_duration),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdConfig {
    pub metric: String,
    pub condition: String,
    #[serde(default)]
    pub abort_on_fail: bool,
    #[serde(default, deserialize_with = "optional_duration")]
    pub delay_abort_eval: Option<Duration>,
}

impl ThresholdConfig {
    pub fn to_threshold(&self) -> anyhow::Result<Threshold> {
        let threshold = Threshold::new(&self.metric, &self.condition).with_context(|| {
            format!("Invalid threshold `{} {}`", self.metric, self.condition)
        })?;

        Ok(if self.abort_on_fail {
            threshold.abort_on_fail(self.delay_abort_eval.unwrap_or_default())
        } else {
            threshold
        })
    }
}

#[derive(Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

fn one() -> usize {
    1
}

fn one_second() -> Duration {
    Duration::from_secs(1)
}

fn duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let value = String::deserialize(deserializer)?;
    humantime::parse_duration(&value).map_err(serde::de::Error::custom)
}

fn optional_duration<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Duration>, D::Error> {
    Option::<String>::deserialize(deserializer)?
        .map(|value| humantime::parse_duration(&value).map_err(serde::de::Error::custom))
        .transpose()
}
