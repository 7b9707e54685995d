use std::time::Duration;

use anyhow::Context;
use gale_instruments::Threshold;

use crate::cli::{GaleScenarioCli, ReporterOpt};
use crate::config::{Credentials, ExecutorConfig, RunConfig};
use crate::context::{RunnerContext, UserValuesConstraint};
use crate::step::Step;

pub type HookResult = anyhow::Result<()>;

pub type GlobalHookMut<RV> = fn(&mut RunnerContext<RV>) -> HookResult;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// The builder for a scenario definition.
///
/// This must be used at the start of a scenario to define what should run and, by default, how.
/// Defaults given here can be overridden by a run configuration file and the command line.
pub struct ScenarioDefinitionBuilder<RV: UserValuesConstraint, V: UserValuesConstraint> {
    /// The name of the scenario, which should be unique within the workspace.
    ///
    /// Recommended value is `env!("CARGO_PKG_NAME")`.
    name: String,
    cli: GaleScenarioCli,
    default_executor: Option<ExecutorConfig>,
    /// Global setup hook for this scenario. It will be run once, before any iterations are started.
    setup_fn: Option<GlobalHookMut<RV>>,
    steps: Vec<Step<RV, V>>,
    default_thresholds: Vec<Threshold>,
}

pub(crate) struct ScenarioDefinition<RV: UserValuesConstraint, V: UserValuesConstraint> {
    pub(crate) name: String,
    pub(crate) base_url: String,
    pub(crate) request_timeout: Duration,
    pub(crate) executor: ExecutorConfig,
    pub(crate) thresholds: Vec<Threshold>,
    pub(crate) credentials: Option<Credentials>,
    pub(crate) reporter: ReporterOpt,
    pub(crate) run_id: Option<String>,
    pub(crate) no_progress: bool,
    pub(crate) setup_fn: Option<GlobalHookMut<RV>>,
    pub(crate) steps: Vec<Step<RV, V>>,
}

impl<RV: UserValuesConstraint, V: UserValuesConstraint> ScenarioDefinitionBuilder<RV, V> {
    /// Initialise a new scenario definition from the scenario name and command line arguments.
    ///
    /// This also initialises logging, see [crate::init::init].
    pub fn new_with_init(name: &str) -> Self {
        Self::new(name, crate::init::init())
    }

    /// Initialise a new scenario definition with an already parsed command line.
    pub fn new(name: &str, cli: GaleScenarioCli) -> Self {
        Self {
            name: name.to_string(),
            cli,
            default_executor: None,
            setup_fn: None,
            steps: Vec::new(),
            default_thresholds: Vec::new(),
        }
    }

    /// How iterations are started when the run configuration doesn't say otherwise.
    pub fn with_default_executor(mut self, executor: ExecutorConfig) -> Self {
        self.default_executor = Some(executor);
        self
    }

    /// Set the global setup hook [ScenarioDefinitionBuilder::setup_fn] for this scenario.
    pub fn use_setup(mut self, setup_fn: fn(&mut RunnerContext<RV>) -> HookResult) -> Self {
        self.setup_fn = Some(setup_fn);
        self
    }

    /// Append a step. Steps run in the order they are added.
    pub fn with_step(mut self, step: Step<RV, V>) -> Self {
        if self.steps.iter().any(|s| s.id() == step.id()) {
            panic!("Step [{}] is already defined", step.id());
        }

        self.steps.push(step);
        self
    }

    /// A threshold applied when the run configuration doesn't define any.
    pub fn with_default_threshold(mut self, threshold: Threshold) -> Self {
        self.default_thresholds.push(threshold);
        self
    }

    pub(crate) fn build(self) -> anyhow::Result<ScenarioDefinition<RV, V>> {
        let file = match &self.cli.config {
            Some(path) => RunConfig::load(path)?,
            None => RunConfig::default(),
        };

        let base_url = self
            .cli
            .base_url
            .or(file.base_url)
            .context("No base URL given, use --base-url, BASE_URL or `base_url` in the run configuration")?;

        let mut executor = file
            .scenario
            .or(self.default_executor)
            .context("No executor configured for this scenario")?;
        if let Some(duration) = self.cli.duration {
            executor = executor.with_planned_runtime(duration);
        }
        executor.validate().context("Invalid executor configuration")?;

        let thresholds = match file.thresholds {
            Some(thresholds) => thresholds
                .iter()
                .map(|t| t.to_threshold())
                .collect::<anyhow::Result<Vec<_>>>()?,
            None => self.default_thresholds,
        };

        let credentials = match (self.cli.email, self.cli.password) {
            (Some(email), Some(password)) => Some(Credentials { email, password }),
            (None, None) => file.credentials,
            _ => anyhow::bail!("--email and --password must be given together"),
        };

        if self.steps.is_empty() {
            anyhow::bail!("Scenario [{}] has no steps", self.name);
        }

        Ok(ScenarioDefinition {
            name: self.name,
            base_url,
            request_timeout: self
                .cli
                .timeout
                .or(file.request_timeout)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            executor,
            thresholds,
            credentials,
            reporter: self.cli.reporter,
            run_id: self.cli.run_id,
            no_progress: self.cli.no_progress,
            setup_fn: self.setup_fn,
            steps: self.steps,
        })
    }
}
