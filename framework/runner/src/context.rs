use std::{fmt::Debug, sync::Arc};

use chrono::{DateTime, Utc};
use gale_core::prelude::ShutdownHandle;
use gale_http_client::prelude::HttpClientInstrumented;
use gale_instruments::Reporter;

use crate::config::Credentials;
use crate::executor::Executor;

pub trait UserValuesConstraint: Default + Debug + Send + Sync + 'static {}

/// Everything that is shared by the whole run.
///
/// The setup hook gets mutable access to this context and may store values in it, for example an
/// auth token. After setup it is only read, by every worker at once.
#[derive(Debug)]
pub struct RunnerContext<RV: UserValuesConstraint> {
    executor: Arc<Executor>,
    reporter: Arc<Reporter>,
    http_client: HttpClientInstrumented,
    shutdown_handle: ShutdownHandle,
    scenario_name: String,
    run_id: String,
    started_at: DateTime<Utc>,
    credentials: Option<Credentials>,
    value: RV,
}

impl<RV: UserValuesConstraint> RunnerContext<RV> {
    pub(crate) fn new(
        executor: Arc<Executor>,
        reporter: Arc<Reporter>,
        http_client: HttpClientInstrumented,
        shutdown_handle: ShutdownHandle,
        scenario_name: String,
        run_id: String,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            executor,
            reporter,
            http_client,
            shutdown_handle,
            scenario_name,
            run_id,
            started_at: Utc::now(),
            credentials,
            value: Default::default(),
        }
    }

    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    pub fn reporter(&self) -> &Arc<Reporter> {
        &self.reporter
    }

    pub fn http_client(&self) -> &HttpClientInstrumented {
        &self.http_client
    }

    pub fn base_url(&self) -> &str {
        self.http_client.base_url()
    }

    pub fn scenario_name(&self) -> &str {
        &self.scenario_name
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// When the scenario started, taken before the setup hook runs.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Credentials from the command line or the run configuration, if any were given.
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Stop starting new iterations. Iterations already in flight finish normally.
    pub fn force_stop_scenario(&self) {
        self.shutdown_handle.shutdown();
    }

    pub fn get_mut(&mut self) -> &mut RV {
        &mut self.value
    }

    pub fn get(&self) -> &RV {
        &self.value
    }
}

/// What a step's templates can see while an iteration runs.
///
/// `V` holds the outputs captured by earlier steps of the same iteration and starts from
/// [Default] for every iteration.
pub struct IterationContext<RV: UserValuesConstraint, V: UserValuesConstraint> {
    runner_context: Arc<RunnerContext<RV>>,
    worker_id: String,
    iteration: u64,
    worker_iteration: u64,
    value: V,
}

impl<RV: UserValuesConstraint, V: UserValuesConstraint> IterationContext<RV, V> {
    pub(crate) fn new(
        runner_context: Arc<RunnerContext<RV>>,
        worker_id: String,
        iteration: u64,
        worker_iteration: u64,
    ) -> Self {
        Self {
            runner_context,
            worker_id,
            iteration,
            worker_iteration,
            value: Default::default(),
        }
    }

    pub fn runner_context(&self) -> &Arc<RunnerContext<RV>> {
        &self.runner_context
    }

    /// Shorthand for the value stored by the setup hook.
    pub fn setup(&self) -> &RV {
        self.runner_context.get()
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Index of this iteration across the whole scenario.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Index of this iteration among those run by this worker.
    pub fn worker_iteration(&self) -> u64 {
        self.worker_iteration
    }

    pub fn get_mut(&mut self) -> &mut V {
        &mut self.value
    }

    pub fn get(&self) -> &V {
        &self.value
    }
}
