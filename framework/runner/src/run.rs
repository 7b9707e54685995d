use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use gale_http_client::prelude::HttpClientInstrumented;
use gale_instruments::{ReportConfig, ThresholdAggregator};

use crate::cli::ReporterOpt;
use crate::config::ExecutorConfig;
use crate::monitor::start_monitor;
use crate::progress::start_progress;
use crate::report::RunReport;
use crate::scheduler::{run_constant_arrival_rate, run_shared_iterations, IterationRunner};
use crate::{
    context::{RunnerContext, UserValuesConstraint},
    definition::ScenarioDefinitionBuilder,
    executor::Executor,
    shutdown::start_shutdown_listener,
};

/// Run a scenario to the end and report on it.
///
/// Returns an error if the scenario cannot start, for example because the setup hook failed. A run
/// that starts always produces a [RunReport], whether or not its thresholds held.
pub fn run<RV: UserValuesConstraint, V: UserValuesConstraint>(
    definition: ScenarioDefinitionBuilder<RV, V>,
) -> anyhow::Result<RunReport> {
    let definition = definition.build()?;

    log::info!("Running scenario: {}", definition.name);

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let shutdown_handle = start_shutdown_listener(&runtime)?;
    let executor = Arc::new(Executor::new(runtime, shutdown_handle.clone()));
    let reporter = Arc::new(match definition.reporter {
        ReporterOpt::InMemory => ReportConfig::default().enable_summary().init(),
        ReporterOpt::Noop => ReportConfig::default().init(),
    });
    let http_client = HttpClientInstrumented::new(
        &definition.base_url,
        definition.request_timeout,
        reporter.clone(),
    )?;
    let run_id = definition
        .run_id
        .clone()
        .unwrap_or_else(|| nanoid::nanoid!());

    let mut runner_context = RunnerContext::new(
        executor,
        reporter,
        http_client,
        shutdown_handle.clone(),
        definition.name.clone(),
        run_id.clone(),
        definition.credentials.clone(),
    );

    if let Some(setup_fn) = definition.setup_fn {
        if let Err(e) = setup_fn(&mut runner_context) {
            log::error!("Setup failed for scenario {}: {e:?}", definition.name);
            shutdown_handle.shutdown();
            return Err(e);
        }
    }

    log::info!("Setup done, run {run_id} starts with {}", definition.executor);

    let planned_runtime = definition.executor.planned_runtime();
    if !definition.no_progress {
        start_progress(planned_runtime, shutdown_handle.new_listener())?;
    }

    // Set a timer to stop starting iterations once the planned runtime has elapsed
    {
        let shutdown_handle = shutdown_handle.clone();
        runner_context.executor().spawn(async move {
            tokio::time::sleep(planned_runtime).await;
            log::debug!("Planned runtime elapsed");
            shutdown_handle.shutdown();
        });
    }

    let runner_context = Arc::new(runner_context);

    // Ready to start workers so start the resource monitor to report high usage, which might lead
    // to misleading latencies.
    start_monitor(shutdown_handle.new_listener())?;

    let aggregator = Arc::new(ThresholdAggregator::new(
        definition.thresholds,
        shutdown_handle.clone(),
    ));
    let runner = IterationRunner::new(definition.steps, runner_context.clone(), aggregator.clone());

    let started = Instant::now();
    let schedule = match definition.executor {
        ExecutorConfig::ConstantArrivalRate {
            rate,
            time_unit,
            duration,
            pre_allocated_workers,
        } => run_constant_arrival_rate(
            runner,
            &shutdown_handle,
            rate,
            time_unit,
            duration,
            pre_allocated_workers,
        ),
        ExecutorConfig::SharedIterations {
            iterations,
            workers,
            pause,
            ..
        } => run_shared_iterations(runner, &shutdown_handle, iterations, workers, pause),
    };

    // Stop the timer, progress bar and monitor if the scheduler finished on its own.
    shutdown_handle.shutdown();
    let schedule = schedule?;

    runner_context.reporter().finalize();

    let report = RunReport {
        scenario_name: definition.name,
        run_id,
        elapsed: started.elapsed(),
        schedule,
        metrics: aggregator.snapshot(),
        verdict: aggregator.evaluate(),
        aborted_by: aggregator.aborted_by(),
    };
    report.print_summary();

    Ok(report)
}
