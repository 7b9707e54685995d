use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use gale_core::prelude::{IterationResult, StepFailure, StepResult, TemplateResolutionError};
use gale_instruments::CheckEvaluator;

use crate::context::{IterationContext, RunnerContext, UserValuesConstraint};
use crate::step::Step;

/// Run every step of a scenario once, in order.
///
/// HTTP failures are recorded and the iteration carries on with the next step. A step whose
/// templates cannot be resolved, or panic, is recorded as a template failure and ends the
/// iteration. A panicking capture stores nothing and the iteration carries on.
pub fn run_iteration<RV: UserValuesConstraint, V: UserValuesConstraint>(
    steps: &[Step<RV, V>],
    runner_context: &Arc<RunnerContext<RV>>,
    worker_id: &str,
    iteration: u64,
    worker_iteration: u64,
) -> IterationResult {
    let started = Instant::now();
    let mut ctx = IterationContext::<RV, V>::new(
        runner_context.clone(),
        worker_id.to_string(),
        iteration,
        worker_iteration,
    );

    let mut results = Vec::with_capacity(steps.len());
    for step in steps {
        let resolved = catch_unwind(AssertUnwindSafe(|| {
            step.resolve(&ctx, runner_context.http_client())
        }))
        .unwrap_or_else(|_| {
            Err(TemplateResolutionError::invalid(format!(
                "a template of step [{}] panicked",
                step.id()
            )))
        });
        let request = match resolved {
            Ok(request) => request,
            Err(e) => {
                log::warn!(
                    "Iteration {iteration} on {worker_id} stopped at step [{}]: {e}",
                    step.id()
                );
                results.push(StepResult::template_failure(step.id(), e));
                break;
            }
        };

        let response = runner_context
            .executor()
            .execute_in_place(runner_context.http_client().execute(request));
        if let Some(e) = &response.error {
            log::warn!("Step [{}] of iteration {iteration} failed: {e}", step.id());
        }

        let mut checks = CheckEvaluator::new();
        let expected_status = step.expected_status();
        checks.evaluate(&step.status_check_name(), &response, |r| {
            r.status == Some(expected_status)
        });
        for (name, check) in step.checks() {
            checks.evaluate(name, &response, *check);
        }

        if response.body.is_some() {
            if let Some(capture) = step.capture_fn() {
                match catch_unwind(AssertUnwindSafe(|| capture(&mut ctx, &response))) {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        log::warn!("Failed to capture output of step [{}]: {e:?}", step.id());
                    }
                    Err(_) => {
                        log::warn!("Capture for step [{}] panicked, nothing was stored", step.id());
                    }
                }
            }
        }

        results.push(StepResult {
            step_id: step.id().to_string(),
            status: response.status,
            latency: response.latency,
            checks: checks.into_results(),
            failure: response.error.map(StepFailure::Request),
        });
    }

    IterationResult {
        iteration,
        worker_id: worker_id.to_string(),
        steps: results,
        duration: started.elapsed(),
    }
}
