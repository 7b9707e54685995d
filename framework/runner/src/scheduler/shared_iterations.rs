use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use gale_core::prelude::ShutdownHandle;

use crate::context::UserValuesConstraint;
use crate::scheduler::{worker_name, IterationRunner, ScheduleSummary};

/// Run `iterations` iterations in total, shared between `workers` workers that each claim the next
/// index as soon as they are free.
///
/// Each iteration is followed by `pause`, if set. When the run is stopped no more indices are
/// claimed and whatever is left is counted as abandoned.
pub(crate) fn run_shared_iterations<RV: UserValuesConstraint, V: UserValuesConstraint>(
    runner: IterationRunner<RV, V>,
    shutdown_handle: &ShutdownHandle,
    iterations: u64,
    workers: usize,
    pause: Option<Duration>,
) -> anyhow::Result<ScheduleSummary> {
    runner
        .counters()
        .scheduled
        .store(iterations, Ordering::Release);
    let next = Arc::new(AtomicU64::new(0));

    let mut handles = Vec::with_capacity(workers);
    for index in 0..workers {
        let runner = runner.clone();
        let next = next.clone();
        let mut shutdown_listener = shutdown_handle.new_listener();
        let worker_id = worker_name(index);

        let spawned = std::thread::Builder::new()
            .name(worker_id.clone())
            .spawn(move || {
                log::debug!("Starting {worker_id}");
                let executor = runner.runner_context().executor().clone();

                let mut worker_iteration = 0;
                loop {
                    if shutdown_listener.should_shutdown() {
                        break;
                    }

                    let iteration = next.fetch_add(1, Ordering::AcqRel);
                    if iteration >= iterations {
                        break;
                    }

                    runner.run_one(&worker_id, iteration, worker_iteration);
                    worker_iteration += 1;

                    let Some(pause) = pause else {
                        continue;
                    };
                    if next.load(Ordering::Acquire) >= iterations {
                        // Nothing left to claim, no point waiting.
                        break;
                    }
                    executor.execute_in_place(async {
                        tokio::select! {
                            _ = tokio::time::sleep(pause) => {}
                            _ = shutdown_listener.wait_for_shutdown() => {}
                        }
                    });
                }

                log::debug!("Stopping {worker_id}");
            })
            .with_context(|| format!("Failed to spawn thread for {}", worker_name(index)));

        match spawned {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                // Let the workers that did start wind down before giving up.
                shutdown_handle.shutdown();
                for handle in handles {
                    let _ = handle.join();
                }
                return Err(e);
            }
        }
    }

    runner
        .counters()
        .workers
        .store(handles.len(), Ordering::Release);
    for handle in handles {
        handle
            .join()
            .map_err(|e| anyhow::anyhow!("Error joining thread for worker: {:?}", e))?;
    }

    let claimed = next.load(Ordering::Acquire).min(iterations);
    runner
        .counters()
        .abandoned
        .store(iterations - claimed, Ordering::Release);

    Ok(runner.summary())
}
