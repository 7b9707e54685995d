use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Context;
use gale_core::prelude::ShutdownHandle;
use parking_lot::Mutex;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{self, Receiver};

use crate::context::UserValuesConstraint;
use crate::scheduler::{worker_name, IterationRunner, ScheduleSummary};

/// An arrival that could not be handed to a worker in time.
#[derive(derive_more::Display, Debug)]
#[display("Scheduling miss: iteration {iteration} due at {due:?} found all {workers} workers busy and the queue full")]
struct SchedulingMiss {
    iteration: u64,
    due: Duration,
    workers: usize,
}

/// Start iteration `k` at `k * time_unit / rate` from now, for every start that falls before
/// `duration`.
///
/// The clock never waits for workers. Arrivals are queued for the next free worker, and workers
/// are created as needed up to `pre_allocated_workers`. An arrival that finds the queue full is
/// dropped and counted as a scheduling miss.
///
/// Once the clock stops, or the run is stopped, arrivals still waiting in the queue are abandoned
/// while iterations already started run to completion.
pub(crate) fn run_constant_arrival_rate<RV: UserValuesConstraint, V: UserValuesConstraint>(
    runner: IterationRunner<RV, V>,
    shutdown_handle: &ShutdownHandle,
    rate: u32,
    time_unit: Duration,
    duration: Duration,
    pre_allocated_workers: usize,
) -> anyhow::Result<ScheduleSummary> {
    let (sender, receiver) = mpsc::channel::<u64>(pre_allocated_workers);
    let receiver = Arc::new(Mutex::new(receiver));
    let idle = Arc::new(AtomicUsize::new(0));
    let mut workers: Vec<JoinHandle<()>> = Vec::new();

    let executor = runner.runner_context().executor().clone();
    let mut spawn_error = None;
    executor.execute_in_place(async {
        let mut shutdown_listener = shutdown_handle.new_listener();
        let start = tokio::time::Instant::now();

        for k in 0u64.. {
            let offset = time_unit.mul_f64(k as f64 / rate as f64);
            if offset >= duration {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep_until(start + offset) => {}
                _ = shutdown_listener.wait_for_shutdown() => break,
            }
            if shutdown_listener.should_shutdown() {
                break;
            }

            runner.counters().scheduled.fetch_add(1, Ordering::AcqRel);

            if idle.load(Ordering::Acquire) == 0 && workers.len() < pre_allocated_workers {
                match spawn_worker(
                    workers.len(),
                    runner.clone(),
                    receiver.clone(),
                    idle.clone(),
                    shutdown_handle,
                ) {
                    Ok(handle) => workers.push(handle),
                    Err(e) => {
                        spawn_error = Some(e);
                        shutdown_handle.shutdown();
                        break;
                    }
                }
            }

            match sender.try_send(k) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    runner.counters().dropped.fetch_add(1, Ordering::AcqRel);
                    log::warn!(
                        "{}",
                        SchedulingMiss {
                            iteration: k,
                            due: offset,
                            workers: workers.len(),
                        }
                    );
                }
                Err(TrySendError::Closed(_)) => break,
            }
        }

        // Keep the queue open until the run stops so that the last arrivals can still be picked up.
        shutdown_listener.wait_for_shutdown().await;
    });

    // Workers drain whatever is left in the queue and exit once it is empty.
    drop(sender);

    runner
        .counters()
        .workers
        .store(workers.len(), Ordering::Release);
    for handle in workers {
        handle
            .join()
            .map_err(|e| anyhow::anyhow!("Error joining thread for worker: {:?}", e))?;
    }

    if let Some(e) = spawn_error {
        return Err(e);
    }

    Ok(runner.summary())
}

fn spawn_worker<RV: UserValuesConstraint, V: UserValuesConstraint>(
    index: usize,
    runner: IterationRunner<RV, V>,
    receiver: Arc<Mutex<Receiver<u64>>>,
    idle: Arc<AtomicUsize>,
    shutdown_handle: &ShutdownHandle,
) -> anyhow::Result<JoinHandle<()>> {
    let worker_id = worker_name(index);
    let shutdown_listener = shutdown_handle.new_listener();

    // Counted as idle from the start so the next arrival doesn't spawn another worker while this
    // one is still starting up.
    idle.fetch_add(1, Ordering::AcqRel);
    log::debug!("Starting {worker_id}");

    std::thread::Builder::new()
        .name(worker_id.clone())
        .spawn(move || {
            let mut worker_iteration = 0;
            loop {
                let Some(iteration) = receiver.lock().blocking_recv() else {
                    break;
                };

                if shutdown_listener.should_shutdown() {
                    runner.counters().abandoned.fetch_add(1, Ordering::AcqRel);
                    continue;
                }

                idle.fetch_sub(1, Ordering::AcqRel);
                runner.run_one(&worker_id, iteration, worker_iteration);
                worker_iteration += 1;
                idle.fetch_add(1, Ordering::AcqRel);
            }

            log::debug!("Stopping {worker_id}");
        })
        .with_context(|| format!("Failed to spawn thread for {}", worker_name(index)))
}
