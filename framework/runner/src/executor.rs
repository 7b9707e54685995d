use std::future::Future;

use gale_core::prelude::{ShutdownHandle, ShutdownSignalError};

#[derive(Debug)]
pub struct Executor {
    runtime: tokio::runtime::Runtime,
    shutdown_handle: ShutdownHandle,
}

impl Executor {
    pub(crate) fn new(runtime: tokio::runtime::Runtime, shutdown_handle: ShutdownHandle) -> Self {
        Self {
            runtime,
            shutdown_handle,
        }
    }

    /// Run async code in place, blocking until it completes.
    ///
    /// The future always runs to completion, even if the run is stopping, so that an iteration
    /// which has already started is recorded in full. Any I/O it does must be bounded, the HTTP
    /// client's timeout does this for requests.
    pub fn execute_in_place<T>(&self, fut: impl Future<Output = T>) -> T {
        self.runtime.block_on(fut)
    }

    /// Run async code in place, blocking until it completes or the run is stopped.
    ///
    /// Meant for hooks, such as setup, which should not hold up a stop requested with Ctrl-C. If
    /// the run is stopped first then the future is dropped and a [ShutdownSignalError] is returned.
    pub fn execute_in_place_or_stop<T>(
        &self,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        let mut shutdown_listener = self.shutdown_handle.new_listener();
        self.runtime.block_on(async move {
            tokio::select! {
                result = fut => result,
                _ = shutdown_listener.wait_for_shutdown() => {
                    Err(anyhow::anyhow!(ShutdownSignalError::default()))
                },
            }
        })
    }

    /// Submit async code to be run in the background.
    ///
    /// Note that the future will not be cancelled if the run is stopped. It is also not guaranteed
    /// that the runner will wait for the future to complete before shutting down.
    pub fn spawn(&self, fut: impl Future<Output = ()> + Send + 'static) {
        self.runtime.spawn(fut);
    }
}
