use gale_core::prelude::ShutdownHandle;
use tokio::signal;

pub(crate) fn start_shutdown_listener(
    runtime: &tokio::runtime::Runtime,
) -> anyhow::Result<ShutdownHandle> {
    let handle = ShutdownHandle::default();

    let listener_handle = handle.clone();
    runtime.spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C, the run can only stop by itself: {e:?}");
            return;
        }
        println!("Received shutdown signal, letting in-flight iterations finish...");
        listener_handle.shutdown();
    });

    Ok(handle)
}
