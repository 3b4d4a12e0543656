//! OS signal handling.

use crate::server::shutdown::Shutdown;

/// Trigger `shutdown` on Ctrl-C.
pub async fn shutdown_on_ctrl_c(shutdown: Shutdown) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Shutdown signal received");
            shutdown.trigger();
        }
        Err(e) => tracing::error!(error = %e, "Failed to install Ctrl-C handler"),
    }
}
