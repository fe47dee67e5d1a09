//! Shutdown signals.
//!
//! The first Ctrl-C stops accepting connections and lets running sessions
//! finish; a second Ctrl-C, or SIGTERM, cancels every session.

use tokio_util::sync::CancellationToken;

/// Watch for shutdown signals until `force` has been cancelled.
pub async fn watch(graceful: CancellationToken, force: CancellationToken) {
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "failed to listen for Ctrl-C");
                    return;
                }
                if graceful.is_cancelled() {
                    tracing::info!("force closing");
                    force.cancel();
                    return;
                }
                tracing::info!("shutting down gracefully, C-C to force close");
                graceful.cancel();
            }
            () = terminate() => {
                tracing::info!("terminated");
                force.cancel();
                return;
            }
            () = force.cancelled() => return,
        }
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
