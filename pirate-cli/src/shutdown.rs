//! On `SIGINT`/`SIGTERM`: stop reserving new jobs, give in-flight work up
//! to `shutdown_timeout` to finish, then return regardless. A worker loop
//! that times out leaves its last job's lease to expire naturally and the
//! job lands back on its queue, same as any other abandoned lease.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

pub fn install() -> CancellationToken {
    let token = CancellationToken::new();
    let watched = token.clone();

    tokio::spawn(async move {
        let ctrl_c = async {
            let _ = tokio::signal::ctrl_c().await;
        };

        #[cfg(unix)]
        let terminate = async {
            let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("install SIGTERM handler");
            sigterm.recv().await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate => {}
        }

        tracing::info!("shutdown signal received, draining in-flight work");
        watched.cancel();
    });

    token
}

/// Await `handle`, cutting it off after `SHUTDOWN_TIMEOUT` once `token` is
/// cancelled. Returns once the worker loop exits or the grace period
/// elapses, whichever comes first.
pub async fn drain(token: CancellationToken, handle: tokio::task::JoinHandle<()>) {
    token.cancelled().await;
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await.is_err() {
        tracing::warn!(timeout = ?SHUTDOWN_TIMEOUT, "in-flight work did not finish before the shutdown grace period, leases will expire naturally");
    }
}
