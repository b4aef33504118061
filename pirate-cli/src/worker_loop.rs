use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Repeatedly call `step` until `token` is cancelled. `step` returns `Ok(true)`
/// when it did work (poll again immediately) or `Ok(false)` when its queue
/// was empty (back off for `poll_interval`). Errors are logged and treated
/// like an empty poll rather than stopping the loop.
pub async fn run_loop<S, Fut>(worker: &str, token: CancellationToken, poll_interval: Duration, mut step: S)
where
    S: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<bool>>,
{
    while !token.is_cancelled() {
        match step().await {
            Ok(true) => {}
            Ok(false) => tokio::time::sleep(poll_interval).await,
            Err(e) => {
                tracing::error!(worker, error = %e, "worker step failed");
                tokio::time::sleep(poll_interval).await;
            }
        }
    }
    tracing::info!(worker, "worker loop stopped reserving new jobs");
}
