//! Periodic teardown of abandoned contribution sessions.
//!
//! Contributors who close the browser mid-wizard never say goodbye; their
//! sessions are dropped once idle past the configured timeout. Dropping a
//! session discards its draft and cancels any scheduled reset.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::sessions::SessionRegistry;

/// Longest pause between sweeps.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Sweep at a fraction of the idle timeout so sessions do not outlive it by
/// much, but never more often than once a second.
fn sweep_interval(idle_timeout: Duration) -> Duration {
    (idle_timeout / 4).clamp(Duration::from_secs(1), MAX_SWEEP_INTERVAL)
}

/// Run the sweeper loop until `cancel` is triggered.
pub async fn run(
    sessions: Arc<SessionRegistry>,
    idle_timeout: Duration,
    cancel: CancellationToken,
) {
    let period = sweep_interval(idle_timeout);
    tracing::info!(
        idle_timeout_secs = idle_timeout.as_secs(),
        interval_secs = period.as_secs(),
        "Session sweeper started"
    );

    let mut interval = tokio::time::interval(period);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session sweeper stopping");
                break;
            }
            _ = interval.tick() => {
                let removed = sessions.sweep_idle(idle_timeout).await;
                if removed > 0 {
                    tracing::info!(removed, "Idle contribution sessions torn down");
                } else {
                    tracing::debug!("Session sweep: nothing idle");
                }
            }
        }
    }
}
