//! Optional retention purge.
//!
//! Expiry is evaluated lazily on every read, so nothing depends on this task
//! for correctness. It only keeps long-dead rows from piling up.

use chrono::Duration;
use metrics::counter;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::{clock::Clock, store::SessionStore};

/// Delete sessions that ended more than `retention` ago.
pub async fn purge_once(
    store: &dyn SessionStore,
    clock: &dyn Clock,
    retention: Duration,
) -> Result<u64, anyhow::Error> {
    let cutoff = clock.now() - retention;
    let purged = store.purge_ended_before(cutoff).await?;
    if purged > 0 {
        counter!("sessions_purged_total").increment(purged);
        tracing::info!(purged, cutoff = %cutoff, "Purged ended sessions");
    }
    Ok(purged)
}

/// Spawn the periodic reaper. Returns `None` when retention is disabled.
pub fn spawn_reaper(
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    retention: Duration,
    interval: std::time::Duration,
) -> Option<JoinHandle<()>> {
    if retention <= Duration::zero() {
        tracing::info!("Session reaper disabled");
        return None;
    }

    tracing::info!(
        retention_days = retention.num_days(),
        interval_secs = interval.as_secs(),
        "Starting session reaper"
    );

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = purge_once(store.as_ref(), clock.as_ref(), retention).await {
                tracing::error!(error = %e, "Session purge failed");
            }
        }
    }))
}
