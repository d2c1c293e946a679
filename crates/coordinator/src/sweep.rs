//! Periodic eviction of idle sessions.

use crate::coordinator::UploadCoordinator;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Spawn a background task that evicts expired sessions on an interval.
///
/// The task runs until `cancel` fires. Eviction also happens lazily on
/// append; the sweeper exists so an idle coordinator still reclaims staging
/// disk and capacity slots.
pub fn spawn_sweeper(
    coordinator: Arc<UploadCoordinator>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "session sweeper started");
        let mut ticker = tokio::time::interval(interval);
        // the first tick fires immediately; skip it
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("session sweeper stopped");
                    return;
                }
                _ = ticker.tick() => {
                    let evicted = coordinator.evict_expired().await;
                    if evicted > 0 {
                        info!(evicted, "sweeper evicted expired sessions");
                    } else {
                        debug!("sweep found no expired sessions");
                    }
                }
            }
        }
    })
}
