//! Scheduled-campaign sweep — polls the store for due campaigns and hands
//! each to the dispatcher.
//!
//! One campaign's failure never stops the sweep; a campaign that fails
//! before its first send stays scheduled and is retried on a later pass.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::SchedulerConfig;
use crate::dispatch::{BatchDispatcher, DispatchOutcome};
use crate::store::Store;

/// Spawn the background sweep task.
///
/// Returns a `JoinHandle` and a shutdown flag. Set the flag to stop
/// sweeping after the current tick.
pub fn spawn_scheduler(
    config: SchedulerConfig,
    store: Arc<dyn Store>,
    dispatcher: Arc<BatchDispatcher>,
) -> (JoinHandle<()>, Arc<AtomicBool>) {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);

    let handle = tokio::spawn(async move {
        info!(
            interval_secs = config.interval.as_secs(),
            window_secs = config.window.as_secs(),
            "Campaign scheduler started"
        );

        let mut tick = tokio::time::interval(config.interval);
        // Skip immediate first tick
        tick.tick().await;

        loop {
            tick.tick().await;

            if shutdown.load(Ordering::Relaxed) {
                info!("Campaign scheduler shutting down");
                return;
            }

            sweep_once(&config, &store, &dispatcher).await;
        }
    });

    (handle, shutdown_flag)
}

/// Run a single sweep: find due campaigns and dispatch each in turn.
pub async fn sweep_once(
    config: &SchedulerConfig,
    store: &Arc<dyn Store>,
    dispatcher: &Arc<BatchDispatcher>,
) {
    let due_before = Utc::now()
        + chrono::Duration::from_std(config.window).unwrap_or_else(|_| chrono::Duration::zero());

    let due = match store.list_due_campaigns(due_before).await {
        Ok(campaigns) => campaigns,
        Err(e) => {
            error!(error = %e, "Failed to load due campaigns");
            return;
        }
    };

    if due.is_empty() {
        return;
    }
    info!(count = due.len(), "Dispatching due scheduled campaigns");

    for campaign in due {
        match dispatcher.dispatch(campaign.id).await {
            Ok(DispatchOutcome::Completed(summary)) => {
                info!(
                    campaign = %campaign.id,
                    delivered = summary.delivered,
                    blocked = summary.blocked,
                    failed = summary.failed,
                    "Scheduled campaign dispatched"
                );
            }
            Ok(DispatchOutcome::QuotaExceeded { remaining, requested, .. }) => {
                // Stays scheduled; a later sweep retries once quota frees up.
                warn!(
                    campaign = %campaign.id,
                    requested,
                    remaining,
                    "Scheduled campaign deferred — quota exceeded"
                );
            }
            Err(e) => {
                error!(campaign = %campaign.id, error = %e, "Scheduled campaign dispatch failed");
            }
        }
    }
}
