//! Periodic sweep over every tracked notification.
//!
//! Records are reconciled sequentially with a pause between items so one
//! sweep never bursts against the GitHub or Discord rate limits; the latency
//! cost is accepted. A record that fails is logged and skipped, and the next
//! tick is its retry.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::time::{interval, sleep};
use tracing::{error, info};

use crate::db::NotificationRecord;
use crate::reconcile::reconcile;
use crate::AppState;

pub async fn sweep_loop(state: Arc<AppState>) {
    let mut ticker = interval(state.sweep_interval);

    loop {
        ticker.tick().await;

        if let Err(e) = run_sweep(&state).await {
            // Store unreachable: skip this cycle, the next tick retries.
            error!("Sweep cycle failed: {:#}", e);
        }
    }
}

async fn run_sweep(state: &Arc<AppState>) -> Result<()> {
    let records = state.db.all_notifications()?;
    if records.is_empty() {
        return Ok(());
    }

    info!("Sweeping {} tracked notification(s)", records.len());

    sweep_records(&records, state.sweep_item_delay, |record| async move {
        reconcile(state, record).await
    })
    .await;

    Ok(())
}

/// Drive one pass over the given records: strictly sequential, delayed
/// between items, with per-record failures logged and swallowed.
pub async fn sweep_records<'a, F, Fut>(
    records: &'a [NotificationRecord],
    item_delay: Duration,
    mut reconcile_one: F,
) where
    F: FnMut(&'a NotificationRecord) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    for record in records {
        if let Err(e) = reconcile_one(record).await {
            error!(
                "Failed to reconcile notification {} (PR #{} in {}/{}): {:#}",
                record.id, record.pr_number, record.repo_owner, record.repo_name, e
            );
        }
        sleep(item_delay).await;
    }
}
