//! Single-record reconciliation: re-fetch authoritative PR state and bring
//! the tracked Discord message back in line with it.

use anyhow::Result;
use tracing::{debug, info};

use ptal_core::reduce_reviews;

use crate::db::NotificationRecord;
use crate::embed::compose;
use crate::AppState;

/// Reconcile one tracked notification against live PR state.
///
/// A vanished channel or message is a silent per-record abort, not an error:
/// channels disappear when the bot leaves a server and users delete messages,
/// and neither should count as a sweep failure. Genuine API failures
/// propagate to the caller, which logs and moves on; a single record never
/// fails a batch.
pub async fn reconcile(state: &AppState, record: &NotificationRecord) -> Result<()> {
    let (snapshot, raw_reviews) = tokio::try_join!(
        state
            .github
            .get_pull_request(&record.repo_owner, &record.repo_name, record.pr_number),
        state
            .github
            .list_reviews(&record.repo_owner, &record.repo_name, record.pr_number),
    )?;

    let channel = match state.discord.get_channel(&record.channel_id).await {
        Ok(channel) => channel,
        Err(e) => {
            debug!(
                "Skipping notification {}: channel {} unavailable: {:#}",
                record.id, record.channel_id, e
            );
            return Ok(());
        }
    };
    if !channel.is_text_capable() {
        debug!(
            "Skipping notification {}: channel {} is not text-capable",
            record.id, record.channel_id
        );
        return Ok(());
    }

    if let Err(e) = state
        .discord
        .get_message(&record.channel_id, &record.message_id)
        .await
    {
        debug!(
            "Skipping notification {}: message {} unavailable: {:#}",
            record.id, record.message_id, e
        );
        return Ok(());
    }

    let reviews = reduce_reviews(&raw_reviews);
    let mention_role = state
        .db
        .guild_config(&record.guild_id)?
        .and_then(|config| config.mention_role_id);
    let payload = compose(&snapshot, &reviews, &record.description, mention_role.as_deref());

    state
        .discord
        .edit_message(&record.channel_id, &record.message_id, &payload)
        .await?;

    if snapshot.merged {
        state.db.delete_notification(record.id)?;
        info!(
            "PR #{} in {}/{} merged, removed notification {}",
            record.pr_number, record.repo_owner, record.repo_name, record.id
        );
    }

    Ok(())
}
