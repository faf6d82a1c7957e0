//! Notification creation: the shared path behind the user command and the
//! automation fan-out.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{error, info, warn};

use ptal_core::reduce_reviews;

use crate::bus::{Event, EventHandler};
use crate::db::{NewNotification, NotificationRecord};
use crate::discord::OutgoingMessage;
use crate::embed::compose;
use crate::AppState;

/// Description used for notifications created from automation events, which
/// carry no free text of their own.
pub const AUTOMATION_DESCRIPTION: &str = "Automated sync PR";

#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub guild_id: String,
    pub channel_id: String,
    pub repo_owner: String,
    pub repo_name: String,
    pub pr_number: u64,
    pub description: String,
}

/// Post a new PTAL message and persist its tracking record.
///
/// Nothing is persisted unless the message was actually posted; errors
/// before that point surface to the caller untouched.
pub async fn create_notification(
    state: &AppState,
    req: &CreateNotification,
) -> Result<NotificationRecord> {
    let (snapshot, raw_reviews) = tokio::try_join!(
        state
            .github
            .get_pull_request(&req.repo_owner, &req.repo_name, req.pr_number),
        state
            .github
            .list_reviews(&req.repo_owner, &req.repo_name, req.pr_number),
    )?;

    let reviews = reduce_reviews(&raw_reviews);
    let mention_role = state
        .db
        .guild_config(&req.guild_id)?
        .and_then(|config| config.mention_role_id);
    let payload = compose(&snapshot, &reviews, &req.description, mention_role.as_deref());

    let message = state
        .discord
        .create_message(&req.channel_id, &payload)
        .await?;

    let new = NewNotification {
        guild_id: req.guild_id.clone(),
        channel_id: req.channel_id.clone(),
        message_id: message.id.clone(),
        repo_owner: req.repo_owner.clone(),
        repo_name: req.repo_name.clone(),
        pr_number: req.pr_number,
        description: req.description.clone(),
    };
    let id = state
        .db
        .insert_notification(&new)
        .context("Posted message but failed to persist its tracking record")?;

    info!(
        "Tracking PR #{} in {}/{} as notification {} (message {})",
        req.pr_number, req.repo_owner, req.repo_name, id, message.id
    );

    state
        .db
        .get_notification(id)?
        .context("Inserted notification row is missing")
}

/// Run the creation in the background, registered in the task registry under
/// the given key so the triggering request can return immediately.
pub fn spawn_notification(state: Arc<AppState>, key: String, req: CreateNotification) {
    let registry = state.tasks.clone();
    let handle = tokio::spawn(async move {
        if let Err(e) = create_notification(&state, &req).await {
            error!(
                "Background notification for PR #{} in {}/{} failed: {:#}",
                req.pr_number, req.repo_owner, req.repo_name, e
            );
            report_failure(&state, &req.channel_id, &e).await;
        }
    });
    registry.register(key, handle);
}

/// Best-effort failure report: post a short error message to the channel and
/// delete it again after the grace period. Nothing here may fail loudly.
async fn report_failure(state: &AppState, channel_id: &str, err: &anyhow::Error) {
    let payload = OutgoingMessage {
        content: Some(format!("Could not post review notification: {:#}", err)),
        ..Default::default()
    };

    match state.discord.create_message(channel_id, &payload).await {
        Ok(message) => {
            sleep(state.error_message_grace).await;
            if let Err(e) = state.discord.delete_message(channel_id, &message.id).await {
                warn!("Failed to clean up error message {}: {:#}", message.id, e);
            }
        }
        Err(e) => {
            warn!(
                "Failed to post error report to channel {}: {:#}",
                channel_id, e
            );
        }
    }
}

/// Bus handler for automation events: fan one incoming PR signal out to
/// every channel that already tracks the repository.
pub struct AutomationFanout {
    pub state: Arc<AppState>,
}

#[async_trait]
impl EventHandler for AutomationFanout {
    async fn handle(&self, event: Event) -> Result<()> {
        let Event::AutomationPullRequest {
            repo_owner,
            repo_name,
            pr_number,
            html_url,
        } = event;

        let records = self
            .state
            .db
            .notifications_for_repo(&repo_owner, &repo_name)?;

        let destinations = fanout_destinations(&records, pr_number);
        if destinations.is_empty() {
            info!(
                "No destinations tracking {}/{}, ignoring automation PR {}",
                repo_owner, repo_name, html_url
            );
            return Ok(());
        }

        info!(
            "Fanning out automation PR #{} in {}/{} to {} destination(s)",
            pr_number,
            repo_owner,
            repo_name,
            destinations.len()
        );

        for (guild_id, channel_id) in destinations {
            let req = CreateNotification {
                guild_id,
                channel_id,
                repo_owner: repo_owner.clone(),
                repo_name: repo_name.clone(),
                pr_number,
                description: AUTOMATION_DESCRIPTION.to_string(),
            };
            // One failing destination must not starve the rest.
            if let Err(e) = create_notification(&self.state, &req).await {
                error!(
                    "Automation fan-out to channel {} failed: {:#}",
                    req.channel_id, e
                );
            }
        }

        Ok(())
    }
}

/// Distinct (guild, channel) pairs among the records, skipping channels that
/// already track this exact PR so a redelivered webhook cannot double-post.
fn fanout_destinations(
    records: &[NotificationRecord],
    pr_number: u64,
) -> Vec<(String, String)> {
    let mut destinations: Vec<(String, String)> = Vec::new();

    for record in records {
        let pair = (record.guild_id.clone(), record.channel_id.clone());
        if !destinations.contains(&pair) {
            destinations.push(pair);
        }
    }

    destinations.retain(|(_, channel_id)| {
        !records
            .iter()
            .any(|r| &r.channel_id == channel_id && r.pr_number == pr_number)
    });

    destinations
}
