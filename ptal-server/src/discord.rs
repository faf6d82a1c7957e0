//! Typed Discord REST client and the message wire types.
//!
//! Talks to `https://discord.com/api/v10` with bot-token auth. Only the
//! channel and message operations the notification paths need are exposed.
//! The payload types derive `PartialEq` so reconciliation can assert that an
//! unchanged PR composes an identical edit.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";
const USER_AGENT: &str = concat!("ptal-bot/", env!("CARGO_PKG_VERSION"));

/// Channel types that can hold a notification message: guild text,
/// announcement, and the thread variants.
const TEXT_CAPABLE_CHANNEL_TYPES: &[u8] = &[0, 5, 10, 11, 12];

#[derive(Clone)]
pub struct DiscordClient {
    client: Client,
    token: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
}

impl Channel {
    pub fn is_text_capable(&self) -> bool {
        TEXT_CAPABLE_CHANNEL_TYPES.contains(&self.kind)
    }
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
}

/// Body for both message creation (POST) and edits (PATCH); Discord accepts
/// the same shape for either.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub allowed_mentions: AllowedMentions,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AllowedMentions {
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: String,
    pub url: String,
    pub description: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl DiscordClient {
    pub fn new(token: String) -> Self {
        Self::with_base(token, DISCORD_API_BASE.to_string())
    }

    /// Point the client at a different API base (used by tests).
    pub fn with_base(token: String, api_base: String) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            token,
            api_base,
        }
    }

    pub async fn get_channel(&self, channel_id: &str) -> Result<Channel> {
        let url = format!("{}/channels/{}", self.api_base, channel_id);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .send()
            .await
            .context("Failed to send channel fetch")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .context("Failed to read error response body")?;
            return Err(anyhow!("Discord API error: {} - {}", status, error_text));
        }

        response.json().await.context("Failed to parse channel")
    }

    pub async fn get_message(&self, channel_id: &str, message_id: &str) -> Result<Message> {
        let url = format!(
            "{}/channels/{}/messages/{}",
            self.api_base, channel_id, message_id
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .send()
            .await
            .context("Failed to send message fetch")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .context("Failed to read error response body")?;
            return Err(anyhow!("Discord API error: {} - {}", status, error_text));
        }

        response.json().await.context("Failed to parse message")
    }

    pub async fn create_message(
        &self,
        channel_id: &str,
        payload: &OutgoingMessage,
    ) -> Result<Message> {
        let url = format!("{}/channels/{}/messages", self.api_base, channel_id);

        info!("Posting message to channel {}", channel_id);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .json(payload)
            .send()
            .await
            .context("Failed to send message create")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .context("Failed to read error response body")?;
            error!("Discord API error: {} - {}", status, error_text);
            return Err(anyhow!("Discord API error: {} - {}", status, error_text));
        }

        response
            .json()
            .await
            .context("Failed to parse created message")
    }

    pub async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        payload: &OutgoingMessage,
    ) -> Result<Message> {
        let url = format!(
            "{}/channels/{}/messages/{}",
            self.api_base, channel_id, message_id
        );

        let response = self
            .client
            .patch(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .json(payload)
            .send()
            .await
            .context("Failed to send message edit")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .context("Failed to read error response body")?;
            error!("Discord API error: {} - {}", status, error_text);
            return Err(anyhow!("Discord API error: {} - {}", status, error_text));
        }

        response
            .json()
            .await
            .context("Failed to parse edited message")
    }

    pub async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<()> {
        let url = format!(
            "{}/channels/{}/messages/{}",
            self.api_base, channel_id, message_id
        );

        let response = self
            .client
            .delete(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .send()
            .await
            .context("Failed to send message delete")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .context("Failed to read error response body")?;
            return Err(anyhow!("Discord API error: {} - {}", status, error_text));
        }

        Ok(())
    }
}
