pub mod bus;
pub mod config;
pub mod db;
pub mod discord;
pub mod embed;
pub mod github;
pub mod notify;
pub mod ptal;
pub mod reconcile;
pub mod sweep;
pub mod tasks;
pub mod webhook;

use std::time::Duration;

use crate::bus::EventBus;
use crate::db::Database;
use crate::discord::DiscordClient;
use crate::github::GitHubClient;
use crate::tasks::TaskRegistry;

pub fn get_bot_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Everything the request handlers and background loops share. Constructed
/// once at startup and passed around behind an `Arc`; no lazily-initialized
/// globals.
pub struct AppState {
    pub github: GitHubClient,
    pub discord: DiscordClient,
    pub db: Database,
    pub bus: EventBus,
    pub tasks: TaskRegistry,
    pub webhook_secret: String,
    pub sweep_interval: Duration,
    pub sweep_item_delay: Duration,
    pub error_message_grace: Duration,
}
