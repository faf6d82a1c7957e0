use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    pub discord_bot_token: String,
    pub github_token: String,
    pub github_webhook_secret: String,
    pub port: u16,
    /// Directory for persistent state (SQLite database).
    /// Defaults to current working directory.
    pub state_dir: PathBuf,
    /// How often the sweep re-reconciles every tracked notification.
    /// This interval doubles as the retry budget for transient failures.
    pub sweep_interval: Duration,
    /// Pause between records within one sweep, to stay clear of
    /// GitHub and Discord rate limits.
    pub sweep_item_delay: Duration,
    /// How long a best-effort error message stays visible before it
    /// is deleted again.
    pub error_message_grace: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let discord_bot_token = env::var("DISCORD_BOT_TOKEN")
            .context("DISCORD_BOT_TOKEN environment variable is required")?;

        let github_token =
            env::var("GITHUB_TOKEN").context("GITHUB_TOKEN environment variable is required")?;

        let github_webhook_secret = env::var("GITHUB_WEBHOOK_SECRET")
            .context("GITHUB_WEBHOOK_SECRET environment variable is required")?;

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid number")?;

        let state_dir = env::var("STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        let sweep_interval_secs = env::var("SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse::<u64>()
            .context("SWEEP_INTERVAL_SECS must be a valid number")?;

        let sweep_item_delay_ms = env::var("SWEEP_ITEM_DELAY_MS")
            .unwrap_or_else(|_| "2000".to_string())
            .parse::<u64>()
            .context("SWEEP_ITEM_DELAY_MS must be a valid number")?;

        let error_message_grace_secs = env::var("ERROR_MESSAGE_GRACE_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .context("ERROR_MESSAGE_GRACE_SECS must be a valid number")?;

        Ok(Config {
            discord_bot_token,
            github_token,
            github_webhook_secret,
            port,
            state_dir,
            sweep_interval: Duration::from_secs(sweep_interval_secs),
            sweep_item_delay: Duration::from_millis(sweep_item_delay_ms),
            error_message_grace: Duration::from_secs(error_message_grace_secs),
        })
    }
}
