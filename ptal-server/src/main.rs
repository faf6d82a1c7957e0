use anyhow::Result;
use axum::{
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};

use ptal_server::bus::{EventBus, EventKind};
use ptal_server::config::Config;
use ptal_server::db::Database;
use ptal_server::discord::DiscordClient;
use ptal_server::github::GitHubClient;
use ptal_server::notify::AutomationFanout;
use ptal_server::ptal::ptal_handler;
use ptal_server::sweep::sweep_loop;
use ptal_server::tasks::TaskRegistry;
use ptal_server::webhook::webhook_router;
use ptal_server::AppState;

async fn health_check() -> Result<Json<serde_json::Value>, StatusCode> {
    Ok(Json(json!({
        "status": "healthy",
        "service": "ptal-bot",
        "version": ptal_server::get_bot_version()
    })))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("Starting PTAL notification bot");

    let config =
        Config::from_env().expect("Failed to load configuration from environment variables");

    let github = GitHubClient::new(config.github_token);
    let discord = DiscordClient::new(config.discord_bot_token);

    let db_path = config.state_dir.join("ptal-bot.db");
    info!("Using state database: {}", db_path.display());
    let db = Database::new(&db_path).expect("Failed to initialize SQLite database");

    let app_state = Arc::new(AppState {
        github,
        discord,
        db,
        bus: EventBus::new(),
        tasks: TaskRegistry::new(),
        webhook_secret: config.github_webhook_secret,
        sweep_interval: config.sweep_interval,
        sweep_item_delay: config.sweep_item_delay,
        error_message_grace: config.error_message_grace,
    });

    // All subscriptions happen here, before the consumer starts.
    app_state.bus.subscribe(
        EventKind::AutomationPullRequest,
        Arc::new(AutomationFanout {
            state: app_state.clone(),
        }),
    );
    app_state.bus.start();

    let sweep_state = app_state.clone();
    tokio::spawn(async move {
        sweep_loop(sweep_state).await;
    });

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/ptal", post(ptal_handler))
        .merge(webhook_router(app_state.clone()))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(app_state.clone());

    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!("Server listening on port {}", config.port);

    axum::serve(listener, app).await?;

    app_state.bus.shutdown().await;

    Ok(())
}
