//! HTTP ingress for the user-facing PTAL command.
//!
//! Slash-command option parsing lives with the interaction gateway; by the
//! time a request reaches this endpoint its fields are plain validated
//! strings and numbers. The endpoint checks the PR is actually visible,
//! rejects synchronously if not, and otherwise acknowledges right away while
//! the posting work runs in the background task registry.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::notify::{spawn_notification, CreateNotification};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PtalRequest {
    pub guild_id: String,
    pub channel_id: String,
    pub repo_owner: String,
    pub repo_name: String,
    pub pr_number: u64,
    pub description: String,
}

#[derive(Serialize)]
pub struct PtalAccepted {
    pub request_id: String,
}

pub async fn ptal_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PtalRequest>,
) -> Response {
    // Validate before acknowledging: a bad repo or PR number is the user's
    // mistake and must surface now, with nothing persisted.
    if let Err(e) = state
        .github
        .get_pull_request(&req.repo_owner, &req.repo_name, req.pr_number)
        .await
    {
        warn!(
            "Rejecting PTAL for {}/{}#{}: {:#}",
            req.repo_owner, req.repo_name, req.pr_number, e
        );
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("{:#}", e) })),
        )
            .into_response();
    }

    let request_id = Uuid::new_v4().to_string();
    spawn_notification(
        state.clone(),
        request_id.clone(),
        CreateNotification {
            guild_id: req.guild_id,
            channel_id: req.channel_id,
            repo_owner: req.repo_owner,
            repo_name: req.repo_name,
            pr_number: req.pr_number,
            description: req.description,
        },
    );

    (StatusCode::ACCEPTED, Json(PtalAccepted { request_id })).into_response()
}
