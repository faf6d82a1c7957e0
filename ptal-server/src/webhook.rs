//! GitHub webhook ingress for automation-triggered notifications.
//!
//! The webhook only *publishes*: decoding a PR event and acknowledging the
//! delivery is synchronous, while the fan-out work happens in the bus
//! handler. GitHub redelivers on slow responses, so the handler must never
//! wait on Discord.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{Json, Response},
    routing::post,
    Router,
};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{error, info};

use crate::bus::Event;
use crate::AppState;

/// PR actions that represent a new review cycle worth announcing.
const ANNOUNCED_ACTIONS: &[&str] = &["opened", "ready_for_review", "reopened"];

#[derive(Debug, Deserialize)]
pub struct GitHubWebhookPayload {
    pub action: Option<String>,
    pub pull_request: Option<PullRequest>,
    pub repository: Option<Repository>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Repository {
    pub name: String,
    pub owner: User,
}

#[derive(Debug, Deserialize, Clone)]
pub struct User {
    pub login: String,
}

#[derive(Serialize)]
pub struct WebhookResponse {
    pub message: String,
}

type HmacSha256 = Hmac<Sha256>;

fn verify_github_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    if !signature.starts_with("sha256=") {
        return false;
    }

    let signature_hex = &signature[7..]; // Remove "sha256=" prefix

    let signature_bytes = match hex::decode(signature_hex) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };

    mac.update(payload);

    // Constant-time verification.
    mac.verify_slice(&signature_bytes).is_ok()
}

async fn verify_webhook_signature(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    let signature = parts
        .headers
        .get("x-hub-signature-256")
        .and_then(|h| h.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !verify_github_signature(&state.webhook_secret, &bytes, signature) {
        error!("Invalid webhook signature");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let request = Request::from_parts(parts, axum::body::Body::from(bytes));
    Ok(next.run(request).await)
}

pub async fn github_webhook_handler(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<WebhookResponse>, StatusCode> {
    let (_parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    let payload: GitHubWebhookPayload =
        serde_json::from_slice(&bytes).map_err(|_| StatusCode::BAD_REQUEST)?;

    let Some(event) = automation_event(&payload) else {
        return Ok(Json(WebhookResponse {
            message: "ignored".to_string(),
        }));
    };

    info!("Publishing automation event for {:?}", payload.action);

    if let Err(e) = state.bus.publish(event) {
        error!("Failed to publish automation event: {:#}", e);
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(WebhookResponse {
        message: "queued".to_string(),
    }))
}

/// Decode a webhook payload into a bus event, if it is one we announce.
fn automation_event(payload: &GitHubWebhookPayload) -> Option<Event> {
    let action = payload.action.as_deref()?;
    if !ANNOUNCED_ACTIONS.contains(&action) {
        return None;
    }

    let pr = payload.pull_request.as_ref()?;
    let repo = payload.repository.as_ref()?;

    Some(Event::AutomationPullRequest {
        repo_owner: repo.owner.login.clone(),
        repo_name: repo.name.clone(),
        pr_number: pr.number,
        html_url: pr.html_url.clone(),
    })
}

pub fn webhook_router(middleware_state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/webhook", post(github_webhook_handler))
        .route_layer(middleware::from_fn_with_state(
            middleware_state,
            verify_webhook_signature,
        ))
}
