//! Typed GitHub REST client.
//!
//! Authenticates with a personal access token. Only the two read paths the
//! reconciler needs are implemented: fetching a pull request and listing its
//! reviews.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info};

use ptal_core::{PullRequestSnapshot, ReviewEvent, ReviewVerdict};

const GITHUB_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("ptal-bot/", env!("CARGO_PKG_VERSION"));

/// Reviews are paginated; GitHub caps page size at 100.
const REVIEWS_PER_PAGE: usize = 100;

#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    token: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct PullRequestResponse {
    title: String,
    html_url: String,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    merged: bool,
    mergeable: Option<bool>,
    #[serde(default)]
    mergeable_state: String,
}

#[derive(Debug, Deserialize)]
struct ReviewResponse {
    user: Option<ReviewUser>,
    state: String,
}

#[derive(Debug, Deserialize)]
struct ReviewUser {
    login: String,
}

impl GitHubClient {
    pub fn new(token: String) -> Self {
        Self::with_base(token, GITHUB_API_BASE.to_string())
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

    pub async fn get_pull_request(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<PullRequestSnapshot> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}",
            self.api_base, repo_owner, repo_name, pr_number
        );

        info!(
            "Fetching PR #{} in {}/{}",
            pr_number, repo_owner, repo_name
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .await
            .context("Failed to send pull request fetch")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .context("Failed to read error response body")?;
            error!("GitHub API error: {} - {}", status, error_text);
            return Err(anyhow!("GitHub API error: {} - {}", status, error_text));
        }

        let pr: PullRequestResponse = response
            .json()
            .await
            .context("Failed to parse pull request response")?;

        Ok(PullRequestSnapshot {
            repo_owner: repo_owner.to_string(),
            repo_name: repo_name.to_string(),
            pr_number,
            title: pr.title,
            html_url: pr.html_url,
            draft: pr.draft,
            merged: pr.merged,
            mergeable: pr.mergeable,
            mergeable_state: pr.mergeable_state,
        })
    }

    /// List all review submissions for a PR, oldest first.
    pub async fn list_reviews(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<Vec<ReviewEvent>> {
        let mut events = Vec::new();
        let mut page = 1u32;

        loop {
            let url = format!(
                "{}/repos/{}/{}/pulls/{}/reviews?per_page={}&page={}",
                self.api_base, repo_owner, repo_name, pr_number, REVIEWS_PER_PAGE, page
            );

            let response = self
                .client
                .get(&url)
                .header("Authorization", format!("Bearer {}", self.token))
                .header("Accept", "application/vnd.github.v3+json")
                .send()
                .await
                .context("Failed to send review list request")?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response
                    .text()
                    .await
                    .context("Failed to read error response body")?;
                error!(
                    "GitHub API error listing reviews: {} - {}",
                    status, error_text
                );
                return Err(anyhow!(
                    "GitHub API error listing reviews: {} - {}",
                    status,
                    error_text
                ));
            }

            let batch: Vec<ReviewResponse> = response
                .json()
                .await
                .context("Failed to parse review list response")?;
            let batch_len = batch.len();

            events.extend(batch.into_iter().filter_map(review_to_event));

            if batch_len < REVIEWS_PER_PAGE {
                break;
            }
            page += 1;
        }

        info!(
            "Fetched {} review(s) for PR #{} in {}/{}",
            events.len(),
            pr_number,
            repo_owner,
            repo_name
        );

        Ok(events)
    }
}

/// Reviews from deleted accounts have no user; they cannot be attributed
/// and are skipped.
fn review_to_event(review: ReviewResponse) -> Option<ReviewEvent> {
    let user = review.user?;
    Some(ReviewEvent {
        author: user.login,
        verdict: ReviewVerdict::parse(&review.state),
        dismissed: review.state == "DISMISSED",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_to_event_maps_state() {
        let event = review_to_event(ReviewResponse {
            user: Some(ReviewUser {
                login: "alice".to_string(),
            }),
            state: "APPROVED".to_string(),
        })
        .expect("has user");

        assert_eq!(event.author, "alice");
        assert_eq!(event.verdict, ReviewVerdict::Approved);
        assert!(!event.dismissed);
    }

    #[test]
    fn test_review_to_event_dismissed_marker() {
        let event = review_to_event(ReviewResponse {
            user: Some(ReviewUser {
                login: "bob".to_string(),
            }),
            state: "DISMISSED".to_string(),
        })
        .expect("has user");

        assert!(event.dismissed);
    }

    #[test]
    fn test_review_to_event_skips_deleted_user() {
        let event = review_to_event(ReviewResponse {
            user: None,
            state: "APPROVED".to_string(),
        });
        assert!(event.is_none());
    }

    #[test]
    fn test_pull_request_response_parses_minimal_payload() {
        // mergeable is null while GitHub computes the test merge commit,
        // and draft/merged/mergeable_state may be absent entirely.
        let json = r#"{
            "title": "Add feature",
            "html_url": "https://github.com/owner/repo/pull/7",
            "mergeable": null
        }"#;

        let pr: PullRequestResponse = serde_json::from_str(json).expect("parse");
        assert_eq!(pr.title, "Add feature");
        assert!(!pr.draft);
        assert!(!pr.merged);
        assert_eq!(pr.mergeable, None);
        assert_eq!(pr.mergeable_state, "");
    }
}
