//! Composes the notification message payload from live PR state.
//!
//! Pure projection: snapshot + reduced review map in, Discord payload out.
//! Creation and edits use the identical payload, so reconciling an unchanged
//! PR produces a byte-identical body.

use ptal_core::{classify, PullRequestSnapshot, ReviewMap};

use crate::discord::{AllowedMentions, Embed, EmbedField, OutgoingMessage};

pub fn compose(
    snapshot: &PullRequestSnapshot,
    reviews: &ReviewMap,
    description: &str,
    mention_role_id: Option<&str>,
) -> OutgoingMessage {
    let status = classify(snapshot, reviews);

    let review_lines = if reviews.is_empty() {
        "No reviews yet".to_string()
    } else {
        reviews
            .iter()
            .map(|(author, verdict)| format!("{} {}", verdict.glyph(), author))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let embed = Embed {
        title: format!(
            "{}/{} #{}: {}",
            snapshot.repo_owner, snapshot.repo_name, snapshot.pr_number, snapshot.title
        ),
        url: snapshot.html_url.clone(),
        description: description.to_string(),
        color: status.color(),
        fields: vec![
            EmbedField {
                name: "Status".to_string(),
                value: status.label().to_string(),
                inline: true,
            },
            EmbedField {
                name: "Reviews".to_string(),
                value: review_lines,
                inline: true,
            },
            EmbedField {
                name: "Links".to_string(),
                value: format!(
                    "[View PR]({}) \u{b7} [Changed files]({}/files)",
                    snapshot.html_url, snapshot.html_url
                ),
                inline: false,
            },
        ],
    };

    OutgoingMessage {
        content: mention_role_id.map(|role| format!("<@&{}>", role)),
        allowed_mentions: AllowedMentions {
            roles: mention_role_id.map(str::to_string).into_iter().collect(),
        },
        embeds: vec![embed],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptal_core::{reduce_reviews, PullRequestStatus, ReviewEvent, ReviewVerdict};

    fn snapshot() -> PullRequestSnapshot {
        PullRequestSnapshot {
            repo_owner: "owner".to_string(),
            repo_name: "repo".to_string(),
            pr_number: 7,
            title: "Fix login flow".to_string(),
            html_url: "https://github.com/owner/repo/pull/7".to_string(),
            draft: false,
            merged: false,
            mergeable: Some(true),
            mergeable_state: "clean".to_string(),
        }
    }

    #[test]
    fn test_compose_without_mention() {
        let map = reduce_reviews(&[ReviewEvent::new("alice", ReviewVerdict::Approved)]);
        let payload = compose(&snapshot(), &map, "please take a look", None);

        assert_eq!(payload.content, None);
        assert!(payload.allowed_mentions.roles.is_empty());

        let embed = &payload.embeds[0];
        assert_eq!(embed.title, "owner/repo #7: Fix login flow");
        assert_eq!(embed.description, "please take a look");
        assert_eq!(embed.color, PullRequestStatus::Approved.color());
        assert!(embed.fields[1].value.contains("alice"));
        assert!(embed.fields[2]
            .value
            .contains("https://github.com/owner/repo/pull/7/files"));
    }

    #[test]
    fn test_compose_with_mention_role() {
        let payload = compose(
            &snapshot(),
            &ReviewMap::default(),
            "ptal",
            Some("123456"),
        );

        assert_eq!(payload.content.as_deref(), Some("<@&123456>"));
        assert_eq!(payload.allowed_mentions.roles, vec!["123456".to_string()]);
    }

    #[test]
    fn test_compose_empty_reviews_placeholder() {
        let payload = compose(&snapshot(), &ReviewMap::default(), "ptal", None);
        let embed = &payload.embeds[0];
        assert_eq!(embed.fields[1].value, "No reviews yet");
        // No reviews classifies as waiting.
        assert_eq!(embed.fields[0].value, PullRequestStatus::Waiting.label());
    }

    #[test]
    fn test_compose_reviewer_order_is_reduction_order() {
        let map = reduce_reviews(&[
            ReviewEvent::new("alice", ReviewVerdict::Approved),
            ReviewEvent::new("bob", ReviewVerdict::ChangesRequested),
            ReviewEvent::new("alice", ReviewVerdict::Approved),
        ]);
        let payload = compose(&snapshot(), &map, "ptal", None);

        let reviews = &payload.embeds[0].fields[1].value;
        let bob_at = reviews.find("bob").expect("bob listed");
        let alice_at = reviews.find("alice").expect("alice listed");
        assert!(bob_at < alice_at);
    }

    #[test]
    fn test_compose_is_idempotent() {
        // Same inputs must produce an identical payload, so a reconcile of
        // an unchanged PR is a no-op edit.
        let map = reduce_reviews(&[ReviewEvent::new("alice", ReviewVerdict::Commented)]);
        let first = compose(&snapshot(), &map, "ptal", Some("99"));
        let second = compose(&snapshot(), &map, "ptal", Some("99"));
        assert_eq!(first, second);

        let first_json = serde_json::to_string(&first).expect("serialize");
        let second_json = serde_json::to_string(&second).expect("serialize");
        assert_eq!(first_json, second_json);
    }
}
