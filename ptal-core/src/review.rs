//! Review reduction and pull request status classification.
//!
//! GitHub returns one review object per submission, so a single reviewer can
//! appear many times. [`reduce_reviews`] collapses that list to the latest
//! entry per author, and [`classify`] derives the overall PR status from the
//! reduced map plus the PR snapshot. Status is always derived, never stored.

use serde::{Deserialize, Serialize};

use crate::pr::PullRequestSnapshot;

/// The verdict a single review submission carries.
///
/// Unrecognized state strings map to `Unknown` rather than failing the whole
/// reduction; GitHub has grown new states before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewVerdict {
    Commented,
    Approved,
    ChangesRequested,
    Unknown,
}

impl ReviewVerdict {
    /// Parse the raw `state` string from the GitHub reviews API.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "COMMENTED" => ReviewVerdict::Commented,
            "APPROVED" => ReviewVerdict::Approved,
            "CHANGES_REQUESTED" => ReviewVerdict::ChangesRequested,
            _ => ReviewVerdict::Unknown,
        }
    }

    /// Glyph shown next to the reviewer's name in the notification embed.
    pub fn glyph(self) -> &'static str {
        match self {
            ReviewVerdict::Commented => "\u{1f4ac}",
            ReviewVerdict::Approved => "\u{2705}",
            ReviewVerdict::ChangesRequested => "\u{274c}",
            ReviewVerdict::Unknown => "\u{2753}",
        }
    }
}

/// One raw review submission as returned by the hosting API.
///
/// A review whose raw state is `DISMISSED` carries the `dismissed` marker;
/// such entries are dropped after deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewEvent {
    pub author: String,
    pub verdict: ReviewVerdict,
    pub dismissed: bool,
}

impl ReviewEvent {
    pub fn new(author: &str, verdict: ReviewVerdict) -> Self {
        Self {
            author: author.to_string(),
            verdict,
            dismissed: false,
        }
    }

    pub fn dismissed(author: &str) -> Self {
        Self {
            author: author.to_string(),
            verdict: ReviewVerdict::Unknown,
            dismissed: true,
        }
    }
}

/// Insertion-ordered author -> verdict map produced by [`reduce_reviews`].
///
/// Keys are unique. Order reflects when each author's *latest* review was
/// seen, which keeps the rendered reviewer list stable across refreshes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewMap {
    entries: Vec<(String, ReviewVerdict)>,
}

impl ReviewMap {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, author: &str) -> Option<ReviewVerdict> {
        self.entries
            .iter()
            .find(|(a, _)| a == author)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ReviewVerdict)> {
        self.entries.iter().map(|(a, v)| (a.as_str(), *v))
    }

    pub fn has_changes_requested(&self) -> bool {
        self.entries
            .iter()
            .any(|(_, v)| *v == ReviewVerdict::ChangesRequested)
    }
}

/// Collapse a raw review list to the latest entry per author.
///
/// Events are walked in the order the API returned them (assumed
/// chronological). Each author's earlier entry is removed and the new one is
/// pushed at the end, so the map is last-seen-wins with most-recent-insertion
/// ordering. Dismissed entries are dropped after the pass; a dismissal is the
/// author's latest word, so it removes them from the map entirely.
pub fn reduce_reviews(events: &[ReviewEvent]) -> ReviewMap {
    let mut entries: Vec<(String, ReviewVerdict, bool)> = Vec::new();

    for event in events {
        entries.retain(|(author, _, _)| author != &event.author);
        entries.push((event.author.clone(), event.verdict, event.dismissed));
    }

    ReviewMap {
        entries: entries
            .into_iter()
            .filter(|(_, _, dismissed)| !dismissed)
            .map(|(author, verdict, _)| (author, verdict))
            .collect(),
    }
}

/// Overall status of a tracked pull request. Derived on every refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PullRequestStatus {
    Draft,
    Waiting,
    Approved,
    Changes,
    Merged,
}

impl PullRequestStatus {
    /// Human label shown in the notification embed.
    pub fn label(self) -> &'static str {
        match self {
            PullRequestStatus::Draft => "Draft",
            PullRequestStatus::Waiting => "Waiting for review",
            PullRequestStatus::Approved => "Approved",
            PullRequestStatus::Changes => "Changes requested",
            PullRequestStatus::Merged => "Merged",
        }
    }

    /// Embed accent color per status.
    pub fn color(self) -> u32 {
        match self {
            PullRequestStatus::Draft => 0x95a5a6,
            PullRequestStatus::Waiting => 0x5865f2,
            PullRequestStatus::Approved => 0x57f287,
            PullRequestStatus::Changes => 0xed4245,
            PullRequestStatus::Merged => 0x57f287,
        }
    }
}

/// Classify a pull request from its snapshot and reduced review map.
///
/// The checks run in strict priority order and the first match wins:
/// draft and merged short-circuit before any review content is consulted,
/// and blocked/no-reviews resolve to waiting before the approval check.
pub fn classify(snapshot: &PullRequestSnapshot, reviews: &ReviewMap) -> PullRequestStatus {
    if snapshot.draft {
        return PullRequestStatus::Draft;
    }
    if snapshot.merged {
        return PullRequestStatus::Merged;
    }
    if snapshot.mergeable != Some(true)
        || reviews.is_empty()
        || snapshot.mergeable_state == "blocked"
    {
        return PullRequestStatus::Waiting;
    }
    if reviews.has_changes_requested() {
        return PullRequestStatus::Changes;
    }
    PullRequestStatus::Approved
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn snapshot(draft: bool, merged: bool, mergeable: Option<bool>) -> PullRequestSnapshot {
        PullRequestSnapshot {
            repo_owner: "owner".to_string(),
            repo_name: "repo".to_string(),
            pr_number: 1,
            title: "Add feature".to_string(),
            html_url: "https://github.com/owner/repo/pull/1".to_string(),
            draft,
            merged,
            mergeable,
            mergeable_state: "clean".to_string(),
        }
    }

    #[test]
    fn test_parse_known_states() {
        assert_eq!(ReviewVerdict::parse("COMMENTED"), ReviewVerdict::Commented);
        assert_eq!(ReviewVerdict::parse("APPROVED"), ReviewVerdict::Approved);
        assert_eq!(
            ReviewVerdict::parse("CHANGES_REQUESTED"),
            ReviewVerdict::ChangesRequested
        );
    }

    #[test]
    fn test_parse_unknown_state() {
        assert_eq!(ReviewVerdict::parse("PENDING"), ReviewVerdict::Unknown);
        assert_eq!(ReviewVerdict::parse(""), ReviewVerdict::Unknown);
    }

    #[test]
    fn test_reduce_last_seen_wins_and_reorders() {
        // A approves, B requests changes, A approves again: A's later review
        // reinserts at the end, so the final order is B then A.
        let events = vec![
            ReviewEvent::new("A", ReviewVerdict::Approved),
            ReviewEvent::new("B", ReviewVerdict::ChangesRequested),
            ReviewEvent::new("A", ReviewVerdict::Approved),
        ];

        let map = reduce_reviews(&events);
        let order: Vec<&str> = map.iter().map(|(a, _)| a).collect();
        assert_eq!(order, vec!["B", "A"]);
        assert_eq!(map.get("A"), Some(ReviewVerdict::Approved));
        assert_eq!(map.get("B"), Some(ReviewVerdict::ChangesRequested));
    }

    #[test]
    fn test_reduce_drops_dismissed_latest() {
        // A dismissal is the author's latest entry, so the author disappears
        // even though an earlier approval exists.
        let events = vec![
            ReviewEvent::new("A", ReviewVerdict::Approved),
            ReviewEvent::dismissed("A"),
        ];

        let map = reduce_reviews(&events);
        assert!(map.is_empty());
    }

    #[test]
    fn test_reduce_review_after_dismissal_is_kept() {
        let events = vec![
            ReviewEvent::dismissed("A"),
            ReviewEvent::new("A", ReviewVerdict::Commented),
        ];

        let map = reduce_reviews(&events);
        assert_eq!(map.get("A"), Some(ReviewVerdict::Commented));
    }

    #[test]
    fn test_classify_draft_wins_over_everything() {
        let events = vec![ReviewEvent::new("A", ReviewVerdict::Approved)];
        let map = reduce_reviews(&events);

        let status = classify(&snapshot(true, false, Some(true)), &map);
        assert_eq!(status, PullRequestStatus::Draft);

        // Draft precedes merged in the priority order. Real PRs cannot be
        // both, but the ordering is pinned here regardless.
        let status = classify(&snapshot(true, true, Some(true)), &map);
        assert_eq!(status, PullRequestStatus::Draft);
    }

    #[test]
    fn test_classify_merged() {
        let map = reduce_reviews(&[ReviewEvent::new("A", ReviewVerdict::ChangesRequested)]);
        let status = classify(&snapshot(false, true, Some(true)), &map);
        assert_eq!(status, PullRequestStatus::Merged);
    }

    #[test]
    fn test_classify_not_mergeable_is_waiting_despite_approval() {
        let map = reduce_reviews(&[ReviewEvent::new("A", ReviewVerdict::Approved)]);
        let status = classify(&snapshot(false, false, Some(false)), &map);
        assert_eq!(status, PullRequestStatus::Waiting);
    }

    #[test]
    fn test_classify_mergeable_unknown_is_waiting() {
        let map = reduce_reviews(&[ReviewEvent::new("A", ReviewVerdict::Approved)]);
        let status = classify(&snapshot(false, false, None), &map);
        assert_eq!(status, PullRequestStatus::Waiting);
    }

    #[test]
    fn test_classify_empty_reviews_is_waiting() {
        // No reviews resolves to waiting before the approval rule runs.
        let status = classify(&snapshot(false, false, Some(true)), &ReviewMap::default());
        assert_eq!(status, PullRequestStatus::Waiting);
    }

    #[test]
    fn test_classify_blocked_is_waiting() {
        let mut snap = snapshot(false, false, Some(true));
        snap.mergeable_state = "blocked".to_string();
        let map = reduce_reviews(&[ReviewEvent::new("A", ReviewVerdict::Approved)]);
        assert_eq!(classify(&snap, &map), PullRequestStatus::Waiting);
    }

    #[test]
    fn test_classify_changes_requested() {
        let events = vec![
            ReviewEvent::new("A", ReviewVerdict::Approved),
            ReviewEvent::new("B", ReviewVerdict::ChangesRequested),
            ReviewEvent::new("A", ReviewVerdict::Approved),
        ];
        let map = reduce_reviews(&events);
        assert_eq!(
            classify(&snapshot(false, false, Some(true)), &map),
            PullRequestStatus::Changes
        );
    }

    #[test]
    fn test_classify_approved() {
        let events = vec![
            ReviewEvent::new("A", ReviewVerdict::Approved),
            ReviewEvent::new("B", ReviewVerdict::Commented),
        ];
        let map = reduce_reviews(&events);
        assert_eq!(
            classify(&snapshot(false, false, Some(true)), &map),
            PullRequestStatus::Approved
        );
    }

    fn arb_event() -> impl Strategy<Value = ReviewEvent> {
        (
            prop::sample::select(vec!["alice", "bob", "carol", "dave"]),
            prop::sample::select(vec![
                "COMMENTED",
                "APPROVED",
                "CHANGES_REQUESTED",
                "WEIRD_STATE",
            ]),
            any::<bool>(),
        )
            .prop_map(|(author, state, dismissed)| ReviewEvent {
                author: author.to_string(),
                verdict: ReviewVerdict::parse(state),
                dismissed,
            })
    }

    proptest! {
        #[test]
        fn prop_reduced_map_has_unique_authors(events in prop::collection::vec(arb_event(), 0..40)) {
            let map = reduce_reviews(&events);
            let mut authors: Vec<&str> = map.iter().map(|(a, _)| a).collect();
            let before = authors.len();
            authors.sort_unstable();
            authors.dedup();
            prop_assert_eq!(before, authors.len());
        }

        #[test]
        fn prop_reduced_map_reflects_latest_event(events in prop::collection::vec(arb_event(), 0..40)) {
            let map = reduce_reviews(&events);
            let mut authors: Vec<&String> = events.iter().map(|e| &e.author).collect();
            authors.sort_unstable();
            authors.dedup();

            // The last event per author decides presence and verdict.
            for author in authors {
                let latest = events
                    .iter()
                    .rev()
                    .find(|e| &e.author == author)
                    .expect("author came from the event list");
                if latest.dismissed {
                    prop_assert_eq!(map.get(author), None);
                } else {
                    prop_assert_eq!(map.get(author), Some(latest.verdict));
                }
            }
        }

        #[test]
        fn prop_map_size_bounded_by_distinct_authors(events in prop::collection::vec(arb_event(), 0..40)) {
            let map = reduce_reviews(&events);
            let mut authors: Vec<&String> = events.iter().map(|e| &e.author).collect();
            authors.sort_unstable();
            authors.dedup();
            prop_assert!(map.len() <= authors.len());
        }
    }
}
