use serde::{Deserialize, Serialize};

/// Unique identifier for a pull request across repositories.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PullRequestId {
    pub repo_owner: String,
    pub repo_name: String,
    pub pr_number: u64,
}

impl PullRequestId {
    pub fn new(repo_owner: &str, repo_name: &str, pr_number: u64) -> Self {
        Self {
            repo_owner: repo_owner.to_string(),
            repo_name: repo_name.to_string(),
            pr_number,
        }
    }
}

/// Point-in-time view of a pull request, fetched fresh for every
/// reconciliation. Never persisted.
///
/// `mergeable` is `None` while GitHub is still computing the test merge
/// commit; classification treats that the same as not mergeable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestSnapshot {
    pub repo_owner: String,
    pub repo_name: String,
    pub pr_number: u64,
    pub title: String,
    pub html_url: String,
    pub draft: bool,
    pub merged: bool,
    pub mergeable: Option<bool>,
    pub mergeable_state: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_request_id_equality() {
        let id1 = PullRequestId::new("owner", "repo", 123);
        let id2 = PullRequestId::new("owner", "repo", 123);
        let id3 = PullRequestId::new("owner", "repo", 456);

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_pull_request_id_hash() {
        use std::collections::HashMap;

        let id = PullRequestId::new("owner", "repo", 123);

        let mut map = HashMap::new();
        map.insert(id.clone(), "tracked");

        assert_eq!(map.get(&id), Some(&"tracked"));
    }
}
