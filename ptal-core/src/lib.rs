//! Core domain logic for the PTAL bot: review reduction and pull request
//! status classification. No I/O lives here.

pub mod pr;
pub mod review;

pub use pr::{PullRequestId, PullRequestSnapshot};
pub use review::{
    classify, reduce_reviews, PullRequestStatus, ReviewEvent, ReviewMap, ReviewVerdict,
};
