//! Shared test fixtures

pub mod mock_host;

pub use mock_host::MockHost;

use chrono::Utc;
use pr_pilot::types::{CheckRun, Mergeability, PrState, PullRequest, ReviewDecision};

/// A fully green, publishable PR
pub fn make_ready_pr(number: u64) -> PullRequest {
    PullRequest {
        number,
        url: format!("https://github.com/acme/widgets/pull/{number}"),
        title: "ACME-1 <> add widget".to_string(),
        author: Some("alice".to_string()),
        owner: "acme".to_string(),
        repo: "widgets".to_string(),
        state: PrState::Open,
        is_draft: false,
        mergeable: Mergeability::Mergeable,
        review_decision: Some(ReviewDecision::Approved),
        labels: vec!["publish".to_string()],
        approvers: vec!["bob".to_string()],
        created_at: Utc::now(),
        merged_at: None,
        head_ref: format!("feat-{number}"),
        head_oid: Some(format!("sha-{number}")),
        checks: vec![CheckRun {
            name: "build".to_string(),
            status: "completed".to_string(),
            conclusion: Some("success".to_string()),
        }],
    }
}
