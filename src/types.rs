//! Core types for pr-pilot
//!
//! Everything here is request-scoped: built from API responses at the start
//! of a command and dropped when the command finishes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// PR state as reported by GitHub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrState {
    /// PR is open
    Open,
    /// PR was closed without merging
    Closed,
    /// PR was merged
    Merged,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Merged => write!(f, "merged"),
        }
    }
}

/// Whether GitHub considers a PR mergeable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mergeability {
    /// No conflicts with the base branch
    Mergeable,
    /// Has conflicts
    Conflicting,
    /// GitHub is still computing the state
    Unknown,
}

/// Aggregate review decision on a PR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewDecision {
    /// At least the required approvals, none outstanding
    Approved,
    /// A reviewer requested changes
    ChangesRequested,
    /// A review is still required
    ReviewRequired,
}

/// A CI check run attached to a PR head commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRun {
    /// Check name (e.g. "build", "lint")
    pub name: String,
    /// Run status: queued, in_progress, completed
    pub status: String,
    /// Conclusion once completed: success, failure, skipped, ...
    pub conclusion: Option<String>,
}

/// A pull request with everything the commands need to know about it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// Web URL
    pub url: String,
    /// PR title
    pub title: String,
    /// Author login (None for deleted accounts)
    pub author: Option<String>,
    /// Repository owner login
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Current state
    pub state: PrState,
    /// Whether the PR is a draft
    pub is_draft: bool,
    /// Conflict state
    pub mergeable: Mergeability,
    /// Aggregate review decision (None when no reviews requested)
    pub review_decision: Option<ReviewDecision>,
    /// Label names
    pub labels: Vec<String>,
    /// Logins that left an APPROVED review
    pub approvers: Vec<String>,
    /// When the PR was opened
    pub created_at: DateTime<Utc>,
    /// When the PR was merged, if it was
    pub merged_at: Option<DateTime<Utc>>,
    /// Head branch name
    pub head_ref: String,
    /// Head commit SHA (None when the branch was deleted)
    pub head_oid: Option<String>,
    /// Latest check runs for the head commit
    pub checks: Vec<CheckRun>,
}

/// Derived readiness flags for a PR
///
/// These mirror the conditions the team applies before publishing:
/// a PR is only merged once every flag is green.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct PrFlags {
    /// Review decision is APPROVED
    pub approved: bool,
    /// No reviewer is currently requesting changes
    pub not_rejected: bool,
    /// No merge conflicts
    pub mergeable: bool,
    /// Every named check has a passing (or skipped) latest run
    pub checks_passed: bool,
    /// Approved by a quality-team member, or carries a publish label
    pub quality_ok: bool,
    /// Not a draft and not labelled to wait
    pub ready: bool,
}

impl PrFlags {
    /// Derive flags from a PR and the quality-team roster
    pub fn derive(pull: &PullRequest, quality_team: &[String]) -> Self {
        let approved = pull.review_decision == Some(ReviewDecision::Approved);
        let not_rejected = pull.review_decision != Some(ReviewDecision::ChangesRequested);
        let mergeable = pull.mergeable == Mergeability::Mergeable;
        let checks_passed = checks_passed(&pull.checks);
        let quality_ok = pull
            .approvers
            .iter()
            .any(|login| quality_team.contains(login))
            || has_label_containing(pull, "publish");
        let ready = !pull.is_draft && !has_label_containing(pull, "wait");

        Self {
            approved,
            not_rejected,
            mergeable,
            checks_passed,
            quality_ok,
            ready,
        }
    }

    /// Whether every publish condition is met
    pub const fn publishable(&self) -> bool {
        self.approved
            && self.not_rejected
            && self.mergeable
            && self.checks_passed
            && self.quality_ok
            && self.ready
    }

    /// Readiness score: number of green flags out of
    /// {approved, mergeable, checks, quality, ready}
    pub const fn score(&self) -> u8 {
        self.approved as u8
            + self.mergeable as u8
            + self.checks_passed as u8
            + self.quality_ok as u8
            + self.ready as u8
    }

    /// Names of the flags that are red, for skip reasons
    pub fn blocking_reasons(&self) -> Vec<String> {
        let mut reasons = Vec::new();
        if !self.approved {
            reasons.push("not approved".to_string());
        }
        if !self.not_rejected {
            reasons.push("changes requested".to_string());
        }
        if !self.mergeable {
            reasons.push("has conflicts or merge state unknown".to_string());
        }
        if !self.checks_passed {
            reasons.push("checks not passing".to_string());
        }
        if !self.quality_ok {
            reasons.push("quality review missing".to_string());
        }
        if !self.ready {
            reasons.push("draft or waiting".to_string());
        }
        reasons
    }
}

fn has_label_containing(pull: &PullRequest, needle: &str) -> bool {
    pull.labels
        .iter()
        .any(|label| label.to_lowercase().contains(needle))
}

/// Checks pass when, grouping the latest runs by check name (and ignoring
/// the advisory "PR Pattern" check), every group has at least one run that
/// concluded success or skipped.
fn checks_passed(checks: &[CheckRun]) -> bool {
    use std::collections::HashMap;

    let mut by_name: HashMap<&str, bool> = HashMap::new();
    for check in checks.iter().filter(|c| c.name != "PR Pattern") {
        let passed = matches!(check.conclusion.as_deref(), Some("success" | "skipped"));
        let entry = by_name.entry(check.name.as_str()).or_insert(false);
        *entry = *entry || passed;
    }

    by_name.values().all(|passed| *passed)
}

/// A reference to a PR extracted from free text (Flux card descriptions)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrRef {
    /// Full PR URL as found in the text
    pub url: String,
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// PR number
    pub number: u64,
}

/// A stage in a Flux pipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardStage {
    /// Stage id
    pub id: String,
    /// Stage display name
    pub name: String,
}

/// A custom field on a Flux card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardField {
    /// Field title
    pub title: String,
    /// Field value
    pub value: String,
}

/// A Flux kanban card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    /// Card id
    pub id: String,
    /// Card name
    pub name: String,
    /// Card description (markdown, may embed PR links)
    pub description: Option<String>,
    /// Stage the card currently sits in
    pub current_stage: CardStage,
    /// Label names
    pub labels: Vec<String>,
    /// Custom fields (populated on demand)
    pub fields: Vec<CardField>,
}

impl Card {
    /// All text on the card that may contain PR links:
    /// the description followed by every "title: value" field line.
    pub fn search_text(&self) -> String {
        let fields = self
            .fields
            .iter()
            .map(|f| format!("{}: {}", f.title, f.value))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{}\n\n{fields}", self.description.as_deref().unwrap_or(""))
    }
}

/// A GitHub Actions workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    /// Run id
    pub id: u64,
    /// Web URL for the run
    pub url: String,
    /// Run status: queued, in_progress, completed
    pub status: String,
    /// Conclusion once completed
    pub conclusion: Option<String>,
    /// Email of the head commit committer (used to skip bot pushes)
    pub committer_email: Option<String>,
}

/// A comment on a pull request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrComment {
    /// Comment ID
    pub id: u64,
    /// Comment body text
    pub body: String,
}

/// An organization review team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewTeam {
    /// Team slug
    pub slug: String,
    /// Member logins
    pub members: Vec<String>,
    /// Whether the team has access to the repository in question
    pub has_repo: bool,
}

/// Merge strategy, tried in priority order by the merge orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Plain merge via the API, only succeeds when GitHub reports clean state
    Normal,
    /// Enable auto-merge so GitHub merges once checks pass
    Auto,
    /// Merge bypassing required status checks via elevated permission
    Admin,
}

impl std::fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Auto => write!(f, "auto"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// Classified outcome of one merge attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The PR is merged
    Done,
    /// Auto-merge armed or checks still running; merge will complete later
    Pending,
    /// The attempt failed
    Failed,
}

/// Result of a merge API call
#[derive(Debug, Clone, Default)]
pub struct MergeResult {
    /// Whether the merge happened
    pub merged: bool,
    /// SHA of the merge commit (if successful)
    pub sha: Option<String>,
    /// Message from the API (especially on failure)
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_pr() -> PullRequest {
        PullRequest {
            number: 42,
            url: "https://github.com/acme/widgets/pull/42".to_string(),
            title: "feat: add widget".to_string(),
            author: Some("alice".to_string()),
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
            state: PrState::Open,
            is_draft: false,
            mergeable: Mergeability::Mergeable,
            review_decision: Some(ReviewDecision::Approved),
            labels: vec![],
            approvers: vec!["bob".to_string()],
            created_at: Utc::now(),
            merged_at: None,
            head_ref: "feat-widget".to_string(),
            head_oid: Some("abc123".to_string()),
            checks: vec![CheckRun {
                name: "build".to_string(),
                status: "completed".to_string(),
                conclusion: Some("success".to_string()),
            }],
        }
    }

    fn quality() -> Vec<String> {
        vec!["carol".to_string()]
    }

    #[test]
    fn publishable_when_all_green() {
        let mut pull = base_pr();
        pull.approvers.push("carol".to_string());
        let flags = PrFlags::derive(&pull, &quality());
        assert!(flags.publishable());
        assert_eq!(flags.score(), 5);
    }

    #[test]
    fn draft_is_not_ready() {
        let mut pull = base_pr();
        pull.is_draft = true;
        let flags = PrFlags::derive(&pull, &quality());
        assert!(!flags.ready);
        assert!(!flags.publishable());
    }

    #[test]
    fn wait_label_blocks_ready() {
        let mut pull = base_pr();
        pull.labels.push("Waiting for deploy".to_string());
        let flags = PrFlags::derive(&pull, &quality());
        assert!(!flags.ready);
    }

    #[test]
    fn publish_label_satisfies_quality() {
        let mut pull = base_pr();
        pull.labels.push("Publish ASAP".to_string());
        let flags = PrFlags::derive(&pull, &quality());
        assert!(flags.quality_ok);
    }

    #[test]
    fn quality_approval_satisfies_quality() {
        let mut pull = base_pr();
        pull.approvers = vec!["carol".to_string()];
        let flags = PrFlags::derive(&pull, &quality());
        assert!(flags.quality_ok);
    }

    #[test]
    fn changes_requested_rejects() {
        let mut pull = base_pr();
        pull.review_decision = Some(ReviewDecision::ChangesRequested);
        let flags = PrFlags::derive(&pull, &quality());
        assert!(!flags.approved);
        assert!(!flags.not_rejected);
        assert!(flags.blocking_reasons().len() >= 2);
    }

    #[test]
    fn checks_pass_with_retried_run() {
        // Same check name with a failure and a later success counts as passing
        let checks = vec![
            CheckRun {
                name: "build".to_string(),
                status: "completed".to_string(),
                conclusion: Some("failure".to_string()),
            },
            CheckRun {
                name: "build".to_string(),
                status: "completed".to_string(),
                conclusion: Some("success".to_string()),
            },
        ];
        assert!(checks_passed(&checks));
    }

    #[test]
    fn checks_fail_when_one_group_has_no_pass() {
        let checks = vec![
            CheckRun {
                name: "build".to_string(),
                status: "completed".to_string(),
                conclusion: Some("success".to_string()),
            },
            CheckRun {
                name: "lint".to_string(),
                status: "completed".to_string(),
                conclusion: Some("failure".to_string()),
            },
        ];
        assert!(!checks_passed(&checks));
    }

    #[test]
    fn pr_pattern_check_is_ignored() {
        let checks = vec![CheckRun {
            name: "PR Pattern".to_string(),
            status: "completed".to_string(),
            conclusion: Some("failure".to_string()),
        }];
        assert!(checks_passed(&checks));
    }

    #[test]
    fn no_checks_configured_passes() {
        assert!(checks_passed(&[]));
    }

    #[test]
    fn card_search_text_joins_description_and_fields() {
        let card = Card {
            id: "c1".to_string(),
            name: "Widget".to_string(),
            description: Some("see PR".to_string()),
            current_stage: CardStage {
                id: "s1".to_string(),
                name: "Publish".to_string(),
            },
            labels: vec![],
            fields: vec![CardField {
                title: "Link".to_string(),
                value: "https://example.com".to_string(),
            }],
        };
        let text = card.search_text();
        assert!(text.contains("see PR"));
        assert!(text.contains("Link: https://example.com"));
    }
}
