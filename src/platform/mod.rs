//! Code-host services
//!
//! Provides the seam between commands and the GitHub API so the
//! orchestration logic can be tested against a mock host.

mod github;

pub use github::GitHubService;

use crate::error::{Error, Result};
use crate::types::{
    CheckRun, MergeResult, PrComment, PullRequest, ReviewTeam, WorkflowRun,
};
use async_trait::async_trait;

/// Code-host operations the commands rely on
///
/// All methods are simple request/response calls; the orchestration
/// (strategy ordering, polling, retries) lives in the callers.
#[async_trait]
pub trait CodeHost: Send + Sync {
    /// Login of the authenticated user
    async fn current_user(&self) -> Result<String>;

    /// Fetch a PR with review/mergeability/check information attached
    async fn pr_view(&self, owner: &str, repo: &str, number: u64) -> Result<PullRequest>;

    /// Find the open PR whose head is `branch`, if any
    async fn pr_for_branch(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Option<PullRequest>>;

    /// Open PRs across the organization's repositories authored by `authors`
    async fn list_open_prs(&self, org: &str, authors: &[String]) -> Result<Vec<PullRequest>>;

    /// Recently merged PRs across the organization authored by `authors`
    async fn list_merged_prs(&self, org: &str, authors: &[String]) -> Result<Vec<PullRequest>>;

    /// Latest check runs for a commit ref
    async fn check_runs(&self, owner: &str, repo: &str, git_ref: &str) -> Result<Vec<CheckRun>>;

    /// Leave an approving review
    async fn approve_pr(&self, owner: &str, repo: &str, number: u64) -> Result<()>;

    /// Merge a PR (rebase merge, the team convention)
    async fn merge_pr(&self, owner: &str, repo: &str, number: u64) -> Result<MergeResult>;

    /// Arm GitHub auto-merge so the PR merges once checks pass
    async fn enable_auto_merge(&self, owner: &str, repo: &str, number: u64) -> Result<()>;

    /// Update the PR branch from its base (server-side rebase)
    async fn update_pr_branch(&self, owner: &str, repo: &str, number: u64) -> Result<()>;

    /// List issue comments on a PR
    async fn pr_comments(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<PrComment>>;

    /// Comment on a PR
    async fn comment_pr(&self, owner: &str, repo: &str, number: u64, body: &str) -> Result<()>;

    /// Create a PR and assign it to the caller
    async fn create_pr(
        &self,
        owner: &str,
        repo: &str,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequest>;

    /// Request user and team reviews on a PR
    async fn request_reviewers(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        reviewers: &[String],
        team_reviewers: &[String],
    ) -> Result<()>;

    /// Repository description, if set
    async fn repo_description(&self, owner: &str, repo: &str) -> Result<Option<String>>;

    /// Recent push-triggered workflow runs on a branch, newest first
    async fn branch_runs(&self, owner: &str, repo: &str, branch: &str)
        -> Result<Vec<WorkflowRun>>;

    /// Workflow runs triggered for a specific commit
    async fn commit_runs(&self, owner: &str, repo: &str, sha: &str) -> Result<Vec<WorkflowRun>>;

    /// Cancel a workflow run
    async fn cancel_run(&self, owner: &str, repo: &str, run_id: u64) -> Result<()>;

    /// Review teams: the caller's org teams plus teams with access to `repo`
    async fn review_teams(&self, org: &str, repo: &str) -> Result<Vec<ReviewTeam>>;
}

/// Parse `owner` and `repo` out of a git remote URL
///
/// Accepts the ssh (`git@github.com:owner/repo.git`), ssh-url
/// (`ssh://git@github.com/owner/repo.git`) and https forms.
pub fn parse_repo_url(remote_url: &str) -> Result<(String, String)> {
    let trimmed = remote_url.trim();

    let path = if let Some(rest) = trimmed.strip_prefix("git@") {
        rest.split_once(':')
            .map(|(_, path)| path.to_string())
            .ok_or_else(|| Error::Git(format!("unrecognized remote url: {trimmed}")))?
    } else {
        let parsed = url::Url::parse(trimmed)
            .map_err(|e| Error::Git(format!("unrecognized remote url {trimmed}: {e}")))?;
        parsed.path().trim_start_matches('/').to_string()
    };

    let path = path.strip_suffix(".git").unwrap_or(&path);
    let mut parts = path.splitn(2, '/');
    match (parts.next(), parts.next()) {
        (Some(owner), Some(repo)) if !owner.is_empty() && !repo.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(Error::Git(format!("unrecognized remote url: {trimmed}"))),
    }
}
