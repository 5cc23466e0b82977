//! Mock code host for testing
//!
//! These are test utilities - not every knob is used by every test, but
//! they are available for future test development.

#![allow(dead_code)]

use async_trait::async_trait;
use pr_pilot::error::{Error, Result};
use pr_pilot::platform::CodeHost;
use pr_pilot::types::{
    CheckRun, MergeResult, PrComment, PullRequest, ReviewTeam, WorkflowRun,
};
use std::collections::HashMap;
use std::sync::Mutex;

/// Mock implementation of [`CodeHost`]
///
/// Manually implemented rather than generated: the tests mostly need
/// call tracking, per-PR canned responses, and error injection on the
/// merge paths.
#[derive(Default)]
pub struct MockHost {
    // Canned responses
    pr_view_responses: Mutex<HashMap<u64, PullRequest>>,
    merge_responses: Mutex<HashMap<u64, MergeResult>>,
    branch_runs_responses: Mutex<HashMap<String, Vec<WorkflowRun>>>,
    // Error injection
    error_on_merge: Mutex<Option<String>>,
    error_on_auto_merge: Mutex<Option<String>>,
    error_on_update: Mutex<Option<String>>,
    // Call tracking
    merge_calls: Mutex<Vec<u64>>,
    auto_merge_calls: Mutex<Vec<u64>>,
    cancel_calls: Mutex<Vec<u64>>,
    pr_view_calls: Mutex<Vec<u64>>,
    update_calls: Mutex<Vec<u64>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the PR returned by `pr_view` for a number
    pub fn set_pr(&self, pull: PullRequest) {
        self.pr_view_responses
            .lock()
            .unwrap()
            .insert(pull.number, pull);
    }

    /// Set the result `merge_pr` returns for a number
    pub fn set_merge_result(&self, number: u64, result: MergeResult) {
        self.merge_responses.lock().unwrap().insert(number, result);
    }

    /// Set the runs `branch_runs` returns for a branch
    pub fn set_branch_runs(&self, branch: &str, runs: Vec<WorkflowRun>) {
        self.branch_runs_responses
            .lock()
            .unwrap()
            .insert(branch.to_string(), runs);
    }

    /// Make every `merge_pr` call fail with `message`
    pub fn fail_merge(&self, message: &str) {
        *self.error_on_merge.lock().unwrap() = Some(message.to_string());
    }

    /// Make every `enable_auto_merge` call fail with `message`
    pub fn fail_auto_merge(&self, message: &str) {
        *self.error_on_auto_merge.lock().unwrap() = Some(message.to_string());
    }

    /// Make every `update_pr_branch` call fail with `message`
    pub fn fail_update(&self, message: &str) {
        *self.error_on_update.lock().unwrap() = Some(message.to_string());
    }

    pub fn merge_calls(&self) -> Vec<u64> {
        self.merge_calls.lock().unwrap().clone()
    }

    pub fn auto_merge_calls(&self) -> Vec<u64> {
        self.auto_merge_calls.lock().unwrap().clone()
    }

    pub fn cancel_calls(&self) -> Vec<u64> {
        self.cancel_calls.lock().unwrap().clone()
    }

    pub fn pr_view_calls(&self) -> Vec<u64> {
        self.pr_view_calls.lock().unwrap().clone()
    }

    pub fn update_calls(&self) -> Vec<u64> {
        self.update_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CodeHost for MockHost {
    async fn current_user(&self) -> Result<String> {
        Ok("alice".to_string())
    }

    async fn pr_view(&self, _owner: &str, _repo: &str, number: u64) -> Result<PullRequest> {
        self.pr_view_calls.lock().unwrap().push(number);
        self.pr_view_responses
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("PR #{number}")))
    }

    async fn pr_for_branch(
        &self,
        _owner: &str,
        _repo: &str,
        _branch: &str,
    ) -> Result<Option<PullRequest>> {
        Ok(None)
    }

    async fn list_open_prs(&self, _org: &str, _authors: &[String]) -> Result<Vec<PullRequest>> {
        Ok(Vec::new())
    }

    async fn list_merged_prs(&self, _org: &str, _authors: &[String]) -> Result<Vec<PullRequest>> {
        Ok(Vec::new())
    }

    async fn check_runs(&self, _owner: &str, _repo: &str, _git_ref: &str) -> Result<Vec<CheckRun>> {
        Ok(Vec::new())
    }

    async fn approve_pr(&self, _owner: &str, _repo: &str, _number: u64) -> Result<()> {
        Ok(())
    }

    async fn merge_pr(&self, _owner: &str, _repo: &str, number: u64) -> Result<MergeResult> {
        self.merge_calls.lock().unwrap().push(number);
        if let Some(message) = self.error_on_merge.lock().unwrap().clone() {
            return Err(Error::GitHubApi(message));
        }
        Ok(self
            .merge_responses
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .unwrap_or_default())
    }

    async fn enable_auto_merge(&self, _owner: &str, _repo: &str, number: u64) -> Result<()> {
        self.auto_merge_calls.lock().unwrap().push(number);
        if let Some(message) = self.error_on_auto_merge.lock().unwrap().clone() {
            return Err(Error::GitHubApi(message));
        }
        Ok(())
    }

    async fn update_pr_branch(&self, _owner: &str, _repo: &str, number: u64) -> Result<()> {
        self.update_calls.lock().unwrap().push(number);
        if let Some(message) = self.error_on_update.lock().unwrap().clone() {
            return Err(Error::GitHubApi(message));
        }
        Ok(())
    }

    async fn pr_comments(&self, _owner: &str, _repo: &str, _number: u64) -> Result<Vec<PrComment>> {
        Ok(Vec::new())
    }

    async fn comment_pr(&self, _owner: &str, _repo: &str, _number: u64, _body: &str) -> Result<()> {
        Ok(())
    }

    async fn create_pr(
        &self,
        _owner: &str,
        _repo: &str,
        _head: &str,
        _base: &str,
        _title: &str,
        _body: &str,
    ) -> Result<PullRequest> {
        Err(Error::Internal("create_pr not configured".to_string()))
    }

    async fn request_reviewers(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
        _reviewers: &[String],
        _team_reviewers: &[String],
    ) -> Result<()> {
        Ok(())
    }

    async fn repo_description(&self, _owner: &str, _repo: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn branch_runs(
        &self,
        _owner: &str,
        _repo: &str,
        branch: &str,
    ) -> Result<Vec<WorkflowRun>> {
        Ok(self
            .branch_runs_responses
            .lock()
            .unwrap()
            .get(branch)
            .cloned()
            .unwrap_or_default())
    }

    async fn commit_runs(&self, _owner: &str, _repo: &str, _sha: &str) -> Result<Vec<WorkflowRun>> {
        Ok(Vec::new())
    }

    async fn cancel_run(&self, _owner: &str, _repo: &str, run_id: u64) -> Result<()> {
        self.cancel_calls.lock().unwrap().push(run_id);
        Ok(())
    }

    async fn review_teams(&self, _org: &str, _repo: &str) -> Result<Vec<ReviewTeam>> {
        Ok(Vec::new())
    }
}
