//! Merge plan execution
//!
//! Walks a [`MergePlan`] against a [`CodeHost`]: tries each strategy in
//! order, cancels CI runs a merge made irrelevant, and optionally waits
//! for pending merges to land. Progress goes through a callback trait so
//! the CLI can render spinners while tests stay silent.

use crate::error::Result;
use crate::merge::plan::{MergePlan, MergeStep};
use crate::platform::CodeHost;
use crate::types::{CheckRun, MergeOutcome, MergeStrategy, PrState, PullRequest};
use std::time::Duration;
use tracing::debug;

/// Polling cadence for a repeated lookup
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Pause between attempts
    pub interval: Duration,
    /// Maximum number of attempts
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            max_attempts: 40,
        }
    }
}

impl PollConfig {
    /// Cadence for finding the CI runs a fresh merge superseded; the runs
    /// can take a moment to appear after the push
    pub const fn cancel_lookup() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_attempts: 3,
        }
    }
}

/// Knobs for plan execution
#[derive(Debug, Clone, Copy)]
pub struct ExecuteOptions {
    /// Poll pending merges until they land (or the poll budget runs out)
    pub wait: bool,
    /// Keep going after a PR fails to merge instead of stopping
    pub continue_on_failure: bool,
    /// Cadence for the pending-merge poll
    pub poll: PollConfig,
    /// Cadence for the superseded-run lookup
    pub cancel_poll: PollConfig,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            wait: false,
            continue_on_failure: false,
            poll: PollConfig::default(),
            cancel_poll: PollConfig::cancel_lookup(),
        }
    }
}

/// Execution progress callbacks; all methods default to no-ops
pub trait Progress: Send + Sync {
    /// A PR is being skipped
    fn skipping(&self, _pull: &PullRequest, _reasons: &[String]) {}
    /// A strategy is about to be attempted
    fn attempting(&self, _pull: &PullRequest, _strategy: MergeStrategy) {}
    /// A strategy attempt finished
    fn attempted(
        &self,
        _pull: &PullRequest,
        _strategy: MergeStrategy,
        _outcome: MergeOutcome,
        _message: Option<&str>,
    ) {
    }
    /// A superseded CI run was cancelled
    fn cancelled_run(&self, _pull: &PullRequest, _run_url: &str) {}
    /// Still waiting on a pending merge; `checks` is the current check state
    fn waiting(&self, _pull: &PullRequest, _attempt: u32, _checks: &[CheckRun]) {}
    /// A pending merge landed while waiting
    fn landed(&self, _pull: &PullRequest) {}
}

/// Progress sink that reports nothing
pub struct SilentProgress;

impl Progress for SilentProgress {}

/// What happened to each PR in the plan
#[derive(Debug, Default)]
pub struct MergeExecutionResult {
    /// PRs confirmed merged
    pub merged: Vec<PullRequest>,
    /// PRs with auto-merge armed that had not landed when we stopped looking
    pub pending: Vec<PullRequest>,
    /// PRs every strategy failed on, with the last error message
    pub failed: Vec<(PullRequest, String)>,
}

impl MergeExecutionResult {
    /// Whether every planned merge landed
    pub fn all_merged(&self) -> bool {
        self.pending.is_empty() && self.failed.is_empty()
    }

    /// Whether the run failed without merging anything; callers exit
    /// non-zero on this
    pub fn failed_outright(&self) -> bool {
        self.merged.is_empty() && !self.failed.is_empty()
    }
}

/// Bring every PR the plan will merge up to date with its base
///
/// Best-effort: GitHub refuses the update when the branch is already
/// current or the fork forbids pushes, so failures only get logged and
/// the merge attempt proceeds regardless.
pub async fn refresh_plan_branches(plan: &MergePlan, host: &dyn CodeHost) {
    for step in &plan.steps {
        if let MergeStep::Merge { pull, .. } = step {
            if let Err(e) = host
                .update_pr_branch(&pull.owner, &pull.repo, pull.number)
                .await
            {
                debug!(number = pull.number, error = %e, "branch update failed");
            }
        }
    }
}

/// Execute a merge plan
///
/// Failures of individual strategies never abort execution; a PR only
/// counts as failed once every strategy in its list has been tried. When
/// a PR fails and `continue_on_failure` is off, the remaining steps are
/// left untouched.
pub async fn execute_merge(
    plan: MergePlan,
    host: &dyn CodeHost,
    options: &ExecuteOptions,
    progress: &dyn Progress,
) -> Result<MergeExecutionResult> {
    let mut result = MergeExecutionResult::default();

    for step in plan.steps {
        match step {
            MergeStep::Skip { pull, reasons } => {
                progress.skipping(&pull, &reasons);
            }
            MergeStep::Merge { pull, strategies } => {
                let (outcome, last_message) =
                    attempt_strategies(&pull, &strategies, host, progress).await;

                match outcome {
                    MergeOutcome::Done => {
                        cancel_superseded_runs(&pull, host, options.cancel_poll, progress).await;
                        result.merged.push(pull);
                    }
                    MergeOutcome::Pending => {
                        if options.wait
                            && wait_for_merge(&pull, host, options.poll, progress).await?
                        {
                            progress.landed(&pull);
                            result.merged.push(pull);
                        } else {
                            result.pending.push(pull);
                        }
                    }
                    MergeOutcome::Failed => {
                        let message =
                            last_message.unwrap_or_else(|| "all strategies failed".to_string());
                        result.failed.push((pull, message));
                        if !options.continue_on_failure {
                            break;
                        }
                    }
                }
            }
        }
    }

    Ok(result)
}

/// Try each strategy in order until one merges or arms auto-merge
async fn attempt_strategies(
    pull: &PullRequest,
    strategies: &[MergeStrategy],
    host: &dyn CodeHost,
    progress: &dyn Progress,
) -> (MergeOutcome, Option<String>) {
    let mut last_message = None;

    for &strategy in strategies {
        progress.attempting(pull, strategy);
        debug!(number = pull.number, %strategy, "attempting merge");

        let (outcome, message) = match strategy {
            MergeStrategy::Normal | MergeStrategy::Admin => {
                match host.merge_pr(&pull.owner, &pull.repo, pull.number).await {
                    Ok(merge) if merge.merged => (MergeOutcome::Done, merge.message),
                    Ok(merge) => (
                        MergeOutcome::Failed,
                        Some(merge.message.unwrap_or_else(|| "merge refused".to_string())),
                    ),
                    Err(e) => (MergeOutcome::Failed, Some(e.to_string())),
                }
            }
            MergeStrategy::Auto => {
                match host
                    .enable_auto_merge(&pull.owner, &pull.repo, pull.number)
                    .await
                {
                    Ok(()) => (MergeOutcome::Pending, None),
                    Err(e) => (MergeOutcome::Failed, Some(e.to_string())),
                }
            }
        };

        progress.attempted(pull, strategy, outcome, message.as_deref());
        if outcome != MergeOutcome::Failed {
            return (outcome, message);
        }
        last_message = message;
    }

    (MergeOutcome::Failed, last_message)
}

/// Cancel CI runs still going on the merged PR's head branch
///
/// Best-effort: lookup and cancellation errors are logged and dropped,
/// the merge already happened.
async fn cancel_superseded_runs(
    pull: &PullRequest,
    host: &dyn CodeHost,
    poll: PollConfig,
    progress: &dyn Progress,
) {
    for attempt in 0..poll.max_attempts {
        if attempt > 0 {
            tokio::time::sleep(poll.interval).await;
        }

        let runs = match host
            .branch_runs(&pull.owner, &pull.repo, &pull.head_ref)
            .await
        {
            Ok(runs) => runs,
            Err(e) => {
                debug!(number = pull.number, error = %e, "run lookup failed");
                continue;
            }
        };

        let active: Vec<_> = runs
            .into_iter()
            .filter(|run| run.status == "queued" || run.status == "in_progress")
            .collect();
        if active.is_empty() {
            continue;
        }

        for run in active {
            match host.cancel_run(&pull.owner, &pull.repo, run.id).await {
                Ok(()) => progress.cancelled_run(pull, &run.url),
                Err(e) => debug!(run_id = run.id, error = %e, "cancel failed"),
            }
        }
        return;
    }
}

/// Poll a pending merge until it lands; true when it did
async fn wait_for_merge(
    pull: &PullRequest,
    host: &dyn CodeHost,
    poll: PollConfig,
    progress: &dyn Progress,
) -> Result<bool> {
    for attempt in 1..=poll.max_attempts {
        tokio::time::sleep(poll.interval).await;

        let current = host.pr_view(&pull.owner, &pull.repo, pull.number).await?;
        if current.state == PrState::Merged {
            return Ok(true);
        }
        progress.waiting(pull, attempt, &current.checks);
    }
    Ok(false)
}
