//! Unit tests for the merge orchestrator

mod common;

mod merge_execute_test {
    use crate::common::{make_ready_pr, MockHost};
    use pr_pilot::merge::{
        create_merge_plan, execute_merge, refresh_plan_branches, ExecuteOptions, PollConfig,
        SilentProgress,
    };
    use pr_pilot::types::{MergeResult, PrFlags, PrState, PullRequest, WorkflowRun};
    use std::time::Duration;

    fn fast_options() -> ExecuteOptions {
        ExecuteOptions {
            wait: false,
            continue_on_failure: false,
            poll: PollConfig {
                interval: Duration::ZERO,
                max_attempts: 3,
            },
            cancel_poll: PollConfig {
                interval: Duration::ZERO,
                max_attempts: 1,
            },
        }
    }

    fn targets(pulls: Vec<PullRequest>) -> Vec<(PullRequest, PrFlags)> {
        pulls
            .into_iter()
            .map(|pull| {
                let flags = PrFlags::derive(&pull, &[]);
                (pull, flags)
            })
            .collect()
    }

    fn run(id: u64, status: &str) -> WorkflowRun {
        WorkflowRun {
            id,
            url: format!("https://github.com/acme/widgets/actions/runs/{id}"),
            status: status.to_string(),
            conclusion: None,
            committer_email: None,
        }
    }

    #[tokio::test]
    async fn normal_merge_lands_first_try() {
        let host = MockHost::new();
        host.set_merge_result(
            1,
            MergeResult {
                merged: true,
                sha: Some("deadbeef".to_string()),
                message: None,
            },
        );

        let plan = create_merge_plan(targets(vec![make_ready_pr(1)]), false);
        let result = execute_merge(plan, &host, &fast_options(), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.merged.len(), 1);
        assert!(result.all_merged());
        assert_eq!(host.merge_calls(), [1]);
        assert!(host.auto_merge_calls().is_empty());
    }

    #[tokio::test]
    async fn merge_cancels_superseded_runs() {
        let host = MockHost::new();
        host.set_merge_result(
            1,
            MergeResult {
                merged: true,
                sha: None,
                message: None,
            },
        );
        host.set_branch_runs(
            "feat-1",
            vec![run(77, "in_progress"), run(78, "completed"), run(79, "queued")],
        );

        let plan = create_merge_plan(targets(vec![make_ready_pr(1)]), false);
        execute_merge(plan, &host, &fast_options(), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(host.cancel_calls(), [77, 79]);
    }

    #[tokio::test]
    async fn refused_merge_falls_back_to_auto() {
        let host = MockHost::new();
        host.set_merge_result(
            1,
            MergeResult {
                merged: false,
                sha: None,
                message: Some("required checks still running".to_string()),
            },
        );

        let plan = create_merge_plan(targets(vec![make_ready_pr(1)]), false);
        let result = execute_merge(plan, &host, &fast_options(), &SilentProgress)
            .await
            .unwrap();

        assert!(result.merged.is_empty());
        assert_eq!(result.pending.len(), 1);
        assert_eq!(host.merge_calls(), [1]);
        assert_eq!(host.auto_merge_calls(), [1]);
    }

    #[tokio::test]
    async fn all_strategies_failing_marks_failed() {
        let host = MockHost::new();
        host.fail_merge("merge blocked");
        host.fail_auto_merge("auto-merge not allowed");

        let plan = create_merge_plan(targets(vec![make_ready_pr(1)]), false);
        let result = execute_merge(plan, &host, &fast_options(), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.failed.len(), 1);
        assert!(result.failed[0].1.contains("merge blocked"));
        // normal + admin both hit the merge endpoint
        assert_eq!(host.merge_calls(), [1, 1]);
        assert_eq!(host.auto_merge_calls(), [1]);
    }

    #[tokio::test]
    async fn run_with_only_failures_is_an_outright_failure() {
        let host = MockHost::new();
        host.fail_merge("merge blocked");
        host.fail_auto_merge("auto-merge not allowed");

        let plan = create_merge_plan(targets(vec![make_ready_pr(1)]), false);
        let result = execute_merge(plan, &host, &fast_options(), &SilentProgress)
            .await
            .unwrap();

        assert!(result.failed_outright());
    }

    #[tokio::test]
    async fn partial_success_is_not_an_outright_failure() {
        let host = MockHost::new();
        host.set_merge_result(
            1,
            MergeResult {
                merged: true,
                sha: None,
                message: None,
            },
        );
        host.fail_auto_merge("auto-merge not allowed");

        let plan = create_merge_plan(targets(vec![make_ready_pr(1), make_ready_pr(2)]), false);
        let options = ExecuteOptions {
            continue_on_failure: true,
            ..fast_options()
        };
        let result = execute_merge(plan, &host, &options, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.merged.len(), 1);
        assert_eq!(result.failed.len(), 1);
        assert!(!result.failed_outright());
    }

    #[tokio::test]
    async fn branches_are_refreshed_only_for_planned_merges() {
        let host = MockHost::new();
        let mut draft = make_ready_pr(2);
        draft.is_draft = true;

        let plan = create_merge_plan(targets(vec![make_ready_pr(1), draft]), false);
        refresh_plan_branches(&plan, &host).await;

        assert_eq!(host.update_calls(), [1]);
    }

    #[tokio::test]
    async fn branch_refresh_tolerates_update_failures() {
        let host = MockHost::new();
        host.fail_update("already up to date");

        let plan = create_merge_plan(targets(vec![make_ready_pr(1), make_ready_pr(2)]), false);
        refresh_plan_branches(&plan, &host).await;

        assert_eq!(host.update_calls(), [1, 2]);
    }

    #[tokio::test]
    async fn failure_stops_the_batch_by_default() {
        let host = MockHost::new();
        host.fail_merge("merge blocked");
        host.fail_auto_merge("auto-merge not allowed");

        let plan = create_merge_plan(targets(vec![make_ready_pr(1), make_ready_pr(2)]), false);
        let result = execute_merge(plan, &host, &fast_options(), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.failed.len(), 1);
        assert!(!host.merge_calls().contains(&2));
    }

    #[tokio::test]
    async fn continue_on_failure_keeps_going() {
        let host = MockHost::new();
        host.set_merge_result(
            2,
            MergeResult {
                merged: true,
                sha: None,
                message: None,
            },
        );
        // PR 1 has no canned result: merge_pr returns merged=false, and
        // the default MergeResult fails every strategy that needs it
        host.fail_auto_merge("auto-merge not allowed");

        let plan = create_merge_plan(targets(vec![make_ready_pr(1), make_ready_pr(2)]), false);
        let options = ExecuteOptions {
            continue_on_failure: true,
            ..fast_options()
        };
        let result = execute_merge(plan, &host, &options, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.merged.len(), 1);
        assert_eq!(result.merged[0].number, 2);
    }

    #[tokio::test]
    async fn wait_polls_until_the_pending_merge_lands() {
        let host = MockHost::new();
        host.set_merge_result(
            1,
            MergeResult {
                merged: false,
                sha: None,
                message: Some("checks pending".to_string()),
            },
        );
        let mut merged_view = make_ready_pr(1);
        merged_view.state = PrState::Merged;
        host.set_pr(merged_view);

        let plan = create_merge_plan(targets(vec![make_ready_pr(1)]), false);
        let options = ExecuteOptions {
            wait: true,
            ..fast_options()
        };
        let result = execute_merge(plan, &host, &options, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.merged.len(), 1);
        assert!(result.pending.is_empty());
        assert_eq!(host.pr_view_calls(), [1]);
    }

    #[tokio::test]
    async fn skipped_prs_never_touch_the_host() {
        let mut draft = make_ready_pr(1);
        draft.is_draft = true;

        let host = MockHost::new();
        let plan = create_merge_plan(targets(vec![draft]), false);
        let result = execute_merge(plan, &host, &fast_options(), &SilentProgress)
            .await
            .unwrap();

        assert!(result.all_merged());
        assert!(result.merged.is_empty());
        assert!(host.merge_calls().is_empty());
        assert!(host.auto_merge_calls().is_empty());
    }

    #[tokio::test]
    async fn admin_first_still_falls_back() {
        let host = MockHost::new();
        host.fail_merge("admin refused");

        let plan = create_merge_plan(targets(vec![make_ready_pr(1)]), true);
        let result = execute_merge(plan, &host, &fast_options(), &SilentProgress)
            .await
            .unwrap();

        assert!(result.failed.is_empty());
        assert_eq!(result.pending.len(), 1);
        // admin then normal hit the merge endpoint before auto armed
        assert_eq!(host.merge_calls(), [1, 1]);
        assert_eq!(host.auto_merge_calls(), [1]);
    }
}
