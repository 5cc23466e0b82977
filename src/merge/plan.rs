//! Pure merge planning
//!
//! Takes PRs with their derived flags and produces an ordered plan.
//! No IO happens here, which keeps the decision logic testable.

use crate::types::{MergeStrategy, PrFlags, PrState, PullRequest};

/// One planned action for a PR
#[derive(Debug, Clone)]
pub enum MergeStep {
    /// Merge the PR, trying each strategy in order until one sticks
    Merge {
        /// The PR to merge
        pull: PullRequest,
        /// Strategies in the order to attempt them
        strategies: Vec<MergeStrategy>,
    },
    /// Leave the PR alone
    Skip {
        /// The PR being skipped
        pull: PullRequest,
        /// Human-readable reasons it is not being merged
        reasons: Vec<String>,
    },
}

impl MergeStep {
    /// The PR this step concerns
    pub const fn pull(&self) -> &PullRequest {
        match self {
            Self::Merge { pull, .. } | Self::Skip { pull, .. } => pull,
        }
    }
}

/// An ordered merge plan
#[derive(Debug, Clone, Default)]
pub struct MergePlan {
    /// Steps in input order
    pub steps: Vec<MergeStep>,
}

impl MergePlan {
    /// Number of PRs the plan will actually merge
    pub fn merge_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| matches!(step, MergeStep::Merge { .. }))
            .count()
    }

    /// Whether every PR in the plan is already merged or closed
    ///
    /// A card can finish out-of-band between runs; it still has to advance
    /// on the board even though this run merges nothing.
    pub fn all_finished(&self) -> bool {
        !self.steps.is_empty()
            && self
                .steps
                .iter()
                .all(|step| matches!(step.pull().state, PrState::Merged | PrState::Closed))
    }
}

/// Build a merge plan from PRs and their flags
///
/// Only open, publishable PRs get a merge step; everything else is skipped
/// with the blocking reasons attached. `admin_first` promotes the admin
/// strategy to the front of the attempt order.
pub fn create_merge_plan(targets: Vec<(PullRequest, PrFlags)>, admin_first: bool) -> MergePlan {
    let strategies = if admin_first {
        vec![MergeStrategy::Admin, MergeStrategy::Normal, MergeStrategy::Auto]
    } else {
        vec![MergeStrategy::Normal, MergeStrategy::Auto, MergeStrategy::Admin]
    };

    let steps = targets
        .into_iter()
        .map(|(pull, flags)| {
            if pull.state != PrState::Open {
                let reasons = vec![format!("PR is {}", pull.state)];
                return MergeStep::Skip { pull, reasons };
            }
            if !flags.publishable() {
                return MergeStep::Skip {
                    pull,
                    reasons: flags.blocking_reasons(),
                };
            }
            MergeStep::Merge {
                pull,
                strategies: strategies.clone(),
            }
        })
        .collect();

    MergePlan { steps }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CheckRun, Mergeability, ReviewDecision};
    use chrono::Utc;

    fn open_pr(number: u64) -> PullRequest {
        PullRequest {
            number,
            url: format!("https://github.com/acme/widgets/pull/{number}"),
            title: "feat: widget".to_string(),
            author: Some("alice".to_string()),
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
            state: PrState::Open,
            is_draft: false,
            mergeable: Mergeability::Mergeable,
            review_decision: Some(ReviewDecision::Approved),
            labels: vec!["publish".to_string()],
            approvers: vec![],
            created_at: Utc::now(),
            merged_at: None,
            head_ref: format!("feat-{number}"),
            head_oid: Some("abc".to_string()),
            checks: vec![CheckRun {
                name: "build".to_string(),
                status: "completed".to_string(),
                conclusion: Some("success".to_string()),
            }],
        }
    }

    fn flags(pull: &PullRequest) -> PrFlags {
        PrFlags::derive(pull, &[])
    }

    #[test]
    fn publishable_pr_gets_default_strategy_order() {
        let pull = open_pr(1);
        let f = flags(&pull);
        let plan = create_merge_plan(vec![(pull, f)], false);

        assert_eq!(plan.merge_count(), 1);
        match &plan.steps[0] {
            MergeStep::Merge { strategies, .. } => {
                assert_eq!(
                    strategies.as_slice(),
                    [MergeStrategy::Normal, MergeStrategy::Auto, MergeStrategy::Admin]
                );
            }
            MergeStep::Skip { .. } => panic!("expected a merge step"),
        }
    }

    #[test]
    fn admin_first_promotes_admin() {
        let pull = open_pr(1);
        let f = flags(&pull);
        let plan = create_merge_plan(vec![(pull, f)], true);

        match &plan.steps[0] {
            MergeStep::Merge { strategies, .. } => {
                assert_eq!(strategies[0], MergeStrategy::Admin);
            }
            MergeStep::Skip { .. } => panic!("expected a merge step"),
        }
    }

    #[test]
    fn non_publishable_pr_is_skipped_with_reasons() {
        let mut pull = open_pr(2);
        pull.is_draft = true;
        let f = flags(&pull);
        let plan = create_merge_plan(vec![(pull, f)], false);

        assert_eq!(plan.merge_count(), 0);
        match &plan.steps[0] {
            MergeStep::Skip { reasons, .. } => {
                assert!(reasons.iter().any(|r| r.contains("draft")));
            }
            MergeStep::Merge { .. } => panic!("expected a skip step"),
        }
    }

    #[test]
    fn closed_pr_is_skipped_even_when_flags_are_green() {
        let mut pull = open_pr(3);
        pull.state = PrState::Merged;
        let f = flags(&pull);
        let plan = create_merge_plan(vec![(pull, f)], false);

        match &plan.steps[0] {
            MergeStep::Skip { reasons, .. } => {
                assert_eq!(reasons, &["PR is merged".to_string()]);
            }
            MergeStep::Merge { .. } => panic!("expected a skip step"),
        }
    }

    #[test]
    fn plan_of_merged_and_closed_prs_counts_as_finished() {
        let mut merged = open_pr(1);
        merged.state = PrState::Merged;
        let mut closed = open_pr(2);
        closed.state = PrState::Closed;
        let fm = flags(&merged);
        let fc = flags(&closed);

        let plan = create_merge_plan(vec![(merged, fm), (closed, fc)], false);
        assert_eq!(plan.merge_count(), 0);
        assert!(plan.all_finished());
    }

    #[test]
    fn plan_with_an_open_pr_is_not_finished() {
        let open = open_pr(1);
        let mut merged = open_pr(2);
        merged.state = PrState::Merged;
        let fo = flags(&open);
        let fm = flags(&merged);

        let plan = create_merge_plan(vec![(open, fo), (merged, fm)], false);
        assert!(!plan.all_finished());
        assert!(!MergePlan::default().all_finished());
    }

    #[test]
    fn plan_preserves_input_order() {
        let a = open_pr(1);
        let b = open_pr(2);
        let fa = flags(&a);
        let fb = flags(&b);
        let plan = create_merge_plan(vec![(a, fa), (b, fb)], false);
        assert_eq!(plan.steps[0].pull().number, 1);
        assert_eq!(plan.steps[1].pull().number, 2);
    }
}
