//! Merge orchestration
//!
//! Split into a pure planning step and an effectful execution step:
//! [`plan`] decides which PRs to merge and which strategies to try,
//! [`execute`] drives the code host through the plan.

pub mod execute;
pub mod plan;

pub use execute::{
    execute_merge, refresh_plan_branches, ExecuteOptions, MergeExecutionResult, PollConfig,
    Progress, SilentProgress,
};
pub use plan::{create_merge_plan, MergePlan, MergeStep};
