//! Cancel command - stop the CI runs for the current HEAD

use crate::cli::context::CommandContext;
use crate::cli::style::{check, Stylize};
use anstream::println;
use pr_pilot::error::Result;
use pr_pilot::types::WorkflowRun;
use std::time::Duration;

/// Run lookup cadence; runs can take a moment to appear after a push
const LOOKUP_ATTEMPTS: u32 = 3;
const LOOKUP_SLEEP: Duration = Duration::from_secs(3);

/// Cancel every queued or running workflow run for the current commit
pub async fn run_cancel() -> Result<()> {
    let ctx = CommandContext::new().await?;
    let sha = ctx.git.head_sha().await?;

    let active = find_active_runs(&ctx, &sha).await?;
    if active.is_empty() {
        println!("{}", "no active runs for HEAD".muted());
        return Ok(());
    }

    for run in active {
        ctx.host.cancel_run(&ctx.owner, &ctx.repo, run.id).await?;
        println!("{} cancelled {}", check(), run.url.muted());
    }
    Ok(())
}

async fn find_active_runs(ctx: &CommandContext, sha: &str) -> Result<Vec<WorkflowRun>> {
    for attempt in 0..LOOKUP_ATTEMPTS {
        if attempt > 0 {
            tokio::time::sleep(LOOKUP_SLEEP).await;
        }
        let runs = ctx.host.commit_runs(&ctx.owner, &ctx.repo, sha).await?;
        let active: Vec<_> = runs
            .into_iter()
            .filter(|run| run.status == "queued" || run.status == "in_progress")
            .collect();
        if !active.is_empty() {
            return Ok(active);
        }
    }
    Ok(Vec::new())
}
