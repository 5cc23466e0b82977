//! Rebase command - rebase the current branch onto an up-to-date base

use crate::cli::style::{check, Stylize};
use anstream::println;
use pr_pilot::error::Result;
use pr_pilot::git::GitRepo;

/// Options for the rebase command
#[derive(Debug, Clone, Default)]
pub struct RebaseOptions {
    /// Base branch to rebase onto; origin's default branch when unset
    pub base: Option<String>,
    /// Force-push once the rebase finishes cleanly
    pub push: bool,
    /// Skip the dirty work tree check
    pub force: bool,
    /// Ask GitHub to update the PR branch instead of rebasing locally
    pub pr: bool,
}

/// Refresh the base branch, rebase onto it, optionally push
pub async fn run_rebase(options: RebaseOptions) -> Result<()> {
    if options.pr {
        return update_pr_branch().await;
    }

    let git = GitRepo::open().await?;
    if !options.force {
        git.ensure_clean().await?;
    }

    let branch = git.current_branch().await?;
    let base = match options.base {
        Some(base) => base,
        None => git.default_branch().await?,
    };

    println!("{}", "fetching origin...".muted());
    git.fetch_all_prune().await?;
    git.fetch_tags().await?;

    git.checkout(&base).await?;
    git.pull(&base).await?;
    git.checkout(&branch).await?;
    git.rebase(&base).await?;
    println!("{} rebased {} onto {}", check(), branch.accent(), base.accent());

    // A branch with nothing left on it after the rebase already landed
    if git.merged_branches(&base).await?.contains(&branch) {
        git.checkout(&base).await?;
        git.delete_branch(&branch).await?;
        println!(
            "{} {} was already merged into {}, deleted it",
            check(),
            branch.accent(),
            base.accent()
        );
        return Ok(());
    }

    if options.push {
        git.push_force_upstream(&branch).await?;
        println!("{} force-pushed {}", check(), branch.accent());
    }
    Ok(())
}

/// Server-side rebase: let GitHub update the PR branch from its base
async fn update_pr_branch() -> Result<()> {
    use crate::cli::context::CommandContext;
    use pr_pilot::error::Error;

    let ctx = CommandContext::new().await?;
    let branch = ctx.git.current_branch().await?;
    let pull = ctx
        .host
        .pr_for_branch(&ctx.owner, &ctx.repo, &branch)
        .await?
        .ok_or_else(|| Error::NotFound(format!("no open PR for branch {branch}")))?;

    ctx.host
        .update_pr_branch(&ctx.owner, &ctx.repo, pull.number)
        .await?;
    println!(
        "{} asked GitHub to update {}#{}",
        check(),
        ctx.repo,
        pull.number.accent()
    );
    Ok(())
}
