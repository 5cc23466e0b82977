//! Continue command - resume an interrupted rebase and push the result

use crate::cli::style::{check, Stylize};
use anstream::println;
use pr_pilot::error::Result;
use pr_pilot::git::GitRepo;

/// Stage the resolution, continue the rebase, force-push
pub async fn run_continue() -> Result<()> {
    let git = GitRepo::open().await?;

    git.add_all().await?;
    git.rebase_continue().await?;

    let branch = git.current_branch().await?;
    println!("{} rebase continued on {}", check(), branch.accent());

    git.push_force_upstream(&branch).await?;
    println!("{} force-pushed {}", check(), branch.accent());
    Ok(())
}
