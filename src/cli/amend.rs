//! Amend command - fold working tree changes into the last commit and push

use crate::cli::style::{check, Stylize};
use anstream::println;
use pr_pilot::error::Result;
use pr_pilot::git::GitRepo;

/// Stage everything, amend the last commit, force-push with upstream
pub async fn run_amend() -> Result<()> {
    let git = GitRepo::open().await?;
    let branch = git.current_branch().await?;

    git.add_all().await?;
    git.commit_amend_no_edit().await?;
    println!("{} amended last commit on {}", check(), branch.accent());

    git.push_force_upstream(&branch).await?;
    println!("{} force-pushed {}", check(), branch.accent());
    Ok(())
}
