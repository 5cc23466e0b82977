//! Push command - force-push the current branch with upstream tracking

use crate::cli::style::{check, Stylize};
use anstream::println;
use pr_pilot::error::Result;
use pr_pilot::git::GitRepo;

/// Force-push the current branch to origin
///
/// Refuses on a dirty work tree: uncommitted changes usually mean the
/// push was meant to come after an `amend`.
pub async fn run_push() -> Result<()> {
    let git = GitRepo::open().await?;
    git.ensure_clean().await?;

    let branch = git.current_branch().await?;
    git.push_force_upstream(&branch).await?;
    println!("{} force-pushed {}", check(), branch.accent());
    Ok(())
}
