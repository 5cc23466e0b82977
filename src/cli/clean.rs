//! Clean command - prune branches that already landed

use crate::cli::style::{check, Stylize};
use anstream::println;
use dialoguer::MultiSelect;
use pr_pilot::config::Config;
use pr_pilot::error::{Error, Result};
use pr_pilot::git::GitRepo;

/// Delete local branches merged into the default branch; with `remote`,
/// offer the merged branches on origin for deletion too
pub async fn run_clean(remote: bool) -> Result<()> {
    let git = GitRepo::open().await?;
    let config = Config::load()?;
    let default = git.default_branch().await?;

    println!("{}", "fetching and pruning origin...".muted());
    git.fetch_all_prune().await?;
    git.remote_prune().await?;

    let current = git.current_branch().await?;
    let protected = &config.protected_branches;
    let locals = git.local_branches().await?;

    let mut removed = 0usize;
    for branch in git.merged_branches(&default).await? {
        if branch == current || protected.contains(&branch) || !locals.contains(&branch) {
            continue;
        }
        if git.delete_branch(&branch).await? {
            println!("{} deleted {}", check(), branch.accent());
            removed += 1;
        }
    }

    if remote {
        removed += clean_remote(&git, &config, &default).await?;
    }

    if removed == 0 {
        println!("{}", "nothing to clean".muted());
    } else {
        println!("{} removed {removed} branch(es)", check());
    }
    Ok(())
}

/// Pick merged remote branches to delete, everything selected by default
async fn clean_remote(git: &GitRepo, config: &Config, default: &str) -> Result<usize> {
    let protected = &config.protected_branches;
    let base = format!("origin/{default}");
    let merged = git.merged_remote_branches(&base, protected).await?;

    let all = git.remote_branches(protected).await?;
    let unmerged = all.iter().filter(|b| !merged.contains(b)).count();
    if unmerged > 0 {
        println!(
            "{}",
            format!("leaving {unmerged} unmerged remote branch(es) alone").muted()
        );
    }
    if merged.is_empty() {
        return Ok(0);
    }

    let defaults = vec![true; merged.len()];
    let picked = MultiSelect::new()
        .with_prompt("Delete these merged remote branches?")
        .items(&merged)
        .defaults(&defaults)
        .interact()
        .map_err(|e| Error::Internal(format!("failed to read selection: {e}")))?;

    let mut removed = 0usize;
    for index in picked {
        if git.delete_remote_branch(&merged[index]).await? {
            println!("{} deleted origin/{}", check(), merged[index].accent());
            removed += 1;
        }
    }
    Ok(removed)
}
