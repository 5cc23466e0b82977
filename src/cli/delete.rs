//! Delete command - remove a branch and its tag, locally and optionally on origin

use crate::cli::style::{check, Stylize};
use anstream::println;
use pr_pilot::error::Result;
use pr_pilot::git::GitRepo;

/// Delete `name` as both a branch and a tag
///
/// All deletions fan out concurrently; each one is best-effort since the
/// ref may only exist in some of the four places.
pub async fn run_delete(name: &str, remote: bool) -> Result<()> {
    let git = GitRepo::open().await?;

    let current = git.current_branch().await?;
    if current == name {
        let default = git.default_branch().await?;
        git.checkout(&default).await?;
        println!("{}", format!("switched to {default} first").muted());
    }

    if remote {
        let (branch, tag, remote_branch, remote_tag) = tokio::join!(
            git.delete_branch(name),
            git.delete_tag(name),
            git.delete_remote_branch(name),
            git.delete_remote_tag(name),
        );
        report("local branch", branch?);
        report("local tag", tag?);
        report("remote branch", remote_branch?);
        report("remote tag", remote_tag?);
        git.remote_prune().await?;
    } else {
        let (branch, tag) = tokio::join!(git.delete_branch(name), git.delete_tag(name));
        report("local branch", branch?);
        report("local tag", tag?);
    }
    Ok(())
}

fn report(what: &str, deleted: bool) {
    if deleted {
        println!("{} deleted {what}", check());
    } else {
        println!("{}", format!("no {what} to delete").muted());
    }
}
