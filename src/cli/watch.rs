//! Watch command - open the CI run for the current HEAD in the browser

use crate::cli::context::CommandContext;
use crate::cli::style::Stylize;
use anstream::println;
use pr_pilot::error::{Error, Result};

/// Open the newest workflow run for the current commit, falling back to
/// the branch and then to the repository's Actions page
pub async fn run_watch() -> Result<()> {
    let ctx = CommandContext::new().await?;
    let sha = ctx.git.head_sha().await?;

    let mut runs = ctx.host.commit_runs(&ctx.owner, &ctx.repo, &sha).await?;
    if runs.is_empty() {
        let branch = ctx.git.current_branch().await?;
        runs = ctx.host.branch_runs(&ctx.owner, &ctx.repo, &branch).await?;
    }

    let url = runs.first().map_or_else(
        || format!("https://github.com/{}/{}/actions", ctx.owner, ctx.repo),
        |run| run.url.clone(),
    );

    println!("{}", format!("opening {url}").muted());
    open_browser(&url)
}

/// Spawn the platform's opener detached; we do not wait for the browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    let opener = "open";
    #[cfg(target_os = "windows")]
    let opener = "explorer";
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let opener = "xdg-open";

    tokio::process::Command::new(opener)
        .arg(url)
        .spawn()
        .map_err(|e| Error::Internal(format!("failed to launch {opener}: {e}")))?;
    Ok(())
}
