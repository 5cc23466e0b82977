//! Typed wrapper over the `git` CLI
//!
//! Commands shell out rather than linking a git library: the tool exists to
//! orchestrate the same binaries the team runs by hand.

use crate::error::{Error, Result};
use crate::exec::{sh, sh_quiet, sh_unchecked};

/// Handle to the git repository in the current working directory
pub struct GitRepo;

impl GitRepo {
    /// Open the repository, verifying we are inside a work tree
    pub async fn open() -> Result<Self> {
        let probe = sh_quiet("git", &["rev-parse", "--is-inside-work-tree"]).await?;
        if !probe.success() || probe.stdout != "true" {
            return Err(Error::Git("not inside a git work tree".to_string()));
        }
        Ok(Self)
    }

    /// Name of the currently checked out branch
    pub async fn current_branch(&self) -> Result<String> {
        sh("git", &["rev-parse", "--abbrev-ref", "HEAD"]).await
    }

    /// SHA of HEAD
    pub async fn head_sha(&self) -> Result<String> {
        sh("git", &["rev-parse", "HEAD"]).await
    }

    /// Absolute path of the repository root
    pub async fn toplevel(&self) -> Result<String> {
        sh("git", &["rev-parse", "--show-toplevel"]).await
    }

    /// Whether the work tree has uncommitted changes
    pub async fn is_dirty(&self) -> Result<bool> {
        let status = sh_quiet("git", &["status", "--porcelain"]).await?;
        Ok(!status.stdout.is_empty())
    }

    /// Error out when the work tree is dirty
    pub async fn ensure_clean(&self) -> Result<()> {
        if self.is_dirty().await? {
            return Err(Error::DirtyWorkTree);
        }
        Ok(())
    }

    /// `git fetch --all --prune`
    pub async fn fetch_all_prune(&self) -> Result<()> {
        sh("git", &["fetch", "--all", "--prune"]).await?;
        Ok(())
    }

    /// `git fetch --tags --force`
    pub async fn fetch_tags(&self) -> Result<()> {
        sh("git", &["fetch", "--tags", "--force"]).await?;
        Ok(())
    }

    /// `git remote prune origin`
    pub async fn remote_prune(&self) -> Result<()> {
        sh("git", &["remote", "prune", "origin"]).await?;
        Ok(())
    }

    /// Check out a branch
    pub async fn checkout(&self, branch: &str) -> Result<()> {
        sh("git", &["checkout", branch]).await?;
        Ok(())
    }

    /// Pull a branch from origin
    pub async fn pull(&self, branch: &str) -> Result<()> {
        sh("git", &["pull", "origin", branch]).await?;
        Ok(())
    }

    /// Rebase the current branch onto `base`
    pub async fn rebase(&self, base: &str) -> Result<()> {
        sh("git", &["rebase", base]).await?;
        Ok(())
    }

    /// Continue an interrupted rebase, accepting the staged resolution
    pub async fn rebase_continue(&self) -> Result<()> {
        sh("git", &["-c", "core.editor=true", "rebase", "--continue"]).await?;
        Ok(())
    }

    /// Stage everything
    pub async fn add_all(&self) -> Result<()> {
        sh("git", &["add", "-A"]).await?;
        Ok(())
    }

    /// Amend the last commit without editing the message or running hooks
    pub async fn commit_amend_no_edit(&self) -> Result<()> {
        sh("git", &["commit", "--amend", "--no-verify", "--no-edit"]).await?;
        Ok(())
    }

    /// Force-push a branch to origin, setting upstream, skipping hooks
    pub async fn push_force_upstream(&self, branch: &str) -> Result<()> {
        sh(
            "git",
            &["push", "origin", branch, "-u", "-f", "--no-verify"],
        )
        .await?;
        Ok(())
    }

    /// Delete a local branch; returns whether a branch was deleted
    pub async fn delete_branch(&self, name: &str) -> Result<bool> {
        let result = sh_unchecked("git", &["branch", "-D", name]).await?;
        Ok(result.success())
    }

    /// Delete a local tag; returns whether a tag was deleted
    pub async fn delete_tag(&self, name: &str) -> Result<bool> {
        let result = sh_unchecked("git", &["tag", "-d", name]).await?;
        Ok(result.success())
    }

    /// Delete a remote branch; returns whether the push succeeded
    pub async fn delete_remote_branch(&self, name: &str) -> Result<bool> {
        let refspec = format!(":refs/heads/{name}");
        let result = sh_unchecked("git", &["push", "origin", &refspec, "--no-verify"]).await?;
        Ok(result.success())
    }

    /// Delete a remote tag; returns whether the push succeeded
    pub async fn delete_remote_tag(&self, name: &str) -> Result<bool> {
        let refspec = format!(":refs/tags/{name}");
        let result = sh_unchecked("git", &["push", "origin", &refspec, "--no-verify"]).await?;
        Ok(result.success())
    }

    /// Local branch names, current-branch marker stripped
    pub async fn local_branches(&self) -> Result<Vec<String>> {
        let out = sh_quiet("git", &["branch"]).await?;
        Ok(parse_branch_list(&out.stdout))
    }

    /// Local branches already merged into `base`, excluding `base` itself;
    /// callers filter out the current and protected branches
    pub async fn merged_branches(&self, base: &str) -> Result<Vec<String>> {
        let out = sh("git", &["branch", "--merged", base]).await?;
        Ok(parse_branch_list(&out)
            .into_iter()
            .filter(|name| name != base)
            .collect())
    }

    /// Remote branch names eligible for cleanup
    ///
    /// Strips the `origin/` prefix and drops the symbolic HEAD entry,
    /// protected branches, and bot-managed prefixes.
    pub async fn remote_branches(&self, protected: &[String]) -> Result<Vec<String>> {
        let out = sh("git", &["branch", "-r"]).await?;
        Ok(filter_remote_branches(&out, protected))
    }

    /// Remote branches already merged into `base`, filtered like
    /// [`Self::remote_branches`]
    pub async fn merged_remote_branches(
        &self,
        base: &str,
        protected: &[String],
    ) -> Result<Vec<String>> {
        let out = sh("git", &["branch", "-r", "--merged", base]).await?;
        Ok(filter_remote_branches(&out, protected))
    }

    /// Message of the last commit (full body)
    pub async fn last_commit_message(&self) -> Result<String> {
        sh("git", &["log", "--pretty=%B", "-n", "1"]).await
    }

    /// Default branch of origin, falling back to probing master/main
    pub async fn default_branch(&self) -> Result<String> {
        let head = sh_quiet("git", &["symbolic-ref", "refs/remotes/origin/HEAD", "--short"]).await?;
        if head.success() {
            if let Some(name) = head.stdout.strip_prefix("origin/") {
                return Ok(name.to_string());
            }
        }
        for candidate in ["master", "main"] {
            let probe = sh_quiet(
                "git",
                &["show-ref", "--verify", &format!("refs/heads/{candidate}")],
            )
            .await?;
            if probe.success() {
                return Ok(candidate.to_string());
            }
        }
        Err(Error::Git("could not determine the default branch".to_string()))
    }
}

/// Parse `git branch` output into clean names
fn parse_branch_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|line| line.trim().trim_start_matches("* ").trim().to_string())
        .filter(|name| !name.is_empty() && !name.starts_with('*'))
        .collect()
}

/// Filter `git branch -r` output down to cleanup candidates
fn filter_remote_branches(output: &str, protected: &[String]) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.contains("->"))
        .filter_map(|line| line.strip_prefix("origin/"))
        .filter(|name| !protected.iter().any(|p| p == name))
        .filter(|name| !name.starts_with("dependabot/") && !name.starts_with("wiki/"))
        .map(ToString::to_string)
        .collect()
}
