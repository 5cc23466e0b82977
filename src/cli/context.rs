//! Shared command context
//!
//! Bundles the setup every host-facing command repeats: open the git repo,
//! load configuration, resolve the origin remote, authenticate, and build
//! the code-host service.

use pr_pilot::auth::github_token;
use pr_pilot::config::Config;
use pr_pilot::error::Result;
use pr_pilot::exec::sh;
use pr_pilot::git::GitRepo;
use pr_pilot::platform::{parse_repo_url, CodeHost, GitHubService};
use tracing::debug;

/// Shared context for commands that talk to both git and the code host
pub struct CommandContext {
    /// The local repository
    pub git: GitRepo,
    /// Loaded configuration
    pub config: Config,
    /// Code-host service
    pub host: Box<dyn CodeHost>,
    /// Repository owner from the origin remote
    pub owner: String,
    /// Repository name from the origin remote
    pub repo: String,
    /// Default branch of origin
    pub default_branch: String,
}

impl CommandContext {
    /// Build the full context; fails fast on missing repo or credentials
    pub async fn new() -> Result<Self> {
        let git = GitRepo::open().await?;
        let config = Config::load()?;

        let remote_url = sh("git", &["remote", "get-url", "origin"]).await?;
        let (owner, repo) = parse_repo_url(&remote_url)?;
        let default_branch = git.default_branch().await?;

        let (token, source) = github_token().await?;
        debug!(%source, "authenticated with GitHub");
        let host = Box::new(GitHubService::new(&token)?);

        Ok(Self {
            git,
            config,
            host,
            owner,
            repo,
            default_branch,
        })
    }
}
