//! Credential lookup for the external collaborators
//!
//! GitHub tokens come from the environment or from the `gh` CLI; everything
//! else is environment-only. Nothing is ever written to disk.

use crate::error::{Error, Result};
use crate::exec::sh_quiet;

/// Source of an authentication token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSource {
    /// Token from an environment variable
    EnvVar,
    /// Token from the `gh` CLI
    Cli,
}

impl std::fmt::Display for AuthSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EnvVar => write!(f, "environment"),
            Self::Cli => write!(f, "gh CLI"),
        }
    }
}

/// GitHub token: `GITHUB_TOKEN` env var first, then `gh auth token`
pub async fn github_token() -> Result<(String, AuthSource)> {
    if let Ok(token) = std::env::var("GITHUB_TOKEN") {
        if !token.is_empty() {
            return Ok((token, AuthSource::EnvVar));
        }
    }

    let result = sh_quiet("gh", &["auth", "token"]).await?;
    if result.success() && !result.stdout.is_empty() {
        return Ok((result.stdout, AuthSource::Cli));
    }

    Err(Error::Auth(
        "no GitHub token: set GITHUB_TOKEN or run `gh auth login`".to_string(),
    ))
}

fn env_token(var: &str, hint: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(token) if !token.is_empty() => Ok(token),
        _ => Err(Error::Auth(format!("set {var} to use {hint}"))),
    }
}

/// Flux kanban API token
pub fn flux_token() -> Result<String> {
    env_token("FLUX_TOKEN", "the Flux integration")
}

/// LLM completion API token
pub fn openai_token() -> Result<String> {
    env_token("OPENAI_TOKEN", "description generation")
}

/// Google Sheets API bearer token
pub fn sheets_token() -> Result<String> {
    env_token("SHEETS_TOKEN", "spreadsheet reporting")
}
