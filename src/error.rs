//! Error types for pr-pilot

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the CLI can surface
#[derive(Debug, Error)]
pub enum Error {
    /// A git invocation failed
    #[error("git: {0}")]
    Git(String),

    /// An external command exited non-zero
    #[error("command `{command}` exited with {code}: {stderr}")]
    CommandFailed {
        /// The command line that was run
        command: String,
        /// Exit code (-1 when killed by a signal)
        code: i32,
        /// Captured stderr, trimmed
        stderr: String,
    },

    /// The working tree has uncommitted changes
    #[error("working tree is dirty, commit or stash your changes first")]
    DirtyWorkTree,

    /// GitHub API error
    #[error("GitHub API: {0}")]
    GitHubApi(String),

    /// Flux kanban API error
    #[error("Flux API: {0}")]
    Flux(String),

    /// Google Sheets API error
    #[error("Sheets API: {0}")]
    Sheets(String),

    /// LLM completion API error
    #[error("OpenAI API: {0}")]
    OpenAi(String),

    /// Configuration problem
    #[error("config: {0}")]
    Config(String),

    /// Missing or unusable credentials
    #[error("auth: {0}")]
    Auth(String),

    /// Something that was looked up does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Internal invariant violation
    #[error("internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<octocrab::Error> for Error {
    fn from(err: octocrab::Error) -> Self {
        Self::GitHubApi(err.to_string())
    }
}
