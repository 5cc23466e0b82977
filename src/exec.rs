//! Shell executor
//!
//! Every command in this tool is ultimately a thin sequence of `git`/`gh`
//! invocations; this module runs them, echoes the command line, and captures
//! output.

use crate::error::{Error, Result};
use anstream::println;
use owo_colors::OwoColorize;
use tokio::process::Command;
use tracing::debug;

/// Captured output of a finished command
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// Trimmed stdout
    pub stdout: String,
    /// Trimmed stderr
    pub stderr: String,
    /// Exit code (-1 when terminated by a signal)
    pub code: i32,
}

impl ExecResult {
    /// Whether the command exited zero
    pub const fn success(&self) -> bool {
        self.code == 0
    }
}

fn render(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

async fn run(program: &str, args: &[&str]) -> Result<ExecResult> {
    let output = Command::new(program).args(args).output().await?;

    let result = ExecResult {
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        code: output.status.code().unwrap_or(-1),
    };
    debug!(command = %render(program, args), code = result.code, "ran command");
    Ok(result)
}

/// Run a command, echo it, and return trimmed stdout.
///
/// Non-zero exit becomes [`Error::CommandFailed`] carrying the captured
/// stderr.
pub async fn sh(program: &str, args: &[&str]) -> Result<String> {
    let command = render(program, args);
    let result = run(program, args).await?;

    if result.success() {
        println!("{} {command}", "$".green());
        Ok(result.stdout)
    } else {
        println!("{} {command}", "$".red());
        Err(Error::CommandFailed {
            command,
            code: result.code,
            stderr: result.stderr,
        })
    }
}

/// Run a command where failure is an expected outcome.
///
/// Echoes the command and returns the full result regardless of exit code;
/// only spawn errors are surfaced.
pub async fn sh_unchecked(program: &str, args: &[&str]) -> Result<ExecResult> {
    let command = render(program, args);
    let result = run(program, args).await?;

    let marker = if result.success() {
        format!("{}", "$".green())
    } else {
        format!("{}", "$".red())
    };
    println!("{marker} {command}");
    Ok(result)
}

/// Run a probing command without echoing it
pub async fn sh_quiet(program: &str, args: &[&str]) -> Result<ExecResult> {
    run(program, args).await
}
