//! Doctor command - check the environment this tool depends on

use crate::cli::style::{check, cross, Stylize};
use anstream::println;
use pr_pilot::auth::github_token;
use pr_pilot::config::{default_path, Config};
use pr_pilot::error::{Error, Result};
use pr_pilot::exec::sh_quiet;
use pr_pilot::git::GitRepo;

/// Probe everything the commands rely on and report line by line
///
/// Problems are collected rather than returned one at a time, so the user
/// sees the full picture in one pass; any problem makes the command fail.
pub async fn run_doctor() -> Result<()> {
    let mut problems = 0u32;

    // git
    match GitRepo::open().await {
        Ok(_) => println!("{} inside a git work tree", check()),
        Err(_) => {
            println!("{} not inside a git work tree", cross());
            problems += 1;
        }
    }

    // gh CLI
    let gh = sh_quiet("gh", &["--version"]).await;
    match gh {
        Ok(result) if result.success() => println!("{} gh CLI available", check()),
        _ => println!(
            "{} gh CLI not found {}",
            cross(),
            "(GITHUB_TOKEN still works)".muted()
        ),
    }

    // GitHub auth
    match github_token().await {
        Ok((_, source)) => println!("{} GitHub token from {source}", check()),
        Err(e) => {
            println!("{} {e}", cross());
            problems += 1;
        }
    }

    // Config
    match default_path() {
        Ok(path) if path.exists() => {
            println!("{} config at {}", check(), path.display().to_string().accent());
            match Config::load() {
                Ok(config) => {
                    if config.organization.is_empty() {
                        println!("{} `organization` not set", cross());
                        problems += 1;
                    } else {
                        println!("{} organization: {}", check(), config.organization.accent());
                    }
                    println!(
                        "{} {} team(s), {} quality reviewer(s)",
                        check(),
                        config.teams.len(),
                        config.quality_team.len()
                    );
                }
                Err(e) => {
                    println!("{} {e}", cross());
                    problems += 1;
                }
            }
        }
        Ok(path) => {
            println!(
                "{} no config file {}",
                cross(),
                format!("(expected at {})", path.display()).muted()
            );
            problems += 1;
        }
        Err(e) => {
            println!("{} {e}", cross());
            problems += 1;
        }
    }

    // Optional service tokens
    for (var, what) in [
        ("FLUX_TOKEN", "board integration"),
        ("OPENAI_TOKEN", "description generation"),
        ("SHEETS_TOKEN", "spreadsheet reporting"),
    ] {
        if std::env::var(var).is_ok_and(|v| !v.is_empty()) {
            println!("{} {var} set ({what})", check());
        } else {
            println!("{}", format!("- {var} not set ({what} disabled)").muted());
        }
    }

    if problems > 0 {
        return Err(Error::Config(format!("{problems} problem(s) found")));
    }
    Ok(())
}
