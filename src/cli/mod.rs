//! CLI command implementations

pub mod amend;
pub mod cancel;
pub mod clean;
pub mod context;
pub mod continue_rebase;
pub mod create;
pub mod delete;
pub mod doctor;
pub mod merge;
pub mod merged;
pub mod opened;
pub mod push;
pub mod rebase;
pub mod style;
pub mod watch;

use crate::cli::style::{check, cross, Stylize};
use anstream::println;
use dialoguer::Select;
use pr_pilot::config::Config;
use pr_pilot::error::{Error, Result};
use pr_pilot::merge::Progress;
use pr_pilot::report::format_check_line;
use pr_pilot::types::{CheckRun, MergeOutcome, MergeStrategy, PullRequest};

/// Resolve the author roster for the aggregation commands
///
/// An explicit team name wins; otherwise a single configured team is used
/// directly, and multiple teams get an interactive picker with an "all
/// teams" entry.
pub fn pick_roster(config: &Config, team: Option<&str>) -> Result<Vec<String>> {
    if let Some(name) = team {
        return Ok(config.team(name)?.to_vec());
    }

    let names = config.team_names();
    match names.len() {
        0 => Err(Error::Config(
            "no teams configured; add a [teams] table to config.toml".to_string(),
        )),
        1 => Ok(config.team(names[0])?.to_vec()),
        _ => {
            let mut items: Vec<&str> = names.clone();
            items.push("all teams");
            let picked = Select::new()
                .with_prompt("Which team?")
                .items(&items)
                .default(0)
                .interact()
                .map_err(|e| Error::Internal(format!("failed to read selection: {e}")))?;

            if picked == names.len() {
                let mut all: Vec<String> =
                    config.teams.values().flatten().cloned().collect();
                all.sort();
                all.dedup();
                Ok(all)
            } else {
                Ok(config.team(names[picked])?.to_vec())
            }
        }
    }
}

/// Progress renderer for merge execution
pub struct CliProgress;

impl Progress for CliProgress {
    fn skipping(&self, pull: &PullRequest, reasons: &[String]) {
        println!(
            "{} {}#{}: {}",
            "skip".warn(),
            pull.repo,
            pull.number,
            reasons.join(", ").muted()
        );
    }

    fn attempting(&self, pull: &PullRequest, strategy: MergeStrategy) {
        println!(
            "{}",
            format!("trying {strategy} merge on {}#{}...", pull.repo, pull.number).muted()
        );
    }

    fn attempted(
        &self,
        pull: &PullRequest,
        strategy: MergeStrategy,
        outcome: MergeOutcome,
        message: Option<&str>,
    ) {
        match outcome {
            MergeOutcome::Done => {
                println!(
                    "{} {}#{} merged ({strategy})",
                    check(),
                    pull.repo,
                    pull.number.accent()
                );
            }
            MergeOutcome::Pending => {
                println!(
                    "{} {}#{} auto-merge armed, will land when checks pass",
                    "⏳".warn(),
                    pull.repo,
                    pull.number.accent()
                );
            }
            MergeOutcome::Failed => {
                println!(
                    "{} {strategy} merge failed on {}#{}: {}",
                    cross(),
                    pull.repo,
                    pull.number,
                    message.unwrap_or("unknown error").muted()
                );
            }
        }
    }

    fn cancelled_run(&self, pull: &PullRequest, run_url: &str) {
        println!(
            "{} cancelled superseded run for {}#{}: {}",
            check(),
            pull.repo,
            pull.number,
            run_url.muted()
        );
    }

    fn waiting(&self, pull: &PullRequest, attempt: u32, checks: &[CheckRun]) {
        println!(
            "{}",
            format!("waiting on {}#{} (attempt {attempt})", pull.repo, pull.number).muted()
        );
        for line in checks.iter().map(format_check_line) {
            println!("{line}");
        }
    }

    fn landed(&self, pull: &PullRequest) {
        println!("{} {}#{} landed", check(), pull.repo, pull.number.accent());
    }
}
