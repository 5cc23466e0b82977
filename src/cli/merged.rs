//! Merged command - report PRs merged in the recent window

use crate::cli::context::CommandContext;
use crate::cli::pick_roster;
use crate::cli::style::{check, spinner_style, Stylize};
use anstream::println;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use indicatif::ProgressBar;
use pr_pilot::auth::sheets_token;
use pr_pilot::error::{Error, Result};
use pr_pilot::report::{age_days, clean_title, mean_age, merged_within, render_table, Cell};
use pr_pilot::sheets::SheetsClient;
use pr_pilot::types::{PullRequest, WorkflowRun};

/// Publish polling cadence: deploy pipelines take minutes, not seconds
const PUBLISH_POLL_SECS: u64 = 5;
const PUBLISH_POLL_CAP: u32 = 120;

/// Report days roll over on the team's wall clock, UTC-3 year round
/// (Brazil has had no DST since 2019)
const REPORT_UTC_OFFSET_SECS: i32 = -3 * 3600;

/// Options for the merged command
#[derive(Debug, Clone, Default)]
pub struct MergedOptions {
    /// Restrict authors to a configured team
    pub team: Option<String>,
    /// Window size in days, ignored when an explicit range is given
    pub days: i64,
    /// Window start, YYYY-MM-DD
    pub from: Option<String>,
    /// Window end, YYYY-MM-DD
    pub to: Option<String>,
    /// Also append the rows to the tracking spreadsheet
    pub sheet: bool,
    /// Watch the publish pipelines of the affected repos until they finish
    pub watch: bool,
}

/// List PRs merged in the window, oldest merge first
pub async fn run_merged(options: MergedOptions) -> Result<()> {
    let ctx = CommandContext::new().await?;
    let org = ctx.config.require_organization()?;
    let roster = pick_roster(&ctx.config, options.team.as_deref())?;
    let (start, end) = window(&options)?;

    println!(
        "{}",
        format!(
            "fetching PRs merged between {} and {}...",
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        )
        .muted()
    );

    let pulls = ctx.host.list_merged_prs(org, &roster).await?;
    let mut merged = merged_within(pulls, start, end);
    merged.sort_by_key(|pull| pull.merged_at);

    if merged.is_empty() {
        println!("{}", "nothing merged in the window".muted());
        return Ok(());
    }

    print_report(&merged);

    if options.sheet {
        append_to_sheet(&ctx, &merged).await?;
    }
    if options.watch {
        watch_publish_runs(&ctx, &merged).await?;
    }
    Ok(())
}

/// Resolve the reporting window from explicit dates or the day count
///
/// Explicit dates are the team's local days, converted to UTC bounds.
fn window(options: &MergedOptions) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let end = match options.to.as_deref() {
        Some(raw) => local_day_bound(parse_day(raw)?, 23, 59, 59)?,
        None => Utc::now(),
    };
    let start = match options.from.as_deref() {
        Some(raw) => local_day_bound(parse_day(raw)?, 0, 0, 0)?,
        None => end - Duration::days(options.days),
    };
    if start > end {
        return Err(Error::Config(format!(
            "window starts after it ends ({} > {})",
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        )));
    }
    Ok((start, end))
}

fn parse_day(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| Error::Config(format!("invalid date `{raw}`, expected YYYY-MM-DD")))
}

/// A wall-clock instant on `day` in the report timezone, as UTC
fn local_day_bound(day: NaiveDate, hour: u32, min: u32, sec: u32) -> Result<DateTime<Utc>> {
    FixedOffset::east_opt(REPORT_UTC_OFFSET_SECS)
        .and_then(|tz| day.and_hms_opt(hour, min, sec)?.and_local_timezone(tz).single())
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| Error::Internal("invalid day bound".to_string()))
}

fn print_report(merged: &[PullRequest]) {
    let now = Utc::now();
    let headers = ["repo", "pr", "title", "author", "merged", "took"];
    let rows: Vec<Vec<Cell>> = merged
        .iter()
        .map(|pull| {
            vec![
                Cell::plain(&pull.repo),
                Cell::plain(format!("#{}", pull.number)),
                Cell::plain(clean_title(&pull.title)),
                Cell::plain(pull.author.as_deref().unwrap_or("-")),
                Cell::plain(
                    pull.merged_at
                        .map(|t| t.format("%Y-%m-%d").to_string())
                        .unwrap_or_default(),
                ),
                Cell::plain(format!("{}d", age_days(pull, now))),
            ]
        })
        .collect();

    println!("{}", render_table(&headers, &rows));
    println!(
        "{}",
        format!(
            "{} PR(s), mean time to merge {:.1} day(s)",
            merged.len(),
            mean_age(merged, now)
        )
        .emphasis()
    );
}

/// Poll the publish pipeline of every affected repo until it completes
///
/// Bot-authored pushes (version bumps and the like) are ignored when
/// picking the run to watch.
async fn watch_publish_runs(ctx: &CommandContext, merged: &[PullRequest]) -> Result<()> {
    let mut repos: Vec<(String, String)> = merged
        .iter()
        .map(|pull| (pull.owner.clone(), pull.repo.clone()))
        .collect();
    repos.sort();
    repos.dedup();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(spinner_style());
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));

    for _ in 0..PUBLISH_POLL_CAP {
        let mut remaining = Vec::new();
        for (owner, repo) in repos {
            let runs = ctx.host.branch_runs(&owner, &repo, &ctx.default_branch).await?;
            match latest_human_run(&runs, &ctx.config.bot_emails) {
                Some(run) if run.status == "completed" => {
                    spinner.println(format!(
                        "{} {repo}: {} ({})",
                        check(),
                        run.conclusion.as_deref().unwrap_or("done"),
                        run.url.muted()
                    ));
                }
                _ => remaining.push((owner, repo)),
            }
        }

        if remaining.is_empty() {
            spinner.finish_with_message("all publish runs finished");
            return Ok(());
        }
        spinner.set_message(format!("waiting on {} repo(s)...", remaining.len()));
        repos = remaining;
        tokio::time::sleep(std::time::Duration::from_secs(PUBLISH_POLL_SECS)).await;
    }

    spinner.finish_with_message("gave up waiting on the publish runs");
    Ok(())
}

/// Newest run not pushed by a bot
fn latest_human_run<'a>(runs: &'a [WorkflowRun], bot_emails: &[String]) -> Option<&'a WorkflowRun> {
    runs.iter().find(|run| {
        run.committer_email.as_deref().is_none_or(|email| {
            !bot_emails.iter().any(|prefix| email.starts_with(prefix.as_str()))
        })
    })
}

/// Push one row per merged PR to the configured spreadsheet
async fn append_to_sheet(ctx: &CommandContext, merged: &[PullRequest]) -> Result<()> {
    let sheets = &ctx.config.sheets;
    if sheets.spreadsheet_id.is_empty() || sheets.range.is_empty() {
        return Err(Error::Config(
            "set `sheets.spreadsheet_id` and `sheets.range` in config.toml".to_string(),
        ));
    }

    let client = SheetsClient::new(&sheets_token()?)?;
    let rows: Vec<Vec<String>> = merged
        .iter()
        .map(|pull| {
            vec![
                pull.merged_at
                    .map(|t| t.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
                pull.repo.clone(),
                clean_title(&pull.title),
                pull.author.clone().unwrap_or_default(),
                pull.url.clone(),
            ]
        })
        .collect();

    let appended = client
        .append_rows(&sheets.spreadsheet_id, &sheets.range, &rows)
        .await?;
    println!("{} appended {appended} row(s) to the spreadsheet", check());
    Ok(())
}
