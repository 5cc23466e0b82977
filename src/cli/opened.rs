//! Opened command - readiness board for the team's open PRs

use crate::cli::context::CommandContext;
use crate::cli::pick_roster;
use crate::cli::style::Stylize;
use anstream::println;
use chrono::Utc;
use pr_pilot::error::Result;
use pr_pilot::report::{
    age_days, annotate, awaiting_review_by, clean_title, mean_age, missing_reviewers, rank,
    render_table, AnnotatedPr, Cell, Tone,
};

/// List open PRs authored by the team, ranked by readiness
pub async fn run_opened(team: Option<&str>) -> Result<()> {
    let ctx = CommandContext::new().await?;
    let org = ctx.config.require_organization()?;

    let roster = pick_roster(&ctx.config, team)?;
    println!(
        "{}",
        format!("fetching open PRs for {} author(s) in {org}...", roster.len()).muted()
    );

    let pulls = ctx.host.list_open_prs(org, &roster).await?;
    if pulls.is_empty() {
        println!("{}", "no open PRs".muted());
        return Ok(());
    }

    let mut annotated = annotate(pulls, &ctx.config.quality_team);
    rank(&mut annotated);

    println!("{}", "open PRs".emphasis());
    print_board(&annotated);
    print_own_prs(&ctx, &annotated).await?;
    print_member_queues(&annotated, &roster);
    print_summary(&annotated);
    print_guidance();
    Ok(())
}

/// The caller's slice of the board
async fn print_own_prs(ctx: &CommandContext, annotated: &[AnnotatedPr]) -> Result<()> {
    let me = ctx.host.current_user().await?;
    let mine: Vec<AnnotatedPr> = annotated
        .iter()
        .filter(|a| a.pull.author.as_deref() == Some(me.as_str()))
        .cloned()
        .collect();

    println!("{}", format!("my PRs ({me})").emphasis());
    if mine.is_empty() {
        println!("{}", "none open".muted());
        return Ok(());
    }
    print_board(&mine);
    Ok(())
}

fn print_board(annotated: &[AnnotatedPr]) {
    let now = Utc::now();
    let headers = [
        "repo", "pr", "title", "author", "age", "ready", "appr", "qual", "checks", "mrgbl",
        "score",
    ];
    let rows: Vec<Vec<Cell>> = annotated
        .iter()
        .map(|a| {
            let flags = &a.flags;
            vec![
                Cell::plain(&a.pull.repo),
                Cell::plain(format!("#{}", a.pull.number)),
                Cell::plain(truncate(&clean_title(&a.pull.title), 48)),
                Cell::plain(a.pull.author.as_deref().unwrap_or("-")),
                Cell::plain(format!("{}d", age_days(&a.pull, now))),
                Cell::flag(flags.ready),
                Cell::flag(flags.approved),
                Cell::flag(flags.quality_ok),
                Cell::flag(flags.checks_passed),
                Cell::flag(flags.mergeable),
                score_cell(flags.score()),
            ]
        })
        .collect();

    println!("{}", render_table(&headers, &rows));
}

/// The review queue each roster member is holding up
fn print_member_queues(annotated: &[AnnotatedPr], roster: &[String]) {
    for member in roster {
        let waiting = awaiting_review_by(annotated, member, roster);
        let reviewed = annotated
            .iter()
            .filter(|a| {
                !missing_reviewers(&a.pull, roster)
                    .iter()
                    .any(|login| login == member)
            })
            .count();

        println!(
            "{}",
            format!("{member}: {reviewed} reviewed, {} waiting", waiting.len()).emphasis()
        );
        if waiting.is_empty() {
            println!("{}", "nothing waiting on them".muted());
            continue;
        }

        let rows: Vec<Vec<Cell>> = waiting
            .iter()
            .map(|a| {
                vec![
                    Cell::plain(&a.pull.repo),
                    Cell::plain(format!("#{}", a.pull.number)),
                    Cell::plain(truncate(&clean_title(&a.pull.title), 48)),
                    Cell::plain(a.pull.author.as_deref().unwrap_or("-")),
                ]
            })
            .collect();
        println!("{}", render_table(&["repo", "pr", "title", "author"], &rows));
    }
}

fn print_guidance() {
    for line in [
        "each author owns their PR until it ships",
        "not approved: address the review comments, then re-request review",
        "not mergeable: resolve the conflicts and rebase",
        "checks failing: read the CI logs and fix what broke",
        "not ready: the PR may still be marked as a draft",
        "quality review missing: ask the quality team what needs adjusting",
        "and remember to review your colleagues' PRs too",
    ] {
        println!("{}", line.muted());
    }
}

fn print_summary(annotated: &[AnnotatedPr]) {
    let now = Utc::now();
    let pulls: Vec<_> = annotated.iter().map(|a| a.pull.clone()).collect();
    let publishable = annotated.iter().filter(|a| a.flags.publishable()).count();
    println!(
        "{}",
        format!(
            "{} open PR(s), {publishable} publishable, mean age {:.1} day(s)",
            pulls.len(),
            mean_age(&pulls, now)
        )
        .emphasis()
    );
}

fn score_cell(score: u8) -> Cell {
    let tone = match score {
        5 => Tone::Success,
        3 | 4 => Tone::Warn,
        _ => Tone::Error,
    };
    Cell::toned(format!("{score}/5"), tone)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}…")
}
