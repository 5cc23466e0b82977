//! PR aggregation and rendering
//!
//! Pure helpers shared by the `opened`, `merged` and `merge` commands:
//! flag annotation, readiness ranking, reviewer gaps, age math, title
//! cleanup and plain-text table layout.

use crate::types::{CheckRun, PrFlags, PullRequest};
use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;

/// A PR paired with its derived readiness flags
#[derive(Debug, Clone)]
pub struct AnnotatedPr {
    /// The PR itself
    pub pull: PullRequest,
    /// Flags derived against the quality-team roster
    pub flags: PrFlags,
}

/// Derive flags for every PR
pub fn annotate(pulls: Vec<PullRequest>, quality_team: &[String]) -> Vec<AnnotatedPr> {
    pulls
        .into_iter()
        .map(|pull| {
            let flags = PrFlags::derive(&pull, quality_team);
            AnnotatedPr { pull, flags }
        })
        .collect()
}

/// Sort by readiness score, highest first; ties keep input order
pub fn rank(annotated: &mut [AnnotatedPr]) {
    annotated.sort_by_key(|a| std::cmp::Reverse(a.flags.score()));
}

/// Team members whose review is still missing on a PR
///
/// The author never reviews their own PR, so they are excluded.
pub fn missing_reviewers(pull: &PullRequest, team: &[String]) -> Vec<String> {
    team.iter()
        .filter(|login| Some(login.as_str()) != pull.author.as_deref())
        .filter(|login| !pull.approvers.contains(login))
        .cloned()
        .collect()
}

/// PRs waiting on `member`'s review
///
/// Only PRs that are otherwise ready count: not yet approved, not
/// rejected, mergeable, checks green and out of draft. Everything else
/// has work left for its author, not for the reviewer.
pub fn awaiting_review_by<'a>(
    annotated: &'a [AnnotatedPr],
    member: &str,
    roster: &[String],
) -> Vec<&'a AnnotatedPr> {
    annotated
        .iter()
        .filter(|a| {
            let f = &a.flags;
            !f.approved && f.not_rejected && f.mergeable && f.checks_passed && f.ready
        })
        .filter(|a| {
            missing_reviewers(&a.pull, roster)
                .iter()
                .any(|login| login == member)
        })
        .collect()
}

/// Whole days the PR has been open (or took to merge)
pub fn age_days(pull: &PullRequest, now: DateTime<Utc>) -> i64 {
    let end = pull.merged_at.unwrap_or(now);
    (end - pull.created_at).num_days()
}

/// Mean age in days across PRs, zero when empty
pub fn mean_age(pulls: &[PullRequest], now: DateTime<Utc>) -> f64 {
    if pulls.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let total: f64 = pulls.iter().map(|p| age_days(p, now) as f64).sum();
    #[allow(clippy::cast_precision_loss)]
    let count = pulls.len() as f64;
    total / count
}

/// PRs merged inside `[start, end]`
pub fn merged_within(
    pulls: Vec<PullRequest>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<PullRequest> {
    pulls
        .into_iter()
        .filter(|pull| {
            pull.merged_at
                .is_some_and(|merged| merged >= start && merged <= end)
        })
        .collect()
}

/// Strip the tracker prefix off a PR or card title
///
/// Titles come in as "PREFIX <> actual title" or "PREFIX - actual title";
/// everything before the first separator is dropped.
pub fn clean_title(title: &str) -> String {
    let rest = title
        .split_once("<>")
        .or_else(|| title.split_once(" - "))
        .map_or(title, |(_, rest)| rest);
    rest.trim().to_string()
}

/// One line of check-run status, e.g. "  ✓ build" or "  … lint (in_progress)"
pub fn format_check_line(check: &CheckRun) -> String {
    match (check.status.as_str(), check.conclusion.as_deref()) {
        ("completed", Some("success" | "skipped")) => {
            format!("  {} {}", "✓".green(), check.name)
        }
        ("completed", conclusion) => format!(
            "  {} {} ({})",
            "✗".red(),
            check.name,
            conclusion.unwrap_or("no conclusion")
        ),
        (status, _) => format!("  {} {} ({status})", "…".yellow(), check.name.dimmed()),
    }
}

/// Visual tone of a table cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// No styling
    Plain,
    /// Dimmed
    Muted,
    /// Green
    Success,
    /// Yellow
    Warn,
    /// Red
    Error,
}

/// A table cell: plain text plus a tone applied at render time
#[derive(Debug, Clone)]
pub struct Cell {
    /// Unstyled text, used for width computation
    pub text: String,
    /// Tone applied after padding
    pub tone: Tone,
}

impl Cell {
    /// Plain cell
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: Tone::Plain,
        }
    }

    /// Toned cell
    pub fn toned(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }

    /// Yes/no boolean cell, green check or red cross
    pub fn flag(value: bool) -> Self {
        if value {
            Self::toned("✓", Tone::Success)
        } else {
            Self::toned("✗", Tone::Error)
        }
    }

    fn render(&self, width: usize) -> String {
        // Pad first so ANSI escapes never count toward the width
        let padded = format!("{:<width$}", self.text);
        match self.tone {
            Tone::Plain => padded,
            Tone::Muted => padded.dimmed().to_string(),
            Tone::Success => padded.green().to_string(),
            Tone::Warn => padded.yellow().to_string(),
            Tone::Error => padded.red().to_string(),
        }
    }
}

/// Render a table with a header row, columns sized to content
pub fn render_table(headers: &[&str], rows: &[Vec<Cell>]) -> String {
    let columns = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(columns) {
            widths[i] = widths[i].max(cell.text.chars().count());
        }
    }

    let mut out = String::new();
    for (i, header) in headers.iter().enumerate() {
        let padded = format!("{header:<width$}", width = widths[i]);
        out.push_str(&padded.bold().to_string());
        if i + 1 < columns {
            out.push_str("  ");
        }
    }
    out.push('\n');

    for row in rows {
        for (i, cell) in row.iter().enumerate().take(columns) {
            out.push_str(&cell.render(widths[i]));
            if i + 1 < columns {
                out.push_str("  ");
            }
        }
        out.push('\n');
    }
    out
}
