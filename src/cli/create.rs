//! Create command - push the branch and open a PR with reviewers assigned

use crate::cli::context::CommandContext;
use crate::cli::style::{check, Stylize};
use anstream::println;
use dialoguer::Select;
use pr_pilot::auth::openai_token;
use pr_pilot::error::{Error, Result};
use pr_pilot::openai::OpenAiClient;
use pr_pilot::types::ReviewTeam;
use serde_yaml::Value;
use std::path::Path;

/// Teams larger than this are treated as org-wide umbrellas and never
/// asked for review
const UMBRELLA_TEAM_SIZE: usize = 15;

/// Options for the create command
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// Base branch; origin's default branch when unset
    pub base: Option<String>,
    /// Explicit title; derived from the last commit when unset
    pub title: Option<String>,
    /// Draft the description with the completion API
    pub generate: bool,
}

/// Run the create command
pub async fn run_create(options: CreateOptions) -> Result<()> {
    let ctx = CommandContext::new().await?;
    let branch = ctx.git.current_branch().await?;
    let base = options.base.unwrap_or_else(|| ctx.default_branch.clone());
    if branch == base {
        return Err(Error::Git(format!(
            "refusing to open a PR from {base} onto itself"
        )));
    }

    let toplevel = ctx.git.toplevel().await?;
    let title = match options.title {
        Some(title) => title,
        None => {
            let message = ctx.git.last_commit_message().await?;
            let subject = normalize_subject(subject_of(&message));
            apply_prefix(subject, &discover_prefixes(&toplevel)?)?
        }
    };

    let body = if options.generate {
        let client = OpenAiClient::new(&openai_token()?)?;
        let description = ctx.host.repo_description(&ctx.owner, &ctx.repo).await?;
        client
            .draft_description(&title, &ctx.repo, description.as_deref())
            .await?
    } else {
        default_body(&toplevel, &branch)?
    };

    ctx.git.push_force_upstream(&branch).await?;
    println!("{} pushed {}", check(), branch.accent());

    let pull = ctx
        .host
        .create_pr(&ctx.owner, &ctx.repo, &branch, &base, &title, &body)
        .await?;
    println!("{} created {}", check(), pull.url.accent());

    request_reviews(&ctx, pull.number).await?;
    Ok(())
}

/// Ask the author's review teams (and their members) for review
async fn request_reviews(ctx: &CommandContext, number: u64) -> Result<()> {
    let user = ctx.host.current_user().await?;
    let teams = ctx.host.review_teams(&ctx.owner, &ctx.repo).await?;

    let relevant: Vec<&ReviewTeam> = teams
        .iter()
        .filter(|team| team.has_repo && team.members.len() <= UMBRELLA_TEAM_SIZE)
        .collect();
    if relevant.is_empty() {
        println!("{}", "no review teams found for this repository".muted());
        return Ok(());
    }

    let team_slugs: Vec<String> = relevant.iter().map(|t| t.slug.clone()).collect();
    let mut reviewers: Vec<String> = relevant
        .iter()
        .flat_map(|t| t.members.iter())
        .filter(|login| **login != user)
        .cloned()
        .collect();
    reviewers.sort();
    reviewers.dedup();

    ctx.host
        .request_reviewers(&ctx.owner, &ctx.repo, number, &reviewers, &team_slugs)
        .await?;
    println!(
        "{} requested review from {}",
        check(),
        team_slugs.join(", ").accent()
    );
    Ok(())
}

/// First line of a commit message
fn subject_of(message: &str) -> &str {
    message.lines().next().unwrap_or("").trim()
}

/// Turn a conventional-commit subject into a title:
/// drop the `type:` prefix and capitalize the first letter
fn normalize_subject(subject: &str) -> String {
    let rest = match subject.split_once(':') {
        Some((kind, rest)) if !kind.contains(' ') => rest.trim(),
        _ => subject,
    };
    let mut chars = rest.chars();
    chars.next().map_or_else(String::new, |first| {
        format!("{}{}", first.to_uppercase(), chars.as_str())
    })
}

/// Prepend a tracker prefix, prompting when the repo accepts several
fn apply_prefix(title: String, prefixes: &[String]) -> Result<String> {
    if prefixes.is_empty() || prefixes.iter().any(|p| title.starts_with(p.as_str())) {
        return Ok(title);
    }
    let prefix = if prefixes.len() == 1 {
        prefixes[0].clone()
    } else {
        let picked = Select::new()
            .with_prompt("Title prefix?")
            .items(prefixes)
            .default(0)
            .interact()
            .map_err(|e| Error::Internal(format!("failed to read selection: {e}")))?;
        prefixes[picked].clone()
    };
    Ok(format!("{prefix} <> {title}"))
}

/// Prefixes accepted by the repo's title-validation workflow, if any
///
/// Looks for an `allowed_prefixes` key anywhere in the workflow files,
/// the same place the "PR Pattern" check reads them from.
fn discover_prefixes(toplevel: &str) -> Result<Vec<String>> {
    let dir = Path::new(toplevel).join(".github").join("workflows");
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    for entry in std::fs::read_dir(&dir)? {
        let path = entry?.path();
        let is_yaml = path
            .extension()
            .is_some_and(|ext| ext == "yml" || ext == "yaml");
        if !is_yaml {
            continue;
        }
        let content = std::fs::read_to_string(&path)?;
        let Ok(doc) = serde_yaml::from_str::<Value>(&content) else {
            continue;
        };
        if let Some(raw) = find_allowed_prefixes(&doc) {
            return Ok(raw
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(ToString::to_string)
                .collect());
        }
    }
    Ok(Vec::new())
}

fn find_allowed_prefixes(value: &Value) -> Option<String> {
    match value {
        Value::Mapping(map) => {
            for (key, entry) in map {
                if key.as_str() == Some("allowed_prefixes") {
                    return entry.as_str().map(ToString::to_string);
                }
                if let Some(found) = find_allowed_prefixes(entry) {
                    return Some(found);
                }
            }
            None
        }
        Value::Sequence(seq) => seq.iter().find_map(find_allowed_prefixes),
        _ => None,
    }
}

/// PR template plus an issue link when the branch names one
fn default_body(toplevel: &str, branch: &str) -> Result<String> {
    let mut body = String::new();

    let template = Path::new(toplevel)
        .join(".github")
        .join("pull_request_template.md");
    if template.exists() {
        body.push_str(std::fs::read_to_string(&template)?.trim_end());
    }

    let digits: String = branch.chars().take_while(char::is_ascii_digit).collect();
    if !digits.is_empty() {
        if !body.is_empty() {
            body.push_str("\n\n");
        }
        body.push_str(&format!("closes #{digits}"));
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_conventional_subjects() {
        assert_eq!(normalize_subject("feat: add widget"), "Add widget");
        assert_eq!(normalize_subject("fix(api): trim input"), "Trim input");
        assert_eq!(normalize_subject("plain subject"), "Plain subject");
    }

    #[test]
    fn keeps_titles_that_already_carry_a_prefix() {
        let prefixes = vec!["ACME".to_string()];
        let title = apply_prefix("ACME <> Add widget".to_string(), &prefixes).unwrap();
        assert_eq!(title, "ACME <> Add widget");
    }

    #[test]
    fn single_prefix_is_applied_without_prompting() {
        let prefixes = vec!["ACME".to_string()];
        let title = apply_prefix("Add widget".to_string(), &prefixes).unwrap();
        assert_eq!(title, "ACME <> Add widget");
    }

    #[test]
    fn discovers_prefixes_from_workflow_yaml() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join(".github/workflows");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("pr-pattern.yml"),
            "jobs:\n  title:\n    steps:\n      - uses: acme/title-check@v1\n        with:\n          allowed_prefixes: \"ACME, OPS\"\n",
        )
        .unwrap();

        let prefixes = discover_prefixes(temp.path().to_str().unwrap()).unwrap();
        assert_eq!(prefixes, ["ACME", "OPS"]);
    }

    #[test]
    fn no_workflow_dir_means_no_prefixes() {
        let temp = tempfile::TempDir::new().unwrap();
        assert!(discover_prefixes(temp.path().to_str().unwrap())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn branch_issue_number_links_the_issue() {
        let temp = tempfile::TempDir::new().unwrap();
        let body = default_body(temp.path().to_str().unwrap(), "123-fix-widget").unwrap();
        assert_eq!(body, "closes #123");
    }

    #[test]
    fn template_is_used_when_present() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".github")).unwrap();
        std::fs::write(
            temp.path().join(".github/pull_request_template.md"),
            "## What\n\n## Why\n",
        )
        .unwrap();

        let body = default_body(temp.path().to_str().unwrap(), "feat-widget").unwrap();
        assert!(body.starts_with("## What"));
        assert!(!body.contains("closes"));
    }
}
