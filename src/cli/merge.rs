//! Merge command - merge publishable PRs, one branch or a whole board stage

use crate::cli::context::CommandContext;
use crate::cli::style::{check, Stylize};
use crate::cli::CliProgress;
use anstream::println;
use dialoguer::Confirm;
use pr_pilot::auth::flux_token;
use pr_pilot::error::{Error, Result};
use pr_pilot::flux::{extract_pr_refs, FluxClient};
use pr_pilot::merge::{
    create_merge_plan, execute_merge, refresh_plan_branches, ExecuteOptions, MergeExecutionResult,
    MergePlan, MergeStep,
};
use pr_pilot::types::{Card, PrFlags, PullRequest};

/// Options for the merge command
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// Merge every PR referenced by cards in the board's publish stage
    pub flux: bool,
    /// Skip the confirmation prompt
    pub confirm: bool,
    /// Keep merging remaining PRs after one fails
    pub continue_on_failure: bool,
    /// Wait for auto-merge PRs to land before returning
    pub wait: bool,
    /// Try the admin strategy first
    pub admin: bool,
}

impl MergeOptions {
    fn execute_options(&self) -> ExecuteOptions {
        ExecuteOptions {
            wait: self.wait,
            continue_on_failure: self.continue_on_failure,
            ..ExecuteOptions::default()
        }
    }
}

/// Run the merge command
pub async fn run_merge(options: MergeOptions) -> Result<()> {
    let ctx = CommandContext::new().await?;

    if options.flux {
        merge_board_stage(&ctx, &options).await
    } else {
        merge_current_branch(&ctx, &options).await
    }
}

/// Merge the PR belonging to the current branch
async fn merge_current_branch(ctx: &CommandContext, options: &MergeOptions) -> Result<()> {
    let branch = ctx.git.current_branch().await?;
    let mut pull = ctx
        .host
        .pr_for_branch(&ctx.owner, &ctx.repo, &branch)
        .await?
        .ok_or_else(|| Error::NotFound(format!("no open PR for branch {branch}")))?;

    // Best-effort approval; GitHub rejects it on your own PRs
    if !matches!(pull.review_decision, Some(pr_pilot::types::ReviewDecision::Approved)) {
        match ctx.host.approve_pr(&ctx.owner, &ctx.repo, pull.number).await {
            Ok(()) => {
                println!("{} approved {}#{}", check(), ctx.repo, pull.number.accent());
                pull = ctx.host.pr_view(&ctx.owner, &ctx.repo, pull.number).await?;
            }
            Err(e) => println!("{}", format!("could not approve: {e}").warn()),
        }
    }

    let plan = plan_for(vec![pull], ctx, options);
    preview_plan(&plan);

    if plan.merge_count() == 0 {
        return Ok(());
    }
    if !options.confirm && !confirmed()? {
        println!("{}", "aborted".muted());
        return Ok(());
    }

    let result = execute_merge(
        plan,
        ctx.host.as_ref(),
        &options.execute_options(),
        &CliProgress,
    )
    .await?;
    print_summary(&result);
    if result.failed_outright() {
        return Err(Error::GitHubApi(format!(
            "{} PR(s) failed to merge, nothing landed",
            result.failed.len()
        )));
    }

    // Local cleanup once the branch landed
    if result.merged.iter().any(|p| p.head_ref == branch) {
        ctx.git.checkout(&ctx.default_branch).await?;
        ctx.git.pull(&ctx.default_branch).await?;
        ctx.git.delete_branch(&branch).await?;
        ctx.git.remote_prune().await?;
        println!("{} deleted {} and pruned origin", check(), branch.accent());
    }
    Ok(())
}

/// Merge every PR linked from cards sitting in the publish stage, moving
/// each fully merged card along the board
async fn merge_board_stage(ctx: &CommandContext, options: &MergeOptions) -> Result<()> {
    let flux_config = &ctx.config.flux;
    if flux_config.publish_stage.is_empty() || flux_config.merged_stage.is_empty() {
        return Err(Error::Config(
            "set `flux.publish_stage` and `flux.merged_stage` in config.toml".to_string(),
        ));
    }

    let flux = FluxClient::new(&flux_config.api_url, &flux_token()?)?;
    let mut cards = flux.cards_in_stage(&flux_config.publish_stage).await?;
    if cards.is_empty() {
        println!("{}", "no cards in the publish stage".muted());
        return Ok(());
    }

    for card in &mut cards {
        card.fields = flux.card_fields(&card.id).await?;
    }

    // Plan all cards before executing any, so the confirmation shows
    // the whole batch
    let mut planned: Vec<(Card, MergePlan)> = Vec::new();
    for card in cards {
        let refs = extract_pr_refs(&card.search_text());
        if refs.is_empty() {
            println!(
                "{} {}: {}",
                "skip".warn(),
                card.name,
                "no PR links on the card".muted()
            );
            continue;
        }

        let mut pulls = Vec::new();
        for pr_ref in &refs {
            pulls.push(ctx.host.pr_view(&pr_ref.owner, &pr_ref.repo, pr_ref.number).await?);
        }

        let plan = plan_for(pulls, ctx, options);
        println!("{}", card.name.emphasis());
        preview_plan(&plan);
        planned.push((card, plan));
    }

    if planned
        .iter()
        .all(|(_, plan)| plan.merge_count() == 0 && !plan.all_finished())
    {
        println!("{}", "nothing to merge".muted());
        return Ok(());
    }
    if !options.confirm && !confirmed()? {
        println!("{}", "aborted".muted());
        return Ok(());
    }

    let mut merged_total = 0usize;
    let mut failed_total = 0usize;
    for (card, plan) in planned {
        if plan.merge_count() == 0 {
            // Every PR on the card landed out-of-band; the card still
            // needs to advance
            if plan.all_finished() {
                flux.move_card(&card.id, &flux_config.merged_stage).await?;
                println!(
                    "{} moved {} to the merged stage, every PR already landed",
                    check(),
                    card.name.accent()
                );
            }
            continue;
        }

        println!("{} {}", "merging".emphasis(), card.name.accent());
        let urls: Vec<String> = plan
            .steps
            .iter()
            .filter(|step| matches!(step, MergeStep::Merge { .. }))
            .map(|step| step.pull().url.clone())
            .collect();

        println!("{}", "updating PR branches...".muted());
        refresh_plan_branches(&plan, ctx.host.as_ref()).await;

        let result = execute_merge(
            plan,
            ctx.host.as_ref(),
            &options.execute_options(),
            &CliProgress,
        )
        .await?;
        print_summary(&result);
        merged_total += result.merged.len();
        failed_total += result.failed.len();

        // Leave a card link on each merged PR so the trail works both ways
        if !flux_config.board_url.is_empty() {
            let link = format!("{}/{}", flux_config.board_url.trim_end_matches('/'), card.id);
            for pull in &result.merged {
                ensure_card_link(ctx, pull, &link).await?;
            }
        }

        // Only advance the card once every PR on it actually landed
        if result.all_merged() && !result.merged.is_empty() {
            let comment = format!("All PRs merged:\n{}", urls.join("\n"));
            flux.comment_card(&card.id, &comment).await?;
            flux.move_card(&card.id, &flux_config.merged_stage).await?;
            println!("{} moved {} to the merged stage", check(), card.name.accent());
        } else {
            println!(
                "{}",
                format!("{} stays in place, not every PR landed", card.name).warn()
            );
        }
    }

    if merged_total == 0 && failed_total > 0 {
        return Err(Error::GitHubApi(format!(
            "{failed_total} PR(s) failed to merge, nothing landed"
        )));
    }
    Ok(())
}

/// Comment the card link on a PR unless an earlier run already did
async fn ensure_card_link(ctx: &CommandContext, pull: &PullRequest, link: &str) -> Result<()> {
    let comments = ctx
        .host
        .pr_comments(&pull.owner, &pull.repo, pull.number)
        .await?;
    if comments.iter().any(|c| c.body.contains(link)) {
        return Ok(());
    }
    ctx.host
        .comment_pr(&pull.owner, &pull.repo, pull.number, &format!("Flux card: {link}"))
        .await?;
    Ok(())
}

fn plan_for(pulls: Vec<PullRequest>, ctx: &CommandContext, options: &MergeOptions) -> MergePlan {
    let targets = pulls
        .into_iter()
        .map(|pull| {
            let flags = PrFlags::derive(&pull, &ctx.config.quality_team);
            (pull, flags)
        })
        .collect();
    create_merge_plan(targets, options.admin)
}

fn preview_plan(plan: &MergePlan) {
    for step in &plan.steps {
        match step {
            MergeStep::Merge { pull, strategies } => {
                let order: Vec<String> = strategies.iter().map(ToString::to_string).collect();
                println!(
                    "  {} {}#{} {} ({})",
                    check(),
                    pull.repo,
                    pull.number.accent(),
                    "will merge".success(),
                    order.join(" → ").muted()
                );
            }
            MergeStep::Skip { pull, reasons } => {
                println!(
                    "  {} {}#{}: {}",
                    "skip".warn(),
                    pull.repo,
                    pull.number,
                    reasons.join(", ").muted()
                );
            }
        }
    }
}

fn confirmed() -> Result<bool> {
    Confirm::new()
        .with_prompt("Proceed with merge?")
        .default(false)
        .interact()
        .map_err(|e| Error::Internal(format!("failed to read confirmation: {e}")))
}

fn print_summary(result: &MergeExecutionResult) {
    if !result.merged.is_empty() {
        println!("{} {} PR(s) merged", check(), result.merged.len());
    }
    for pull in &result.pending {
        println!(
            "{}",
            format!("{}#{} still pending auto-merge", pull.repo, pull.number).warn()
        );
    }
    for (pull, message) in &result.failed {
        println!(
            "{}",
            format!("{}#{} failed: {message}", pull.repo, pull.number).error()
        );
    }
}
