//! pilot - team development workflow CLI

mod cli;

use clap::{Parser, Subcommand};
use cli::style::Stylize;
use pr_pilot::error::Result;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pilot", version, about = "Team development workflow CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fold working tree changes into the last commit and force-push
    Amend,
    /// Resume an interrupted rebase and force-push the result
    Continue,
    /// Rebase the current branch onto an up-to-date base
    Rebase {
        /// Base branch (defaults to origin's default branch)
        #[arg(short, long)]
        base: Option<String>,
        /// Force-push once the rebase finishes cleanly
        #[arg(short, long)]
        push: bool,
        /// Skip the dirty work tree check
        #[arg(short, long)]
        force: bool,
        /// Ask GitHub to update the PR branch instead of rebasing locally
        #[arg(long)]
        pr: bool,
    },
    /// Force-push the current branch with upstream tracking
    Push,
    /// Delete a branch and its tag, locally and optionally on origin
    Delete {
        /// Branch/tag name
        name: String,
        /// Also delete on origin
        #[arg(short, long)]
        remote: bool,
    },
    /// Merge publishable PRs - the current branch, or a whole board stage
    Merge {
        /// Merge every PR referenced by cards in the board's publish stage
        #[arg(long)]
        flux: bool,
        /// Skip the confirmation prompt
        #[arg(long)]
        confirm: bool,
        /// Keep merging remaining PRs after one fails
        #[arg(long = "continue")]
        continue_on_failure: bool,
        /// Wait for auto-merge PRs to land before returning
        #[arg(long)]
        wait: bool,
        /// Try the admin strategy first
        #[arg(long)]
        admin: bool,
    },
    /// List the team's open PRs ranked by readiness
    Opened {
        /// Restrict authors to a configured team
        #[arg(short, long)]
        team: Option<String>,
    },
    /// Report PRs merged in the recent window
    Merged {
        /// Restrict authors to a configured team
        #[arg(short, long)]
        team: Option<String>,
        /// Window size in days
        #[arg(short, long, default_value_t = 7)]
        days: i64,
        /// Window start, YYYY-MM-DD (overrides --days)
        #[arg(long)]
        from: Option<String>,
        /// Window end, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        to: Option<String>,
        /// Also append the rows to the tracking spreadsheet
        #[arg(long)]
        sheet: bool,
        /// Watch the publish pipelines of the affected repos until they finish
        #[arg(short, long)]
        watch: bool,
    },
    /// Push the branch and open a PR with reviewers assigned
    Create {
        /// Base branch (defaults to origin's default branch)
        #[arg(short, long)]
        base: Option<String>,
        /// Explicit title (defaults to the last commit subject)
        #[arg(short, long)]
        title: Option<String>,
        /// Draft the description with the completion API
        #[arg(short, long)]
        generate: bool,
    },
    /// Prune branches that already landed
    Clean {
        /// Also delete merged branches on origin
        #[arg(short, long)]
        remote: bool,
    },
    /// Cancel CI runs for the current branch
    Cancel,
    /// Open the branch's latest CI run in the browser
    Watch,
    /// Check the environment this tool depends on
    Doctor,
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Amend => cli::amend::run_amend().await,
        Command::Continue => cli::continue_rebase::run_continue().await,
        Command::Rebase {
            base,
            push,
            force,
            pr,
        } => {
            cli::rebase::run_rebase(cli::rebase::RebaseOptions {
                base,
                push,
                force,
                pr,
            })
            .await
        }
        Command::Push => cli::push::run_push().await,
        Command::Delete { name, remote } => cli::delete::run_delete(&name, remote).await,
        Command::Merge {
            flux,
            confirm,
            continue_on_failure,
            wait,
            admin,
        } => {
            cli::merge::run_merge(cli::merge::MergeOptions {
                flux,
                confirm,
                continue_on_failure,
                wait,
                admin,
            })
            .await
        }
        Command::Opened { team } => cli::opened::run_opened(team.as_deref()).await,
        Command::Merged {
            team,
            days,
            from,
            to,
            sheet,
            watch,
        } => {
            cli::merged::run_merged(cli::merged::MergedOptions {
                team,
                days,
                from,
                to,
                sheet,
                watch,
            })
            .await
        }
        Command::Create {
            base,
            title,
            generate,
        } => {
            cli::create::run_create(cli::create::CreateOptions {
                base,
                title,
                generate,
            })
            .await
        }
        Command::Clean { remote } => cli::clean::run_clean(remote).await,
        Command::Cancel => cli::cancel::run_cancel().await,
        Command::Watch => cli::watch::run_watch().await,
        Command::Doctor => cli::doctor::run_doctor().await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    if let Err(e) = run(args.command).await {
        anstream::eprintln!("{}", format!("error: {e}").error());
        std::process::exit(1);
    }
}
