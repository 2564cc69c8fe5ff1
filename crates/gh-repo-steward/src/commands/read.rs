//! Read-only commands

use super::{print_json, truncate};
use crate::context::AppContext;
use anyhow::Result;
use clap::{Subcommand, ValueEnum};
use gh_client::{RepoContent, StateFilter};
use gh_pr_triage::EnrichedPullRequest;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StateArg {
    Open,
    Closed,
    All,
}

impl From<StateArg> for StateFilter {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::Open => StateFilter::Open,
            StateArg::Closed => StateFilter::Closed,
            StateArg::All => StateFilter::All,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ReadCommand {
    /// Show repository statistics
    Stats,

    /// List issues (pull requests excluded)
    Issues {
        #[arg(short, long, value_enum, default_value = "open")]
        state: StateArg,
    },

    /// List open pull requests with test status and merge readiness
    Prs,

    /// Show one pull request with reviews, checks and comments
    Pr {
        number: u64,
    },

    /// List branches
    Branches,

    /// Print the unified diff of a pull request
    Diff {
        number: u64,
    },

    /// List recent workflow runs, or the jobs of one run
    Runs {
        run_id: Option<u64>,
    },

    /// Count issues and pull requests opened and closed recently
    Velocity {
        #[arg(short, long, default_value_t = 7)]
        days: u32,
    },

    /// Print a file of the repository, or list a directory
    Content {
        #[arg(default_value = "")]
        path: String,
    },
}

impl ReadCommand {
    pub async fn execute(&self, ctx: &AppContext, json: bool) -> Result<()> {
        let repo = ctx.repo()?;
        let client = ctx.github().await?;

        match self {
            ReadCommand::Stats => {
                let stats = client.fetch_repo_stats(&repo).await?;
                if json {
                    return print_json(&stats);
                }
                println!("{}", repo);
                println!("  open issues:        {}", stats.open_issues);
                println!("  open pull requests: {}", stats.open_pull_requests);
                println!("  stars:              {}", stats.stars);
                println!("  forks:              {}", stats.forks);
                if let Some(updated) = stats.last_updated {
                    println!("  last updated:       {}", updated.format("%Y-%m-%d %H:%M"));
                }
            }
            ReadCommand::Issues { state } => {
                let issues = client.fetch_issues(&repo, (*state).into()).await?;
                if json {
                    return print_json(&issues);
                }
                for issue in &issues {
                    let labels: Vec<&str> = issue.labels.iter().map(|l| l.name.as_str()).collect();
                    println!(
                        "#{:<6} {:<60} {:>3} comments  {}",
                        issue.number,
                        truncate(&issue.title, 60),
                        issue.comments,
                        labels.join(", ")
                    );
                }
                println!("{} issues", issues.len());
            }
            ReadCommand::Prs => {
                let enriched = ctx
                    .enricher(client)
                    .fetch_enriched_pull_requests(&repo)
                    .await?;
                if json {
                    return print_json(&enriched);
                }
                for pr in &enriched {
                    println!("{}", pull_request_line(pr));
                }
                let ready = enriched.iter().filter(|p| p.is_ready_to_merge).count();
                println!("{} pull requests, {} ready to merge", enriched.len(), ready);
            }
            ReadCommand::Pr { number } => {
                let pr = client.fetch_pull_request(&repo, *number, false).await?;
                let reviews = client.fetch_pull_request_reviews(&repo, *number).await?;
                let checks = client.fetch_check_runs(&repo, &pr.head.sha).await?;
                let comments = client.fetch_issue_comments(&repo, *number).await?;
                let review_comments = client.fetch_review_comments(&repo, *number).await?;
                if json {
                    return print_json(&serde_json::json!({
                        "pull_request": pr,
                        "reviews": reviews,
                        "check_runs": checks,
                        "comments": comments,
                        "review_comments": review_comments,
                    }));
                }

                println!("#{} {} ({})", pr.number, pr.title, pr.author());
                println!("  {} -> {}", pr.head.ref_name, pr.base.ref_name);
                println!("  {}", pr.html_url);
                for review in &reviews {
                    let who = review.user.as_ref().map(|u| u.login.as_str()).unwrap_or("?");
                    println!("  review  {:<20} {}", who, review.state);
                }
                for check in &checks {
                    let outcome = check.conclusion.as_deref().unwrap_or(&check.status);
                    println!("  check   {:<40} {}", truncate(&check.name, 40), outcome);
                }
                println!(
                    "  {} comments, {} review comments",
                    comments.len(),
                    review_comments.len()
                );
            }
            ReadCommand::Branches => {
                let branches = client.fetch_branches(&repo).await?;
                if json {
                    return print_json(&branches);
                }
                for branch in &branches {
                    let marker = if branch.protected { " (protected)" } else { "" };
                    println!("{}{}", branch.name, marker);
                }
                println!("{} branches", branches.len());
            }
            ReadCommand::Diff { number } => {
                print!("{}", client.fetch_pull_request_diff(&repo, *number).await?);
            }
            ReadCommand::Runs { run_id: Some(run_id) } => {
                let jobs = client.fetch_workflow_run_jobs(&repo, *run_id).await?;
                if json {
                    return print_json(&jobs);
                }
                for job in &jobs {
                    let outcome = job.conclusion.as_deref().unwrap_or(&job.status);
                    println!("{:<12} {:<50} {}", job.id, truncate(&job.name, 50), outcome);
                }
            }
            ReadCommand::Runs { run_id: None } => {
                let runs = client.fetch_workflow_runs(&repo).await?;
                if json {
                    return print_json(&runs);
                }
                for run in &runs {
                    let outcome = run
                        .conclusion
                        .as_deref()
                        .or(run.status.as_deref())
                        .unwrap_or("-");
                    println!(
                        "{:<12} {:<30} {:<25} {}",
                        run.id,
                        truncate(run.name.as_deref().unwrap_or(""), 30),
                        truncate(run.head_branch.as_deref().unwrap_or(""), 25),
                        outcome
                    );
                }
            }
            ReadCommand::Velocity { days } => {
                let velocity = client.fetch_recent_velocity(&repo, *days).await?;
                if json {
                    return print_json(&velocity);
                }
                println!("{} since {}", repo, velocity.since);
                println!("  opened: {}", velocity.opened);
                println!("  closed: {}", velocity.closed);
            }
            ReadCommand::Content { path } => {
                let Some(content) = client.fetch_repo_content(&repo, path).await? else {
                    anyhow::bail!("{} not found in {}", path, repo);
                };
                if json {
                    return print_json(&content);
                }
                match content {
                    RepoContent::File { text, .. } => print!("{}", text),
                    RepoContent::Directory { entries } => {
                        for entry in &entries {
                            println!("{:<10} {}", entry.kind, entry.path);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn pull_request_line(pr: &EnrichedPullRequest) -> String {
    let mut flags = Vec::new();
    if pr.is_ready_to_merge {
        flags.push("ready");
    }
    if pr.is_big {
        flags.push("big");
    }
    if pr.is_approved {
        flags.push("approved");
    }
    if pr.is_leader_branch {
        flags.push("protected-base");
    }
    if pr.pull_request.draft == Some(true) {
        flags.push("draft");
    }
    if pr.enrichment_error.is_some() {
        flags.push("incomplete");
    }

    format!(
        "#{:<6} {:<50} {:<8} {}",
        pr.number(),
        truncate(&pr.pull_request.title, 50),
        pr.test_status.as_str(),
        flags.join(" ")
    )
}
