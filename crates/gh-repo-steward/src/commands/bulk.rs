//! Write commands, executed through the bulk action executor
//!
//! Every command first turns its arguments into a list of [`RepoAction`]s,
//! shows that plan and asks for approval (unless `--yes`), then runs it item
//! by item.

use super::{confirm, print_json, StatusStream};
use crate::context::AppContext;
use anyhow::{bail, Result};
use clap::Subcommand;
use gh_client::NewIssue;
use gh_pr_triage::{
    execute_bulk, pending_items, BulkActionItem, BulkSummary, ItemStatus, RepoAction,
    RepoActionRunner,
};

#[derive(Subcommand, Debug)]
pub enum BulkCommand {
    /// Close issues, optionally leaving a comment first
    CloseIssues {
        #[arg(required = true)]
        numbers: Vec<u64>,
        #[arg(short, long)]
        comment: Option<String>,
    },

    /// Add and/or remove labels on issues or pull requests
    Label {
        #[arg(required = true)]
        numbers: Vec<u64>,
        /// Label to add (repeatable)
        #[arg(long = "add")]
        add: Vec<String>,
        /// Label to remove (repeatable)
        #[arg(long = "remove")]
        remove: Vec<String>,
    },

    /// Comment on issues or pull requests
    Comment {
        #[arg(required = true)]
        numbers: Vec<u64>,
        #[arg(short, long)]
        body: String,
    },

    /// Close pull requests without merging
    ClosePrs {
        #[arg(required = true)]
        numbers: Vec<u64>,
    },

    /// Delete branches
    DeleteBranches {
        #[arg(required = true)]
        branches: Vec<String>,
    },

    /// Mark draft pull requests ready for review
    Publish {
        #[arg(required = true)]
        numbers: Vec<u64>,
    },

    /// Open a new issue
    NewIssue {
        title: String,
        #[arg(short, long)]
        body: Option<String>,
        /// Label to apply (repeatable)
        #[arg(short, long)]
        label: Vec<String>,
    },
}

impl BulkCommand {
    /// The actions this command stands for, in execution order
    pub fn plan(&self) -> Result<Vec<RepoAction>> {
        let actions = match self {
            BulkCommand::CloseIssues { numbers, comment } => numbers
                .iter()
                .map(|&number| RepoAction::CloseIssue {
                    number,
                    comment: comment.clone(),
                })
                .collect(),
            BulkCommand::Label {
                numbers,
                add,
                remove,
            } => {
                if add.is_empty() && remove.is_empty() {
                    bail!("Nothing to do: pass --add and/or --remove");
                }
                let mut actions = Vec::new();
                for &number in numbers {
                    if !add.is_empty() {
                        actions.push(RepoAction::AddLabels {
                            number,
                            labels: add.clone(),
                        });
                    }
                    actions.extend(remove.iter().map(|label| RepoAction::RemoveLabel {
                        number,
                        label: label.clone(),
                    }));
                }
                actions
            }
            BulkCommand::Comment { numbers, body } => {
                if body.trim().is_empty() {
                    bail!("Comment body must not be empty");
                }
                numbers
                    .iter()
                    .map(|&number| RepoAction::Comment {
                        number,
                        body: body.clone(),
                    })
                    .collect()
            }
            BulkCommand::ClosePrs { numbers } => numbers
                .iter()
                .map(|&number| RepoAction::ClosePullRequest { number })
                .collect(),
            BulkCommand::DeleteBranches { branches } => branches
                .iter()
                .map(|branch| RepoAction::DeleteBranch {
                    branch: branch.clone(),
                })
                .collect(),
            BulkCommand::Publish { numbers } => numbers
                .iter()
                .map(|&number| RepoAction::PublishPullRequest {
                    number,
                    node_id: None,
                })
                .collect(),
            BulkCommand::NewIssue { title, body, label } => {
                vec![RepoAction::CreateIssue(NewIssue {
                    title: title.clone(),
                    body: body.clone(),
                    labels: label.clone(),
                })]
            }
        };
        Ok(actions)
    }

    pub async fn execute(&self, ctx: &AppContext, yes: bool, json: bool) -> Result<()> {
        let actions = self.plan()?;
        let repo = ctx.repo()?;
        let status = StatusStream::for_output(json);

        status.line(&format!("Planned actions on {}:", repo));
        for (index, action) in actions.iter().enumerate() {
            status.line(&format!("  {:>3}. {}", index + 1, action));
        }
        if !yes && !confirm("Proceed?")? {
            status.line("Aborted, nothing changed.");
            return Ok(());
        }

        let runner = RepoActionRunner::new(ctx.github().await?, repo);
        let mut items: Vec<BulkActionItem<RepoAction>> =
            actions.into_iter().map(BulkActionItem::new).collect();

        let mut summary = run_reporting(&mut items, &runner, status).await;
        while summary.failed > 0
            && !yes
            && confirm(&format!("Retry {} failed actions?", summary.failed))?
        {
            summary = run_reporting(&mut items, &runner, status).await;
        }

        if json {
            print_json(&items)?;
        }
        status.line(&summary.to_string());

        let failed = pending_items(&items).count();
        if failed > 0 {
            bail!("{} of {} actions failed", failed, items.len());
        }
        Ok(())
    }
}

async fn run_reporting(
    items: &mut [BulkActionItem<RepoAction>],
    runner: &RepoActionRunner,
    status: StatusStream,
) -> BulkSummary {
    let total = items.len();
    let mut report = |index: usize, item: &BulkActionItem<RepoAction>| {
        if let Some(line) = progress_line(index, total, item) {
            status.line(&line);
        }
    };
    execute_bulk(items, runner, Some(&mut report)).await
}

/// One line per finished item; nothing for intermediate states
fn progress_line(index: usize, total: usize, item: &BulkActionItem<RepoAction>) -> Option<String> {
    let outcome = match item.status {
        ItemStatus::Success => "ok".to_string(),
        ItemStatus::Error => format!(
            "failed: {}",
            item.error.as_deref().unwrap_or("unknown error")
        ),
        ItemStatus::Idle | ItemStatus::Processing => return None,
    };
    Some(format!(
        "[{}/{}] {} ... {}",
        index + 1,
        total,
        item.action,
        outcome
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_close_issues_plan_carries_comment() {
        let command = BulkCommand::CloseIssues {
            numbers: vec![3, 5],
            comment: Some("stale".to_string()),
        };
        assert_eq!(
            command.plan().unwrap(),
            vec![
                RepoAction::CloseIssue {
                    number: 3,
                    comment: Some("stale".to_string())
                },
                RepoAction::CloseIssue {
                    number: 5,
                    comment: Some("stale".to_string())
                },
            ]
        );
    }

    #[test]
    fn test_label_plan_adds_before_removing() {
        let command = BulkCommand::Label {
            numbers: vec![7],
            add: vec!["triaged".to_string()],
            remove: vec!["needs-triage".to_string(), "stale".to_string()],
        };
        let plan: Vec<String> = command
            .plan()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            plan,
            vec![
                "label #7 with triaged",
                "remove label needs-triage from #7",
                "remove label stale from #7",
            ]
        );
    }

    #[test]
    fn test_new_issue_plan() {
        let command = BulkCommand::NewIssue {
            title: "Flaky test".to_string(),
            body: Some("Fails on CI".to_string()),
            label: vec!["ci".to_string()],
        };
        assert_eq!(
            command.plan().unwrap(),
            vec![RepoAction::CreateIssue(NewIssue {
                title: "Flaky test".to_string(),
                body: Some("Fails on CI".to_string()),
                labels: vec!["ci".to_string()],
            })]
        );
    }

    #[test]
    fn test_empty_label_plan_is_rejected() {
        let command = BulkCommand::Label {
            numbers: vec![1],
            add: vec![],
            remove: vec![],
        };
        assert!(command.plan().is_err());
    }

    #[test]
    fn test_progress_line_reports_only_outcomes() {
        let mut item = BulkActionItem::new(RepoAction::DeleteBranch {
            branch: "old".to_string(),
        });
        item.status = ItemStatus::Processing;
        assert_eq!(progress_line(0, 2, &item), None);

        item.status = ItemStatus::Error;
        item.error = Some("Reference does not exist".to_string());
        assert_eq!(
            progress_line(0, 2, &item).as_deref(),
            Some("[1/2] delete branch old ... failed: Reference does not exist")
        );
    }
}
