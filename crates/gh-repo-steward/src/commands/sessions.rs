//! Autonomous coding session commands

use super::{print_json, truncate};
use crate::context::AppContext;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use gh_client::NewSession;

#[derive(Args, Debug)]
pub struct SessionsArgs {
    #[command(subcommand)]
    pub command: SessionsCommand,
}

#[derive(Subcommand, Debug)]
pub enum SessionsCommand {
    /// List sessions
    List,

    /// Show one session
    Show { name: String },

    /// Start a session on the current repository
    Create {
        prompt: String,
        /// Branch the session starts from
        #[arg(short, long)]
        branch: Option<String>,
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Send a follow-up message to a session
    Message { name: String, prompt: String },

    /// Delete a session
    Delete { name: String },
}

impl SessionsArgs {
    pub async fn execute(&self, ctx: &AppContext, json: bool) -> Result<()> {
        let sessions = ctx.sessions()?;

        match &self.command {
            SessionsCommand::List => {
                let list = sessions.list_sessions().await?;
                if json {
                    return print_json(&list);
                }
                for session in &list {
                    println!(
                        "{:<40} {:<12} {}",
                        session.name,
                        session.state.as_deref().unwrap_or("-"),
                        truncate(session.title.as_deref().unwrap_or(""), 60)
                    );
                }
                println!("{} sessions", list.len());
            }
            SessionsCommand::Show { name } => {
                let session = sessions.get_session(name).await?;
                print_json(&session)?;
            }
            SessionsCommand::Create {
                prompt,
                branch,
                title,
            } => {
                let repo = ctx.repo()?;
                let source = sessions
                    .find_source_for_repo(&repo.to_string())
                    .await
                    .with_context(|| format!("No connected source found for {}", repo))?;

                let mut request = NewSession::new(prompt.clone(), source);
                if let Some(branch) = branch {
                    request = request.branch(branch.clone());
                }
                if let Some(title) = title {
                    request = request.title(title.clone());
                }

                let session = sessions.create_session(&request).await?;
                if json {
                    return print_json(&session);
                }
                println!("Created {}", session.name);
                if let Some(url) = &session.url {
                    println!("  {}", url);
                }
            }
            SessionsCommand::Message { name, prompt } => {
                sessions.send_message(name, prompt).await?;
                println!("Message sent to {}", name);
            }
            SessionsCommand::Delete { name } => {
                sessions.delete_session(name).await?;
                println!("Deleted {}", name);
            }
        }
        Ok(())
    }
}
