//! Cache maintenance commands

use crate::context::AppContext;
use anyhow::Result;
use clap::{Args, Subcommand};

#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Drop all cached API responses (settings are kept)
    Clear,

    /// Show cache occupancy
    Stats,
}

impl CacheArgs {
    pub fn execute(&self, ctx: &AppContext) -> Result<()> {
        match self.command {
            CacheCommand::Clear => {
                let removed = ctx.cache.purge();
                println!("Removed {} cached responses", removed);
            }
            CacheCommand::Stats => {
                let stats = ctx.cache.stats();
                println!("entries:       {}", stats.entries);
                println!(
                    "storage:       {} of {} bytes",
                    stats.storage_bytes, ctx.config.storage_quota_bytes
                );
                let recent = ctx.settings.recent_repositories();
                if !recent.is_empty() {
                    println!("recent repositories:");
                    for entry in recent {
                        println!(
                            "  {:<40} {}",
                            entry.repo,
                            entry.last_used.format("%Y-%m-%d %H:%M")
                        );
                    }
                }
            }
        }
        Ok(())
    }
}
