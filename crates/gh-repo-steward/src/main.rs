//! gh-repo-steward - keep a GitHub repository tidy from the command line
//!
//! Lists issues, branches and workflow runs, shows pull requests with their
//! test status and merge readiness, and applies approved write operations in
//! bulk.

mod commands;
mod context;

use clap::{Parser, Subcommand};
use commands::{BulkCommand, CacheArgs, ReadCommand, SessionsArgs};
use context::{AppContext, GlobalOptions};
use gh_pr_config::AppConfig;

/// Keep a GitHub repository tidy
#[derive(Parser, Debug)]
#[command(name = "gh-repo-steward")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Repository as owner/name or URL (overrides default_repo from config)
    #[arg(short, long, global = true, env = "GH_REPO_STEWARD_REPO")]
    repo: Option<String>,

    /// GitHub host for Enterprise installations
    #[arg(long, global = true)]
    host: Option<String>,

    /// Keep cache and settings in memory for this run only
    #[arg(long, global = true)]
    no_persist: bool,

    /// Neither read from nor write to the cache
    #[arg(long, global = true)]
    no_cache: bool,

    /// Ignore cached responses but store fresh ones
    #[arg(long, global = true)]
    refresh: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Run write operations without asking
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(flatten)]
    Read(ReadCommand),

    #[command(flatten)]
    Bulk(BulkCommand),

    /// Manage autonomous coding sessions
    Sessions(SessionsArgs),

    /// Inspect or clear the local API cache
    Cache(CacheArgs),
}

impl Cli {
    fn global_options(&self) -> GlobalOptions {
        GlobalOptions {
            repo: self.repo.clone(),
            host: self.host.clone(),
            no_persist: self.no_persist,
            no_cache: self.no_cache,
            refresh: self.refresh,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    match dotenvy::dotenv() {
        Ok(path) => log::debug!("Loaded .env file from: {:?}", path),
        Err(_) => log::debug!(".env file not found, relying on environment variables"),
    }

    let cli = Cli::parse();
    let ctx = AppContext::new(&cli.global_options(), AppConfig::load())?;

    match &cli.command {
        Commands::Read(command) => command.execute(&ctx, cli.json).await,
        Commands::Bulk(command) => command.execute(&ctx, cli.yes, cli.json).await,
        Commands::Sessions(args) => args.execute(&ctx, cli.json).await,
        Commands::Cache(args) => args.execute(&ctx),
    }
}
