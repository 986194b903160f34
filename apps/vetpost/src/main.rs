mod archive;
mod commands;
mod config;
mod content;
mod errors;
mod export;
mod llm_client;
mod publish;
mod scheduler;

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::content::Category;
use crate::errors::AppError;

#[derive(Parser)]
#[command(name = "vetpost")]
#[command(about = "Weekly veterinary post generator for the cat and dog accounts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate next week's posts for both accounts (default)
    Generate,

    /// Generate a single post for one account
    Daily {
        /// cat or dog
        category: Category,

        /// Post date, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Summarize recent topics from the post archive
    Analyze,

    /// Run weekly generation on the configured schedule until interrupted
    Schedule,

    /// Publish the posts for one day from an exported posts file
    Publish {
        /// A *_posts.csv file written by generate or daily
        file: PathBuf,

        /// Which day's posts to publish, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Print the posts without publishing
        #[arg(long)]
        dry_run: bool,
    },

    /// Show which integrations are configured
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (fails on malformed values, not on missing credentials)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("vetpost v{}", env!("CARGO_PKG_VERSION"));

    if let Err(err) = dispatch(cli.command.unwrap_or(Command::Generate), &config).await {
        std::process::exit(err.report());
    }
    Ok(())
}

async fn dispatch(command: Command, config: &Config) -> Result<(), AppError> {
    match command {
        Command::Generate => commands::run_generate(config).await,
        Command::Daily { category, date } => {
            commands::run_daily(config, category, date).await.map(|_| ())
        }
        Command::Analyze => commands::run_analyze(config).map(|_| ()),
        Command::Schedule => commands::run_schedule(config).await,
        Command::Publish {
            file,
            date,
            dry_run,
        } => commands::run_publish(config, &file, date, dry_run).await,
        Command::Check => commands::run_check(config),
    }
}
