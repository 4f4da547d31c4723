use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pagebrief_core::{AppConfig, HistoryStore};

mod commands;

#[derive(Parser)]
#[command(name = "pagebrief")]
#[command(author, version, about = "Summarize web pages with an LLM, with a local fallback")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a page and print a short summary
    Summarize {
        /// Page URL (http or https)
        url: String,
    },
    /// Browse and manage past requests
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Show aggregate statistics over the request history
    Stats {
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List past requests, newest first
    List {
        /// Show at most this many records
        #[arg(short, long)]
        limit: Option<usize>,
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a single record in full
    Show {
        /// Record id from `history list`
        id: u64,
    },
    /// Delete a record
    Delete {
        /// Record id from `history list`
        id: u64,
    },
    /// Delete all records
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load()?;
    let history = HistoryStore::new(config.history_path(), config.history.max_entries);

    match cli.command {
        Commands::Summarize { url } => commands::summarize::run(&config, &history, &url).await,
        Commands::History { action } => match action {
            HistoryAction::List { limit, json } => commands::history::list(&history, limit, json),
            HistoryAction::Show { id } => commands::history::show(&history, id),
            HistoryAction::Delete { id } => commands::history::delete(&history, id),
            HistoryAction::Clear => commands::history::clear(&history),
        },
        Commands::Stats { json } => commands::stats::run(&history, json),
    }
}
