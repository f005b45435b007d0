//! codejudge CLI: scheduler daemon, manual runs and read-only queries.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;
mod config;

#[derive(Parser)]
#[command(
    name = "codejudge",
    version,
    about = "Score challenge repositories with an LLM judge"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every active challenge on a fixed interval
    Serve {
        /// Challenge ids to evaluate immediately in the background
        #[arg(long)]
        trigger: Vec<String>,

        /// Override the configured interval (seconds, at least 60)
        #[arg(long)]
        interval: Option<u64>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Evaluate one challenge now and wait for it to finish
    Run {
        /// Challenge id
        challenge: String,

        /// Restrict to these criterion ids (comma-separated)
        #[arg(long)]
        criteria: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Rank the repositories of a challenge
    Rank {
        /// Challenge id
        challenge: String,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show the evaluation state of each repository of a challenge
    Status {
        /// Challenge id
        challenge: String,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show every evaluation of one repository
    History {
        /// Challenge id
        challenge: String,

        /// Repository id
        repository: String,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config and a sample store
    Init,
}

#[tokio::main]
async fn main() {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "codejudge=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve {
            trigger,
            interval,
            config,
        } => commands::serve::execute(trigger, interval, config).await,
        Commands::Run {
            challenge,
            criteria,
            config,
        } => commands::run::execute(challenge, criteria, config).await,
        Commands::Rank {
            challenge,
            format,
            config,
        } => commands::rank::execute(challenge, format, config).await,
        Commands::Status {
            challenge,
            format,
            config,
        } => commands::status::execute(challenge, format, config).await,
        Commands::History {
            challenge,
            repository,
            format,
            config,
        } => commands::history::execute(challenge, repository, format, config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
