use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(
    name = "replybot",
    version,
    about = "Paced reply automation for X with LLM-generated replies",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the config file
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one reply session
    Run {
        /// Override the reply budget for this run
        #[arg(short, long)]
        max_replies: Option<usize>,

        /// Creators only, ignoring mix mode
        #[arg(long, default_value = "false")]
        creators_only: bool,
    },

    /// Show how a budget would be split between feed and creators
    Plan {
        /// Total replies
        total: usize,

        /// Share for the global feed (0-100)
        #[arg(allow_negative_numbers = true)]
        percent: i64,
    },

    /// Validate configuration and report what a run would use
    Check,

    /// Show processed-post ledger statistics
    Ledger {
        /// Print every recorded id
        #[arg(long, default_value = "false")]
        list: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = commands::load_config(&cli.config);
    let (log_level, log_format) = match &config {
        Ok(c) => (c.logging.level.clone(), c.logging.format.clone()),
        Err(_) => (String::from("info"), String::from("text")),
    };
    let log_format = cli.log_format.clone().unwrap_or(log_format);

    // Initialize tracing/logging
    setup_tracing(&log_format, &log_level, cli.verbose)?;

    match cli.command {
        Commands::Run {
            max_replies,
            creators_only,
        } => {
            tracing::info!(
                config = %cli.config.display(),
                max_replies = ?max_replies,
                creators_only,
                "Starting run command"
            );
            commands::run(config?, max_replies, creators_only).await?;
        }

        Commands::Plan { total, percent } => {
            commands::plan(total, percent);
        }

        Commands::Check => {
            commands::check(&config?)?;
        }

        Commands::Ledger { list } => {
            commands::ledger(&config?, list)?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("replybot=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new(format!("replybot={level},warn"))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
