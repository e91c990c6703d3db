//! Shelfwise - Batch Retail Recommendation Engine
//!
//! Command-line entry point: evaluate the three recommenders on a
//! transaction export, inspect one household's list, or print matrix
//! statistics.

mod cli;

use clap::{Parser, Subcommand};
use cli::{config::ConfigAction, helpers::DataArgs};
use shelfwise_core::error::Result;
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(name = "shelfwise")]
#[command(about = "Batch recommendation engine for household retail transactions", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Configuration file (TOML); SHELFWISE__* environment variables override it
    #[arg(short, long, global = true, env = "SHELFWISE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit and evaluate recommenders, then print the comparison report
    Evaluate {
        #[command(flatten)]
        data: DataArgs,

        /// Recommendation list size N
        #[arg(short = 'n', long)]
        list_size: Option<usize>,

        /// Comma-separated algorithms (content-based, user-user, item-item)
        #[arg(short, long, value_delimiter = ',')]
        algorithms: Vec<String>,

        /// Evaluate only the first N test households
        #[arg(long)]
        max_users: Option<usize>,

        /// Write the comparison report as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write every per-user list as JSON
        #[arg(long)]
        recommendations_out: Option<PathBuf>,
    },

    /// Recommend products for one household
    Recommend {
        #[command(flatten)]
        data: DataArgs,

        /// Household key
        #[arg(long)]
        household: u64,

        /// Algorithm to use
        #[arg(short, long, default_value = "user-user")]
        algorithm: String,

        /// Recommendation list size N
        #[arg(short = 'n', long)]
        list_size: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print train/test matrix statistics
    Stats {
        #[command(flatten)]
        data: DataArgs,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::new(format!(
        "shelfwise={level},shelfwise_core={level}",
        level = level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();

    debug!("Shelfwise v{} starting...", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Evaluate {
            data,
            list_size,
            algorithms,
            max_users,
            output,
            recommendations_out,
        } => {
            cli::evaluate::handle(
                data,
                cli.config,
                list_size,
                algorithms,
                max_users,
                output,
                recommendations_out,
            )
            .await
        }
        Commands::Recommend {
            data,
            household,
            algorithm,
            list_size,
            format,
        } => cli::recommend::handle(data, cli.config, household, algorithm, list_size, format).await,
        Commands::Stats { data, format } => cli::stats::handle(data, cli.config, format).await,
        Commands::Config { action } => cli::config::handle(action, cli.config),
    }
}
