//! CLI Commands Module
//!
//! Command definitions for the rewards CLI.

pub mod campaign;
pub mod payout;
pub mod submission;

use clap::{Parser, Subcommand};

/// Reward payout service CLI
#[derive(Parser, Debug)]
#[command(name = "rewards")]
#[command(version)]
#[command(about = "Reward submission and payout command line interface")]
#[command(long_about = "A command-line tool for running and operating the reward service.\n\n\
    Use this tool to start the API server, manage campaigns, review submissions \
    and settle payouts against the treasury.")]
pub struct Cli {
    /// API endpoint URL
    #[arg(short, long, env = "REWARDS_API_URL", default_value = "http://localhost:4000")]
    pub api_url: String,

    /// Operator password sent with admin requests (env: ADMIN_PASSWORD)
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Data directory for the sled store (env: REWARDS_DATA_DIR)
    #[arg(long, env = "REWARDS_DATA_DIR", default_value = "./data/rewards")]
    pub data_dir: String,

    /// Storage backend, `sled` or `memory` (env: REWARDS_STORAGE)
    #[arg(long, env = "REWARDS_STORAGE", default_value = "sled")]
    pub storage: String,

    /// Output format (json, table, plain)
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Table format (human-readable)
    #[default]
    Table,
    /// Plain text
    Plain,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the local store
    Init,

    /// Start the reward API server
    Start {
        /// Host to bind to (env: REWARDS_API_HOST)
        #[arg(short = 'H', long, env = "REWARDS_API_HOST", default_value = "0.0.0.0")]
        host: String,
        /// Port to listen on (env: REWARDS_API_PORT)
        #[arg(short, long, env = "REWARDS_API_PORT", default_value = "4000")]
        port: u16,
        /// Settle against an in-process ledger instead of the chain
        #[arg(long)]
        mock_ledger: bool,
    },

    /// Check health of the reward service
    Health,

    /// Show submission counts by status
    Stats,

    /// Campaign management
    #[command(subcommand)]
    Campaign(campaign::CampaignCommands),

    /// Submission review
    #[command(subcommand)]
    Submission(submission::SubmissionCommands),

    /// Payout settlement
    #[command(subcommand)]
    Payout(payout::PayoutCommands),

    /// Show the treasury balance
    Balance,

    /// Match unpaid submissions against settled transfers
    Reconcile {
        /// Mark matched submissions as paid
        #[arg(long)]
        repair: bool,
    },
}
