//! Submission Commands

use clap::Subcommand;

/// Submission subcommands
#[derive(Subcommand, Debug)]
pub enum SubmissionCommands {
    /// List submissions
    List {
        /// Filter by campaign
        #[arg(short, long)]
        campaign: Option<u64>,

        /// Filter by status (pending, eligible, winner, paid, rejected)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Override the status of one submission
    SetStatus {
        /// Submission ID
        #[arg(short, long)]
        id: u64,

        /// Target status
        #[arg(short, long)]
        status: String,
    },

    /// Override the status of several submissions
    BatchStatus {
        /// Comma separated submission IDs
        #[arg(short, long, value_delimiter = ',', required = true)]
        ids: Vec<u64>,

        /// Target status
        #[arg(short, long)]
        status: String,
    },
}
