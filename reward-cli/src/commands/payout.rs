//! Payout Commands
//!
//! Settlement runs on the server; these commands only drive the API.

use clap::Subcommand;

/// Payout subcommands
#[derive(Subcommand, Debug)]
pub enum PayoutCommands {
    /// Pay the selected submissions and wait for the report
    Run {
        /// Comma separated submission IDs
        #[arg(short, long, value_delimiter = ',', required = true)]
        ids: Vec<u64>,
    },

    /// Preview the amounts a payout would send
    Simulate {
        /// Comma separated submission IDs
        #[arg(short, long, value_delimiter = ',', required = true)]
        ids: Vec<u64>,
    },

    /// Start a background payout job
    Job {
        /// Comma separated submission IDs
        #[arg(short, long, value_delimiter = ',', required = true)]
        ids: Vec<u64>,
    },

    /// Show the state of a payout job
    JobStatus {
        /// Job ID returned by `payout job`
        #[arg(short, long)]
        job_id: String,
    },
}
