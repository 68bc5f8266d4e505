//! Reward CLI - Command Line Interface
//!
//! Runs the reward API server and drives its admin surface.
//!
//! # Usage
//!
//! ```text
//! rewards [OPTIONS] <COMMAND>
//!
//! Commands:
//!   init        Initialize the local store
//!   start       Start the reward API server
//!   health      Check health of the reward service
//!   stats       Show submission counts by status
//!   campaign    Campaign management
//!   submission  Submission review
//!   payout      Payout settlement
//!   balance     Show the treasury balance
//!   reconcile   Match unpaid submissions against settled transfers
//!
//! Options:
//!   -a, --api-url <URL>          API endpoint URL [default: http://localhost:4000]
//!       --admin-password <PW>    Operator password [env: ADMIN_PASSWORD]
//!   -f, --format <FORMAT>        Output format (json, table, plain) [default: table]
//!   -v, --verbose                Enable verbose output
//! ```
//!
//! # Examples
//!
//! ```text
//! rewards start --port 4000
//! rewards submission set-status --id 12 --status winner
//! rewards payout simulate --ids 12,13
//! rewards payout run --ids 12,13
//! rewards reconcile --repair
//! ```

pub mod client;
pub mod commands;
pub mod error;
pub mod handler;
pub mod output;

pub use client::RewardClient;
pub use commands::{Cli, Commands, OutputFormat};
pub use error::{CliError, CliResult};

/// CLI version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
