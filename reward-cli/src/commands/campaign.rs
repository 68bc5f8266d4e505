//! Campaign Commands

use clap::Subcommand;
use rust_decimal::Decimal;

/// Campaign subcommands
#[derive(Subcommand, Debug)]
pub enum CampaignCommands {
    /// List all campaigns
    List,

    /// Show the campaign currently accepting submissions
    Active,

    /// Create a campaign
    Create {
        /// Campaign name
        #[arg(short, long)]
        name: String,

        /// Reward per winning submission, in tokens
        #[arg(short, long)]
        reward: Decimal,

        /// Minimum views
        #[arg(long)]
        min_views: Option<u64>,

        /// Minimum likes
        #[arg(long)]
        min_likes: Option<u64>,

        /// Minimum comments
        #[arg(long)]
        min_comments: Option<u64>,

        /// Minimum shares
        #[arg(long)]
        min_shares: Option<u64>,

        /// Maximum number of winners
        #[arg(long)]
        max_winners: Option<u32>,

        /// Create the campaign closed
        #[arg(long)]
        inactive: bool,
    },

    /// Update campaign fields
    Update {
        /// Campaign ID
        #[arg(short, long)]
        id: u64,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        reward: Option<Decimal>,

        #[arg(long)]
        min_views: Option<u64>,

        #[arg(long)]
        min_likes: Option<u64>,

        #[arg(long)]
        min_comments: Option<u64>,

        #[arg(long)]
        min_shares: Option<u64>,

        #[arg(long)]
        max_winners: Option<u32>,

        /// Open or close the campaign
        #[arg(long)]
        active: Option<bool>,
    },

    /// Delete a campaign and its submissions
    Delete {
        /// Campaign ID
        #[arg(short, long)]
        id: u64,
    },
}
