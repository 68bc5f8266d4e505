//! Reward CLI Entry Point
//!
//! Configuration is loaded from environment variables (via .env file).
//! Command-line arguments override environment variables.

use clap::Parser;
use reward_cli::{handler, Cli};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Err(e) = handler::run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

/// Initialize logging with tracing
fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "reward_cli=debug,reward_api=debug,reward_engine=debug,reward_store=debug"
    } else {
        "reward_cli=info,reward_api=info,reward_engine=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
