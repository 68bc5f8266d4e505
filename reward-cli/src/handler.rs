//! Command Handlers
//!
//! Handler functions for CLI commands.

use crate::client::RewardClient;
use crate::commands::{
    campaign::CampaignCommands, payout::PayoutCommands, submission::SubmissionCommands, Cli,
    Commands, OutputFormat,
};
use crate::error::{CliError, CliResult};
use crate::output;
use reward_api::{ApiConfig, AppState, AuthConfig, MetricsConfig};
use reward_core::{CampaignPatch, SubmissionStatus};
use reward_engine::{
    CampaignDraft, LedgerConfig, MetricsProvider, MockLedger, ProviderConfig, SettlementLedger,
    StarknetLedger, TikTokProvider,
};
use reward_store::{RewardDatabase, StorageBackend, StorageConfig};
use std::sync::Arc;
use tracing::{debug, info};

/// Run the CLI with parsed arguments
pub async fn run(cli: Cli) -> CliResult<()> {
    match &cli.command {
        Commands::Init => handle_init(&cli).await,
        Commands::Start {
            host,
            port,
            mock_ledger,
        } => handle_start(&cli, host.clone(), *port, *mock_ledger).await,
        _ => {
            let client = RewardClient::new(&cli.api_url, cli.admin_password.clone())?;
            let format = cli.format;
            match cli.command {
                Commands::Health => handle_health(&client, format).await,
                Commands::Stats => handle_stats(&client, format).await,
                Commands::Campaign(cmd) => handle_campaign(&client, cmd, format).await,
                Commands::Submission(cmd) => handle_submission(&client, cmd, format).await,
                Commands::Payout(cmd) => handle_payout(&client, cmd, format).await,
                Commands::Balance => handle_balance(&client, format).await,
                Commands::Reconcile { repair } => handle_reconcile(&client, repair, format).await,
                Commands::Init | Commands::Start { .. } => unreachable!(),
            }
        }
    }
}

/// Storage configuration from CLI flags, falling back to the environment
fn storage_config(cli: &Cli) -> CliResult<StorageConfig> {
    let backend = StorageBackend::from_str(&cli.storage)
        .ok_or_else(|| CliError::invalid_arg(format!("Unknown storage backend: {}", cli.storage)))?;

    Ok(StorageConfig {
        backend,
        ..StorageConfig::from_env().with_data_dir(cli.data_dir.clone())
    })
}

async fn open_database(cli: &Cli) -> CliResult<RewardDatabase> {
    let config = storage_config(cli)?;
    let database = RewardDatabase::open(&config)?;
    if database.init_schema().await? {
        info!("Seeded default campaign");
    }
    debug!(backend = database.backend_name(), "Store ready");
    Ok(database)
}

/// Handle store initialization
async fn handle_init(cli: &Cli) -> CliResult<()> {
    println!("Initializing reward store...");
    println!("  Backend: {}", cli.storage);
    println!("  Data dir: {}", cli.data_dir);

    let database = open_database(cli).await?;
    database.flush().await?;

    println!("Store initialized successfully.");
    Ok(())
}

/// Handle starting the API server
async fn handle_start(cli: &Cli, host: String, port: u16, mock_ledger: bool) -> CliResult<()> {
    println!("Starting reward API server...");
    println!("  Host: {}:{}", host, port);
    println!("  Storage: {} ({})", cli.storage, cli.data_dir);

    let database = open_database(cli).await?;

    let ledger: Arc<dyn SettlementLedger> = if mock_ledger {
        output::print_warning("Using the in-process mock ledger; no tokens will move");
        Arc::new(MockLedger::new("0x1"))
    } else {
        let config = LedgerConfig::from_env();
        if let Err(e) = config.validate() {
            // The server still starts; payout routes answer 503 until configured.
            output::print_warning(&e.to_string());
        }
        Arc::new(StarknetLedger::new(config).map_err(|e| CliError::config(e.to_string()))?)
    };

    let provider: Arc<dyn MetricsProvider> = Arc::new(
        TikTokProvider::new(ProviderConfig::from_env())
            .map_err(|e| CliError::config(format!("Metrics provider: {}", e)))?,
    );

    reward_api::init_metrics(&MetricsConfig::from_env()).map_err(CliError::config)?;

    let auth = AuthConfig::from_env();
    if auth.admin_password.is_none() {
        output::print_warning("ADMIN_PASSWORD is not set; admin routes will refuse every request");
    }

    let api_config = ApiConfig {
        listen_addr: format!("{}:{}", host, port),
        ..ApiConfig::from_env()
    };

    let state = AppState::new(api_config, auth, database, provider, ledger);

    println!("Starting server on {}:{}...", host, port);

    reward_api::start_server(state)
        .await
        .map_err(|e| CliError::server(format!("Server error: {}", e)))?;

    Ok(())
}

async fn handle_health(client: &RewardClient, format: OutputFormat) -> CliResult<()> {
    let health = client.health().await?;
    output::print_health(&health, format);
    Ok(())
}

async fn handle_stats(client: &RewardClient, format: OutputFormat) -> CliResult<()> {
    let stats = client.stats().await?;
    output::print_stats(&stats, format);
    Ok(())
}

async fn handle_campaign(
    client: &RewardClient,
    cmd: CampaignCommands,
    format: OutputFormat,
) -> CliResult<()> {
    match cmd {
        CampaignCommands::List => {
            let campaigns = client.list_campaigns().await?;
            output::print_campaigns(&campaigns, format);
        }
        CampaignCommands::Active => {
            let campaign = client.active_campaign().await?;
            output::print_campaign(&campaign, format);
        }
        CampaignCommands::Create {
            name,
            reward,
            min_views,
            min_likes,
            min_comments,
            min_shares,
            max_winners,
            inactive,
        } => {
            let draft = CampaignDraft {
                name: Some(name),
                min_views,
                min_likes,
                min_comments,
                min_shares,
                reward_amount: Some(reward),
                max_winners,
                is_active: Some(!inactive),
            };
            let campaign = client.create_campaign(&draft).await?;
            output::print_campaign(&campaign, format);
        }
        CampaignCommands::Update {
            id,
            name,
            reward,
            min_views,
            min_likes,
            min_comments,
            min_shares,
            max_winners,
            active,
        } => {
            let patch = CampaignPatch {
                name,
                min_views,
                min_likes,
                min_comments,
                min_shares,
                reward_amount: reward,
                max_winners,
                is_active: active,
            };
            let campaign = client.update_campaign(id, &patch).await?;
            output::print_campaign(&campaign, format);
        }
        CampaignCommands::Delete { id } => {
            let result = client.delete_campaign(id).await?;
            match format {
                OutputFormat::Json => output::print_output(&result, format),
                _ => output::print_success(&format!(
                    "Deleted campaign {} and {} submissions",
                    id, result.removed_submissions
                )),
            }
        }
    }
    Ok(())
}

/// Reject unknown statuses before a round trip
fn parse_status(status: &str) -> CliResult<SubmissionStatus> {
    status
        .parse()
        .map_err(|_| CliError::invalid_arg(format!("Invalid status: {}", status)))
}

async fn handle_submission(
    client: &RewardClient,
    cmd: SubmissionCommands,
    format: OutputFormat,
) -> CliResult<()> {
    match cmd {
        SubmissionCommands::List { campaign, status } => {
            if let Some(status) = &status {
                parse_status(status)?;
            }
            let rows = client.list_submissions(campaign, status.as_deref()).await?;
            output::print_submissions(&rows, format);
        }
        SubmissionCommands::SetStatus { id, status } => {
            let status = parse_status(&status)?;
            let submission = client.set_status(id, status.as_str()).await?;
            match format {
                OutputFormat::Json => output::print_output(&submission, format),
                _ => output::print_success(&format!(
                    "Submission {} is now {}",
                    submission.id, submission.status
                )),
            }
        }
        SubmissionCommands::BatchStatus { ids, status } => {
            let status = parse_status(&status)?;
            let result = client.batch_status(&ids, status.as_str()).await?;
            match format {
                OutputFormat::Json => output::print_output(&result, format),
                _ => {
                    output::print_success(&format!("Updated {} submissions", result.updated));
                    if !result.skipped.is_empty() {
                        output::print_warning(&format!("Skipped: {:?}", result.skipped));
                    }
                }
            }
        }
    }
    Ok(())
}

async fn handle_payout(
    client: &RewardClient,
    cmd: PayoutCommands,
    format: OutputFormat,
) -> CliResult<()> {
    match cmd {
        PayoutCommands::Run { ids } => {
            let report = client.payout(&ids).await?;
            output::print_payout(&report, format);
        }
        PayoutCommands::Simulate { ids } => {
            let report = client.simulate(&ids).await?;
            output::print_simulation(&report, format);
        }
        PayoutCommands::Job { ids } => {
            let started = client.start_job(&ids).await?;
            match format {
                OutputFormat::Json => output::print_output(&started, format),
                _ => output::print_success(&format!("Started payout job {}", started.job_id)),
            }
        }
        PayoutCommands::JobStatus { job_id } => {
            let job = client.job(&job_id).await?;
            output::print_job(&job, format);
        }
    }
    Ok(())
}

async fn handle_balance(client: &RewardClient, format: OutputFormat) -> CliResult<()> {
    let balance = client.balance().await?;
    output::print_balance(&balance, format);
    Ok(())
}

async fn handle_reconcile(
    client: &RewardClient,
    repair: bool,
    format: OutputFormat,
) -> CliResult<()> {
    debug!(repair, "Requesting reconciliation");
    let report = client.reconcile(repair).await?;
    output::print_reconcile(&report, format);
    Ok(())
}
