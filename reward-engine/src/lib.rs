//! Reward Engine - Intake, settlement and reconciliation
//!
//! Workflows over the reward store and two external dependencies:
//!
//! - [`MetricsProvider`] - engagement counters for submitted content
//! - [`SettlementLedger`] - the chain the treasury pays from
//!
//! # Services
//!
//! | Service             | Responsibility                                  |
//! |---------------------|-------------------------------------------------|
//! | [`SubmissionService`] | sessions, submission intake, operator overrides |
//! | [`CampaignService`]   | campaign CRUD                                   |
//! | [`PayoutEngine`]      | disburse, simulate, balance, reconcile          |
//!
//! Every payout from one treasury account runs under that account's lock
//! ([`AccountLocks`]), and a submission becomes `paid` only after its
//! transfer is observed final on chain.

pub mod campaigns;
pub mod config;
pub mod error;
pub mod intake;
pub mod ledger;
pub mod lock;
pub mod payout;
pub mod provider;
pub mod reconcile;

pub use campaigns::{CampaignDraft, CampaignService};
pub use config::{LedgerConfig, ProviderConfig, STRK_TOKEN_ADDRESS};
pub use error::{EngineError, EngineResult, LedgerError, LedgerResult};
pub use intake::{BatchOverrideResult, SubmissionOutcome, SubmissionRequest, SubmissionService};
pub use ledger::{
    Balance, Finality, MockLedger, SettlementLedger, StarknetLedger, TransferRecord,
    TreasuryAccount, TxStatus,
};
pub use lock::AccountLocks;
pub use payout::{PayoutEngine, PayoutItem, PayoutReport, SimulationItem, SimulationReport};
pub use provider::{MetricsLookup, MetricsProvider, MockMetricsProvider, TikTokProvider};
pub use reconcile::{MatchSource, ReconcileMatch, ReconcileReport};
