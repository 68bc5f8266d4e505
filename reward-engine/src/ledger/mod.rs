//! Settlement Ledger
//!
//! Everything the engine needs from the chain: treasury resolution, balance
//! and nonce reads, transfer submission, finality, and outbound transfer
//! history for reconciliation.

pub mod mock;
pub mod starknet;

pub use mock::MockLedger;
pub use starknet::StarknetLedger;

use async_trait::async_trait;
use reward_core::{format_units, Uint256, DISPLAY_DECIMALS, TOKEN_DECIMALS};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{LedgerError, LedgerResult};

/// Resolved treasury account, shared by every item of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryAccount {
    pub address: String,
}

/// Chain view of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TxStatus {
    /// Known but not final
    Pending,
    /// Final and executed successfully
    Confirmed,
    /// Reverted or rejected
    Failed { reason: String },
    /// Unknown to the node
    NotFound,
}

/// Result of waiting for finality
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finality {
    Confirmed,
    Failed { reason: String },
}

/// A confirmed outbound token transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub tx_reference: String,
    pub recipient: String,
    pub amount_raw: u128,
    pub block_number: Option<u64>,
}

/// Balance reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub address: String,
    /// Display value in whole tokens
    pub balance: String,
    /// Exact base-unit value
    pub raw: String,
}

impl Balance {
    pub fn new(address: impl Into<String>, raw: Uint256) -> Self {
        Self {
            address: address.into(),
            balance: format_units(&raw.to_biguint(), TOKEN_DECIMALS, DISPLAY_DECIMALS),
            raw: raw.to_string(),
        }
    }
}

/// Settlement ledger
#[async_trait]
pub trait SettlementLedger: Send + Sync {
    /// Resolve the account rewards are paid from
    async fn treasury(&self) -> LedgerResult<TreasuryAccount>;

    /// Token balance on the latest accepted block
    async fn balance(&self, account: &str) -> LedgerResult<Uint256>;

    /// Next nonce for `account`, counting transactions not yet in a block
    async fn nonce(&self, account: &str) -> LedgerResult<u64>;

    /// Submit a token transfer with an explicit nonce
    ///
    /// Returns the transaction reference once the chain has accepted it.
    async fn submit_transfer(
        &self,
        sender: &TreasuryAccount,
        recipient: &str,
        amount: u128,
        nonce: u64,
    ) -> LedgerResult<String>;

    async fn transaction_status(&self, tx_reference: &str) -> LedgerResult<TxStatus>;

    /// Block until the transaction is final or has failed
    async fn wait_for_finality(&self, tx_reference: &str) -> LedgerResult<Finality>;

    /// Recent confirmed transfers sent by `sender`
    async fn recent_transfers(&self, sender: &str) -> LedgerResult<Vec<TransferRecord>>;

    async fn chain_id(&self) -> LedgerResult<String>;
}

/// Poll `transaction_status` until it settles
///
/// Transient read errors are logged and polled through. With no timeout the
/// wait is unbounded.
pub async fn poll_finality<L: SettlementLedger + ?Sized>(
    ledger: &L,
    tx_reference: &str,
    interval: Duration,
    timeout: Option<Duration>,
) -> LedgerResult<Finality> {
    let started = Instant::now();
    let mut polls: u64 = 0;

    loop {
        polls += 1;
        match ledger.transaction_status(tx_reference).await {
            Ok(TxStatus::Confirmed) => return Ok(Finality::Confirmed),
            Ok(TxStatus::Failed { reason }) => return Ok(Finality::Failed { reason }),
            Ok(TxStatus::Pending) | Ok(TxStatus::NotFound) => {
                debug!(tx = %tx_reference, polls, "Transaction not final yet");
            }
            Err(e) if e.is_retryable() => {
                warn!(tx = %tx_reference, error = %e, "Finality poll failed, retrying");
            }
            Err(e) => return Err(e),
        }

        if let Some(limit) = timeout {
            if started.elapsed() >= limit {
                return Err(LedgerError::FinalityTimeout {
                    tx_reference: tx_reference.to_string(),
                    waited_secs: started.elapsed().as_secs(),
                });
            }
        }

        tokio::time::sleep(interval).await;
    }
}
