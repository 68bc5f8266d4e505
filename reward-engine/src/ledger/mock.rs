//! Mock ledger for tests and local runs
//!
//! Keeps balances, nonces and transactions in memory. Failures can be
//! injected per recipient, and finality can be held back to exercise
//! timeouts.

use async_trait::async_trait;
use reward_core::{normalize_address, Uint256};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;

use super::{Finality, SettlementLedger, TransferRecord, TreasuryAccount, TxStatus};
use crate::error::{LedgerError, LedgerResult};

/// Starting treasury balance: one million tokens
const DEFAULT_TREASURY_BALANCE: u128 = 1_000_000 * 10u128.pow(18);

#[derive(Debug)]
struct MockTx {
    sender: String,
    status: TxStatus,
}

#[derive(Debug, Default)]
struct MockLedgerState {
    balances: HashMap<String, u128>,
    nonces: HashMap<String, u64>,
    txs: HashMap<String, MockTx>,
    history: Vec<(String, TransferRecord)>,
    submitted_nonces: Vec<u64>,
    fail_submit: HashSet<String>,
    fail_finality: HashSet<String>,
    finality_held: bool,
    offline: bool,
    next_tx: u64,
    block: u64,
}

impl MockLedgerState {
    fn check_online(&self) -> LedgerResult<()> {
        if self.offline {
            Err(LedgerError::RpcConnection("mock ledger offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn next_tx_reference(&mut self) -> String {
        self.next_tx += 1;
        self.block += 1;
        format!("{:#066x}", self.next_tx)
    }

    /// Move funds and append to the sender's history
    fn settle(&mut self, tx_reference: &str, sender: &str, recipient: &str, amount: u128) {
        *self.balances.entry(sender.to_string()).or_default() -= amount;
        *self.balances.entry(recipient.to_string()).or_default() += amount;
        self.history.push((
            sender.to_string(),
            TransferRecord {
                tx_reference: tx_reference.to_string(),
                recipient: recipient.to_string(),
                amount_raw: amount,
                block_number: Some(self.block),
            },
        ));
    }
}

/// In-memory settlement ledger
#[derive(Debug)]
pub struct MockLedger {
    treasury: String,
    state: RwLock<MockLedgerState>,
}

impl MockLedger {
    /// Ledger with a funded treasury at `treasury`
    pub fn new(treasury: impl Into<String>) -> Self {
        let treasury = normalize_address(&treasury.into());
        let mut state = MockLedgerState::default();
        state
            .balances
            .insert(treasury.clone(), DEFAULT_TREASURY_BALANCE);
        Self {
            treasury,
            state: RwLock::new(state),
        }
    }

    pub fn with_balance(mut self, account: &str, raw: u128) -> Self {
        self.state
            .get_mut()
            .balances
            .insert(normalize_address(account), raw);
        self
    }

    /// Reject transfer submissions to `recipient`
    pub async fn fail_submit_to(&self, recipient: &str) {
        self.state
            .write()
            .await
            .fail_submit
            .insert(normalize_address(recipient));
    }

    /// Accept transfers to `recipient` but revert them on chain
    pub async fn fail_finality_for(&self, recipient: &str) {
        self.state
            .write()
            .await
            .fail_finality
            .insert(normalize_address(recipient));
    }

    pub async fn clear_failures(&self) {
        let mut state = self.state.write().await;
        state.fail_submit.clear();
        state.fail_finality.clear();
    }

    /// While held, every known transaction reports `Pending`
    pub async fn hold_finality(&self, held: bool) {
        self.state.write().await.finality_held = held;
    }

    /// Make every call fail with a connection error
    pub async fn set_offline(&self, offline: bool) {
        self.state.write().await.offline = offline;
    }

    /// Confirm a treasury transfer that bypassed the engine
    ///
    /// Models a transfer that landed on chain while the local record of it
    /// was lost.
    pub async fn inject_transfer(&self, recipient: &str, amount: u128) -> String {
        let mut state = self.state.write().await;
        let recipient = normalize_address(recipient);
        let tx_reference = state.next_tx_reference();
        *state.nonces.entry(self.treasury.clone()).or_default() += 1;
        state.txs.insert(
            tx_reference.clone(),
            MockTx {
                sender: self.treasury.clone(),
                status: TxStatus::Confirmed,
            },
        );
        let treasury = self.treasury.clone();
        state.settle(&tx_reference, &treasury, &recipient, amount);
        tx_reference
    }

    /// Every settled transfer, oldest first
    pub async fn transfers(&self) -> Vec<TransferRecord> {
        self.state
            .read()
            .await
            .history
            .iter()
            .map(|(_, record)| record.clone())
            .collect()
    }

    /// Nonces of accepted submissions, in submission order
    pub async fn submitted_nonces(&self) -> Vec<u64> {
        self.state.read().await.submitted_nonces.clone()
    }

    pub async fn balance_of(&self, account: &str) -> u128 {
        self.state
            .read()
            .await
            .balances
            .get(&normalize_address(account))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl SettlementLedger for MockLedger {
    async fn treasury(&self) -> LedgerResult<TreasuryAccount> {
        self.state.read().await.check_online()?;
        Ok(TreasuryAccount {
            address: self.treasury.clone(),
        })
    }

    async fn balance(&self, account: &str) -> LedgerResult<Uint256> {
        let state = self.state.read().await;
        state.check_online()?;
        let raw = state
            .balances
            .get(&normalize_address(account))
            .copied()
            .unwrap_or(0);
        Ok(Uint256::from_u128(raw))
    }

    async fn nonce(&self, account: &str) -> LedgerResult<u64> {
        let state = self.state.read().await;
        state.check_online()?;
        Ok(state
            .nonces
            .get(&normalize_address(account))
            .copied()
            .unwrap_or(0))
    }

    async fn submit_transfer(
        &self,
        sender: &TreasuryAccount,
        recipient: &str,
        amount: u128,
        nonce: u64,
    ) -> LedgerResult<String> {
        let mut state = self.state.write().await;
        state.check_online()?;

        let sender = normalize_address(&sender.address);
        let recipient = normalize_address(recipient);

        let expected = state.nonces.get(&sender).copied().unwrap_or(0);
        if nonce != expected {
            return Err(LedgerError::RpcResponse {
                code: 52,
                message: format!("Invalid transaction nonce: expected {}, got {}", expected, nonce),
            });
        }

        if state.fail_submit.contains(&recipient) {
            return Err(LedgerError::Signer(format!(
                "transfer to {} rejected",
                recipient
            )));
        }

        let available = state.balances.get(&sender).copied().unwrap_or(0);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                required: amount,
                available,
            });
        }

        let tx_reference = state.next_tx_reference();
        *state.nonces.entry(sender.clone()).or_default() += 1;
        state.submitted_nonces.push(nonce);

        let status = if state.fail_finality.contains(&recipient) {
            TxStatus::Failed {
                reason: "Transaction reverted".to_string(),
            }
        } else {
            state.settle(&tx_reference, &sender, &recipient, amount);
            TxStatus::Confirmed
        };

        debug!(tx = %tx_reference, %recipient, amount, nonce, "Mock transfer submitted");
        state.txs.insert(tx_reference.clone(), MockTx { sender, status });
        Ok(tx_reference)
    }

    async fn transaction_status(&self, tx_reference: &str) -> LedgerResult<TxStatus> {
        let state = self.state.read().await;
        state.check_online()?;
        match state.txs.get(tx_reference) {
            Some(_) if state.finality_held => Ok(TxStatus::Pending),
            Some(tx) => Ok(tx.status.clone()),
            None => Ok(TxStatus::NotFound),
        }
    }

    async fn wait_for_finality(&self, tx_reference: &str) -> LedgerResult<Finality> {
        match self.transaction_status(tx_reference).await? {
            TxStatus::Confirmed => Ok(Finality::Confirmed),
            TxStatus::Failed { reason } => Ok(Finality::Failed { reason }),
            TxStatus::Pending => Err(LedgerError::FinalityTimeout {
                tx_reference: tx_reference.to_string(),
                waited_secs: 0,
            }),
            TxStatus::NotFound => Err(LedgerError::TransactionNotFound(tx_reference.to_string())),
        }
    }

    async fn recent_transfers(&self, sender: &str) -> LedgerResult<Vec<TransferRecord>> {
        let state = self.state.read().await;
        state.check_online()?;
        let sender = normalize_address(sender);
        Ok(state
            .history
            .iter()
            .filter(|(from, record)| {
                *from == sender
                    && state
                        .txs
                        .get(&record.tx_reference)
                        .map_or(false, |tx| tx.sender == sender)
            })
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn chain_id(&self) -> LedgerResult<String> {
        self.state.read().await.check_online()?;
        Ok("SN_MOCK".to_string())
    }
}
