//! Payout Engine
//!
//! Pays a selection of eligible submissions from the treasury account.
//!
//! # Batch flow
//!
//! ```text
//! treasury() ─▶ lock(account) ─▶ select_payable(ids) ─▶ nonce(pending)
//!                                        │
//!          ┌─────────────────────────────┘  one item at a time
//!          ▼
//!   submit_transfer(nonce) ─▶ journal ─▶ wait_for_finality ─▶ mark_paid
//! ```
//!
//! An item that fails at any step keeps its status and the batch moves on.
//! Only a failure before the first item is attempted fails the whole call.

use chrono::Utc;
use reward_core::{
    to_base_units, AttemptOutcome, CampaignId, PayoutAttempt, Submission, SubmissionId,
    TOKEN_DECIMALS,
};
use reward_store::{
    CampaignRepository, PayoutAttemptRepository, RewardStore, SubmissionRepository,
};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::ledger::{Balance, Finality, SettlementLedger, TreasuryAccount};
use crate::lock::AccountLocks;

/// Outcome for one processed submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutItem {
    pub id: SubmissionId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Reward in whole tokens
    pub amount: Decimal,
    pub recipient: String,
}

/// Outcome of a `disburse` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutReport {
    pub message: String,
    pub results: Vec<PayoutItem>,
    pub successful: usize,
    pub failed: usize,
}

impl PayoutReport {
    fn from_results(results: Vec<PayoutItem>) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        let failed = results.len() - successful;
        Self {
            message: format!(
                "Payout complete: {} successful, {} failed",
                successful, failed
            ),
            results,
            successful,
            failed,
        }
    }
}

/// One would-be transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationItem {
    pub id: SubmissionId,
    pub recipient: String,
    pub amount: Decimal,
}

/// Preview of a batch, computed without side effects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub count: usize,
    /// Sum of rewards with two decimal places
    #[serde(rename = "totalAmount")]
    pub total_amount: String,
    pub items: Vec<SimulationItem>,
}

/// Payout engine
pub struct PayoutEngine {
    pub(crate) store: Arc<dyn RewardStore>,
    pub(crate) ledger: Arc<dyn SettlementLedger>,
    pub(crate) locks: AccountLocks,
}

impl PayoutEngine {
    pub fn new(store: Arc<dyn RewardStore>, ledger: Arc<dyn SettlementLedger>) -> Self {
        Self::with_locks(store, ledger, AccountLocks::new())
    }

    /// Share a lock registry with other engines paying from the same accounts
    pub fn with_locks(
        store: Arc<dyn RewardStore>,
        ledger: Arc<dyn SettlementLedger>,
        locks: AccountLocks,
    ) -> Self {
        Self {
            store,
            ledger,
            locks,
        }
    }

    pub fn ledger(&self) -> &Arc<dyn SettlementLedger> {
        &self.ledger
    }

    /// Pay every requested submission that is currently `eligible` or `winner`
    ///
    /// Ids in any other state are left out of the report. Each selected id is
    /// attempted once, in ascending id order.
    pub async fn disburse(&self, ids: &[SubmissionId]) -> EngineResult<PayoutReport> {
        if ids.is_empty() {
            return Err(EngineError::empty_selection("Submission IDs array required"));
        }

        let treasury = self.ledger.treasury().await?;
        let _guard = self.locks.acquire(&treasury.address).await;

        let selected = self.store.select_payable(ids).await?;
        if selected.is_empty() {
            return Err(EngineError::NothingToPay);
        }

        let rewards = reward_amounts(self.store.as_ref(), &selected).await?;
        let mut nonce = self.ledger.nonce(&treasury.address).await?;

        info!(
            treasury = %treasury.address,
            requested = ids.len(),
            selected = selected.len(),
            nonce,
            "Starting payout batch"
        );

        let mut results = Vec::with_capacity(selected.len());
        for submission in &selected {
            let reward = rewards.get(&submission.campaign_id).copied();
            let item = self
                .settle_one(&treasury, submission, reward, &mut nonce)
                .await;

            let outcome = if item.success { "success" } else { "failed" };
            metrics::counter!("rewards_payout_items_total", "outcome" => outcome).increment(1);
            results.push(item);
        }

        let report = PayoutReport::from_results(results);
        info!(
            successful = report.successful,
            failed = report.failed,
            "Payout batch finished"
        );
        Ok(report)
    }

    /// Settle a single submission; never fails the batch
    async fn settle_one(
        &self,
        treasury: &TreasuryAccount,
        submission: &Submission,
        reward: Option<Decimal>,
        nonce: &mut u64,
    ) -> PayoutItem {
        let recipient = submission.payout_address.clone();
        let mut item = PayoutItem {
            id: submission.id,
            success: false,
            tx_reference: None,
            error: None,
            amount: reward.unwrap_or_default(),
            recipient: recipient.clone(),
        };

        let Some(reward) = reward else {
            item.error = Some(format!("Campaign {} not found", submission.campaign_id));
            return item;
        };

        let amount = match to_base_units(&reward, TOKEN_DECIMALS) {
            Ok(amount) => amount,
            Err(e) => {
                item.error = Some(e.user_message());
                return item;
            }
        };

        let used_nonce = *nonce;
        let tx_reference = match self
            .ledger
            .submit_transfer(treasury, &recipient, amount, used_nonce)
            .await
        {
            Ok(tx) => {
                *nonce += 1;
                tx
            }
            Err(e) => {
                warn!(id = submission.id, %recipient, error = %e, "Transfer submission failed");
                match self.ledger.nonce(&treasury.address).await {
                    Ok(fresh) => *nonce = fresh,
                    Err(re) => warn!(error = %re, "Could not re-read treasury nonce"),
                }
                item.error = Some(e.to_string());
                return item;
            }
        };

        info!(
            id = submission.id,
            %recipient,
            amount,
            nonce = used_nonce,
            tx = %tx_reference,
            "Transfer submitted"
        );
        item.tx_reference = Some(tx_reference.clone());

        let attempt =
            PayoutAttempt::submitted(submission.id, &tx_reference, &recipient, amount, used_nonce);
        if let Err(e) = self.store.record_attempt(&attempt).await {
            error!(id = submission.id, tx = %tx_reference, error = %e, "Failed to journal payout attempt");
        }

        match self.ledger.wait_for_finality(&tx_reference).await {
            Ok(Finality::Confirmed) => {}
            Ok(Finality::Failed { reason }) => {
                self.resolve(submission.id, &tx_reference, AttemptOutcome::Failed, Some(reason.clone()))
                    .await;
                item.error = Some(format!("Transaction failed: {}", reason));
                return item;
            }
            Err(e) => {
                // Outcome unknown; the journal entry stays open for reconciliation
                warn!(id = submission.id, tx = %tx_reference, error = %e, "Finality wait failed");
                item.error = Some(e.to_string());
                return item;
            }
        }

        self.resolve(submission.id, &tx_reference, AttemptOutcome::Confirmed, None)
            .await;

        match self.store.mark_paid(submission.id, &tx_reference, Utc::now()).await {
            Ok(_) => {
                info!(id = submission.id, tx = %tx_reference, "Submission paid");
                item.success = true;
            }
            Err(e) => {
                error!(
                    id = submission.id,
                    tx = %tx_reference,
                    error = %e,
                    "Transfer confirmed but submission not marked paid; reconciliation required"
                );
                item.error = Some(format!("Transfer confirmed but status update failed: {}", e));
            }
        }
        item
    }

    async fn resolve(
        &self,
        submission_id: SubmissionId,
        tx_reference: &str,
        outcome: AttemptOutcome,
        error: Option<String>,
    ) {
        if let Err(e) = self
            .store
            .resolve_attempt(submission_id, tx_reference, outcome, error)
            .await
        {
            warn!(id = submission_id, tx = %tx_reference, error = %e, "Failed to resolve payout attempt");
        }
    }

    /// Preview a batch: same selection, no ledger calls, no writes
    pub async fn simulate(&self, ids: &[SubmissionId]) -> EngineResult<SimulationReport> {
        if ids.is_empty() {
            return Err(EngineError::empty_selection("Submission IDs array required"));
        }

        let selected = self.store.select_payable(ids).await?;
        let rewards = reward_amounts(self.store.as_ref(), &selected).await?;

        let items: Vec<SimulationItem> = selected
            .iter()
            .filter_map(|s| {
                Some(SimulationItem {
                    id: s.id,
                    recipient: s.payout_address.clone(),
                    amount: *rewards.get(&s.campaign_id)?,
                })
            })
            .collect();

        let total: Decimal = items.iter().map(|i| i.amount).sum();
        let total = total.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        Ok(SimulationReport {
            count: items.len(),
            total_amount: format!("{:.2}", total),
            items,
        })
    }

    /// Treasury balance on the latest accepted block
    pub async fn balance(&self) -> EngineResult<Balance> {
        let treasury = self.ledger.treasury().await?;
        let raw = self.ledger.balance(&treasury.address).await?;
        Ok(Balance::new(treasury.address, raw))
    }
}

/// Reward per campaign referenced by `submissions`
pub(crate) async fn reward_amounts(
    store: &dyn RewardStore,
    submissions: &[Submission],
) -> EngineResult<HashMap<CampaignId, Decimal>> {
    let mut rewards = HashMap::new();
    for submission in submissions {
        if rewards.contains_key(&submission.campaign_id) {
            continue;
        }
        if let Some(campaign) = store.get_campaign(submission.campaign_id).await? {
            rewards.insert(campaign.id, campaign.reward_amount);
        }
    }
    Ok(rewards)
}
