//! Reconciliation
//!
//! Finds payable submissions whose transfer already settled on chain.
//! Two sources are consulted, in order:
//!
//! 1. the local payout journal, re-checking each recorded transaction
//! 2. the treasury's recent outbound transfers, matched on recipient and
//!    exact base-unit amount
//!
//! With `repair` set, every match is marked paid with the matched reference.

use chrono::Utc;
use reward_core::{normalize_address, to_base_units, AttemptOutcome, Submission, SubmissionId, TOKEN_DECIMALS};
use reward_store::{PayoutAttemptRepository, SubmissionRepository};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::error::EngineResult;
use crate::ledger::{TransferRecord, TxStatus};
use crate::payout::{reward_amounts, PayoutEngine};

/// Where a match was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Journal,
    ChainHistory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileMatch {
    pub submission_id: SubmissionId,
    pub recipient: String,
    pub amount: Decimal,
    pub tx_reference: String,
    pub source: MatchSource,
    /// Whether the submission was marked paid by this run
    pub repaired: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub checked: usize,
    pub matches: Vec<ReconcileMatch>,
    pub unmatched: Vec<SubmissionId>,
}

struct Candidate {
    submission: Submission,
    reward: Decimal,
    raw: u128,
}

impl PayoutEngine {
    /// Compare payable submissions against journal and chain history
    ///
    /// Holds the treasury lock for the whole run, so it never overlaps a
    /// disbursement from the same account.
    pub async fn reconcile(&self, repair: bool) -> EngineResult<ReconcileReport> {
        let treasury = self.ledger.treasury().await?;
        let _guard = self.locks.acquire(&treasury.address).await;

        let payable = self.store.list_payable().await?;
        let rewards = reward_amounts(self.store.as_ref(), &payable).await?;
        let checked = payable.len();

        let mut candidates = Vec::with_capacity(payable.len());
        for submission in payable {
            let Some(reward) = rewards.get(&submission.campaign_id).copied() else {
                warn!(id = submission.id, "Skipping submission without campaign");
                continue;
            };
            let raw = match to_base_units(&reward, TOKEN_DECIMALS) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(id = submission.id, %reward, error = %e, "Skipping submission with unpayable reward");
                    continue;
                }
            };
            candidates.push(Candidate {
                submission,
                reward,
                raw,
            });
        }

        let mut used: HashSet<String> = HashSet::new();
        let mut matches = Vec::new();
        let mut remaining = Vec::new();

        for candidate in candidates {
            match self.journal_match(&candidate.submission).await? {
                Some(tx_reference) => {
                    used.insert(tx_reference.clone());
                    matches.push(found(&candidate, tx_reference, MatchSource::Journal));
                }
                None => remaining.push(candidate),
            }
        }

        let mut unmatched = Vec::new();
        if !remaining.is_empty() {
            let history = self.ledger.recent_transfers(&treasury.address).await?;
            for candidate in remaining {
                match self.history_match(&candidate, &history, &used).await? {
                    Some(tx_reference) => {
                        used.insert(tx_reference.clone());
                        matches.push(found(&candidate, tx_reference, MatchSource::ChainHistory));
                    }
                    None => unmatched.push(candidate.submission.id),
                }
            }
        }

        if repair {
            for m in &mut matches {
                self.repair(m).await;
            }
        }

        matches.sort_by_key(|m| m.submission_id);
        unmatched.sort_unstable();

        info!(
            checked,
            matched = matches.len(),
            unmatched = unmatched.len(),
            repair,
            "Reconciliation finished"
        );
        Ok(ReconcileReport {
            checked,
            matches,
            unmatched,
        })
    }

    /// Newest journaled transaction for `submission` that is now confirmed
    async fn journal_match(&self, submission: &Submission) -> EngineResult<Option<String>> {
        let attempts = self.store.attempts_for(submission.id).await?;
        for attempt in attempts.iter().rev() {
            match self.ledger.transaction_status(&attempt.tx_reference).await {
                Ok(TxStatus::Confirmed) => return Ok(Some(attempt.tx_reference.clone())),
                Ok(_) => {}
                Err(e) => {
                    warn!(id = submission.id, tx = %attempt.tx_reference, error = %e, "Journal status check failed");
                }
            }
        }
        Ok(None)
    }

    async fn history_match(
        &self,
        candidate: &Candidate,
        history: &[TransferRecord],
        used: &HashSet<String>,
    ) -> EngineResult<Option<String>> {
        let recipient = normalize_address(&candidate.submission.payout_address);
        for transfer in history {
            if used.contains(&transfer.tx_reference)
                || transfer.amount_raw != candidate.raw
                || normalize_address(&transfer.recipient) != recipient
            {
                continue;
            }
            if self
                .store
                .find_by_tx_reference(&transfer.tx_reference)
                .await?
                .is_some()
            {
                continue;
            }
            return Ok(Some(transfer.tx_reference.clone()));
        }
        Ok(None)
    }

    async fn repair(&self, m: &mut ReconcileMatch) {
        match self
            .store
            .mark_paid(m.submission_id, &m.tx_reference, Utc::now())
            .await
        {
            Ok(_) => {
                m.repaired = true;
                info!(id = m.submission_id, tx = %m.tx_reference, "Submission repaired as paid");
                if m.source == MatchSource::Journal {
                    if let Err(e) = self
                        .store
                        .resolve_attempt(m.submission_id, &m.tx_reference, AttemptOutcome::Confirmed, None)
                        .await
                    {
                        warn!(id = m.submission_id, error = %e, "Failed to resolve payout attempt");
                    }
                }
            }
            Err(e) => {
                warn!(id = m.submission_id, tx = %m.tx_reference, error = %e, "Repair failed");
            }
        }
    }
}

fn found(candidate: &Candidate, tx_reference: String, source: MatchSource) -> ReconcileMatch {
    ReconcileMatch {
        submission_id: candidate.submission.id,
        recipient: candidate.submission.payout_address.clone(),
        amount: candidate.reward,
        tx_reference,
        source,
        repaired: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{MockLedger, SettlementLedger};
    use reward_core::{EngagementMetrics, NewCampaign, NewSubmission, PayoutAttempt, SubmissionStatus};
    use reward_store::{CampaignRepository, MemoryStore};
    use std::sync::Arc;

    const TREASURY: &str = "0xa11ce";
    const ONE_TOKEN: u128 = 1_000_000_000_000_000_000;

    async fn setup() -> (PayoutEngine, Arc<MemoryStore>, Arc<MockLedger>, Vec<SubmissionId>) {
        let store = Arc::new(MemoryStore::new());
        let campaign = store
            .create_campaign(NewCampaign::new("Launch", Decimal::ONE).unwrap())
            .await
            .unwrap();
        let mut ids = Vec::new();
        for (n, wallet) in ["0xaaa", "0xbbb", "0xccc"].iter().enumerate() {
            let submission = store
                .insert_submission(NewSubmission {
                    campaign_id: campaign.id,
                    content_id: format!("7{}", n),
                    content_url: format!("https://www.tiktok.com/@u/video/7{}", n),
                    submitter_identity: "open-1".to_string(),
                    submitter_username: None,
                    payout_address: wallet.to_string(),
                    metrics: EngagementMetrics::zero(),
                    status: SubmissionStatus::Eligible,
                })
                .await
                .unwrap();
            ids.push(submission.id);
        }
        let ledger = Arc::new(MockLedger::new(TREASURY));
        let engine = PayoutEngine::new(store.clone(), ledger.clone());
        (engine, store, ledger, ids)
    }

    #[tokio::test]
    async fn test_nothing_settled() {
        let (engine, _, _, ids) = setup().await;
        let report = engine.reconcile(false).await.unwrap();
        assert_eq!(report.checked, 3);
        assert!(report.matches.is_empty());
        assert_eq!(report.unmatched, ids);
    }

    #[tokio::test]
    async fn test_journal_match_after_lost_finality() {
        let (engine, store, ledger, ids) = setup().await;
        ledger.hold_finality(true).await;
        let report = engine.disburse(&ids[..1]).await.unwrap();
        assert_eq!(report.failed, 1);
        ledger.hold_finality(false).await;

        let dry = engine.reconcile(false).await.unwrap();
        assert_eq!(dry.matches.len(), 1);
        assert_eq!(dry.matches[0].source, MatchSource::Journal);
        assert!(!dry.matches[0].repaired);
        let row = store.get_submission(ids[0]).await.unwrap().unwrap();
        assert_eq!(row.status, SubmissionStatus::Eligible);

        let fixed = engine.reconcile(true).await.unwrap();
        assert!(fixed.matches[0].repaired);
        let row = store.get_submission(ids[0]).await.unwrap().unwrap();
        assert_eq!(row.status, SubmissionStatus::Paid);
        assert_eq!(row.tx_reference.as_deref(), Some(fixed.matches[0].tx_reference.as_str()));

        let attempts = store.attempts_for(ids[0]).await.unwrap();
        assert_eq!(attempts[0].outcome, AttemptOutcome::Confirmed);
    }

    #[tokio::test]
    async fn test_chain_history_match() {
        let (engine, store, ledger, ids) = setup().await;
        let tx = ledger.inject_transfer("0x0BBB", ONE_TOKEN).await;
        ledger.inject_transfer("0xccc", ONE_TOKEN / 2).await;

        let report = engine.reconcile(true).await.unwrap();
        assert_eq!(report.matches.len(), 1);
        let m = &report.matches[0];
        assert_eq!(m.submission_id, ids[1]);
        assert_eq!(m.source, MatchSource::ChainHistory);
        assert_eq!(m.tx_reference, tx);
        assert_eq!(m.amount, Decimal::ONE);
        assert_eq!(report.unmatched, vec![ids[0], ids[2]]);

        let row = store.get_submission(ids[1]).await.unwrap().unwrap();
        assert_eq!(row.status, SubmissionStatus::Paid);
    }

    #[tokio::test]
    async fn test_unpayable_reward_does_not_abort() {
        let (engine, store, ledger, ids) = setup().await;
        let dust = store
            .create_campaign(NewCampaign {
                reward_amount: Decimal::new(1, 19),
                ..NewCampaign::seed()
            })
            .await
            .unwrap();
        let stray = store
            .insert_submission(NewSubmission {
                campaign_id: dust.id,
                content_id: "99".to_string(),
                content_url: "https://www.tiktok.com/@u/video/99".to_string(),
                submitter_identity: "open-2".to_string(),
                submitter_username: None,
                payout_address: "0xddd".to_string(),
                metrics: EngagementMetrics::zero(),
                status: SubmissionStatus::Winner,
            })
            .await
            .unwrap();
        ledger.inject_transfer("0xbbb", ONE_TOKEN).await;

        let report = engine.reconcile(false).await.unwrap();
        assert_eq!(report.checked, 4);
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].submission_id, ids[1]);
        assert_eq!(report.unmatched, vec![ids[0], ids[2]]);
        assert!(!report.unmatched.contains(&stray.id));
    }

    #[tokio::test]
    async fn test_transfer_used_once() {
        let (engine, store, ledger, ids) = setup().await;
        // Same wallet on two rows, one matching transfer
        let campaign_id = store.get_submission(ids[0]).await.unwrap().unwrap().campaign_id;
        let twin = store
            .insert_submission(NewSubmission {
                campaign_id,
                content_id: "99".to_string(),
                content_url: "https://www.tiktok.com/@u/video/99".to_string(),
                submitter_identity: "open-2".to_string(),
                submitter_username: None,
                payout_address: "0xaaa".to_string(),
                metrics: EngagementMetrics::zero(),
                status: SubmissionStatus::Winner,
            })
            .await
            .unwrap();
        ledger.inject_transfer("0xaaa", ONE_TOKEN).await;

        let report = engine.reconcile(false).await.unwrap();
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].submission_id, ids[0]);
        assert!(report.unmatched.contains(&twin.id));
    }

    #[tokio::test]
    async fn test_paid_transfers_are_ignored() {
        let (engine, store, ledger, ids) = setup().await;
        let tx = ledger.inject_transfer("0xaaa", ONE_TOKEN).await;
        let paid = store.get_submission(ids[0]).await.unwrap().unwrap();
        store.mark_paid(paid.id, &tx, Utc::now()).await.unwrap();

        // A second row for the same wallet must not claim the paid transfer
        let twin = store
            .insert_submission(NewSubmission {
                campaign_id: paid.campaign_id,
                content_id: "99".to_string(),
                content_url: "https://www.tiktok.com/@u/video/99".to_string(),
                submitter_identity: "open-2".to_string(),
                submitter_username: None,
                payout_address: "0xaaa".to_string(),
                metrics: EngagementMetrics::zero(),
                status: SubmissionStatus::Eligible,
            })
            .await
            .unwrap();

        let next = ledger.nonce(TREASURY).await.unwrap();
        store
            .record_attempt(&PayoutAttempt::submitted(ids[1], "0xdead", "0xbbb", ONE_TOKEN, next))
            .await
            .unwrap();

        let report = engine.reconcile(true).await.unwrap();
        assert_eq!(report.checked, 3);
        assert!(report.matches.is_empty());
        assert_eq!(report.unmatched, vec![ids[1], ids[2], twin.id]);
    }
}
