//! Payout attempt journal entries
//!
//! A journal entry is written as soon as a transfer obtains a transaction
//! reference, before finality is awaited, so an interrupted batch still
//! leaves a local trace of the in-flight transfer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::submission::SubmissionId;

/// Outcome of a journaled transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Accepted by the chain, finality not yet observed
    Submitted,
    /// Finality confirmed
    Confirmed,
    /// Reverted, rejected, or finality wait failed
    Failed,
}

/// One submitted transfer for a submission
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutAttempt {
    pub submission_id: SubmissionId,
    pub tx_reference: String,
    pub recipient: String,
    /// Base-unit amount as a decimal string
    pub amount_raw: String,
    pub nonce: u64,
    pub outcome: AttemptOutcome,
    pub error: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl PayoutAttempt {
    pub fn submitted(
        submission_id: SubmissionId,
        tx_reference: impl Into<String>,
        recipient: impl Into<String>,
        amount_raw: u128,
        nonce: u64,
    ) -> Self {
        Self {
            submission_id,
            tx_reference: tx_reference.into(),
            recipient: recipient.into(),
            amount_raw: amount_raw.to_string(),
            nonce,
            outcome: AttemptOutcome::Submitted,
            error: None,
            submitted_at: Utc::now(),
            resolved_at: None,
        }
    }

    /// Whether the chain outcome of this attempt is still unknown locally
    pub fn is_unresolved(&self) -> bool {
        self.outcome != AttemptOutcome::Confirmed
    }

    pub fn resolve(&mut self, outcome: AttemptOutcome, error: Option<String>) {
        self.outcome = outcome;
        self.error = error;
        self.resolved_at = Some(Utc::now());
    }
}
