//! Submission Types
//!
//! A submission is a claim that one content item satisfies a campaign's
//! reward criteria. Its lifecycle is governed by [`SubmissionStatus`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::metrics::EngagementMetrics;
use crate::error::{CoreError, CoreResult};

/// Submission identifier
pub type SubmissionId = u64;

/// Submission lifecycle status
///
/// ```text
/// pending ──► eligible ──► winner ──► paid
///    │           │                     ▲
///    ▼           └─────────────────────┘
/// rejected
/// ```
///
/// `paid` and `rejected` are terminal. `paid` is only entered through a
/// confirmed settlement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Manual holding state, only reachable by operator override
    Pending,
    /// Metrics cleared the campaign thresholds
    Eligible,
    /// Selected by an operator for payout
    Winner,
    /// Reward transfer confirmed on chain
    Paid,
    /// Metrics did not clear the thresholds
    Rejected,
}

impl SubmissionStatus {
    /// All status values, in display order
    pub const ALL: [SubmissionStatus; 5] = [
        SubmissionStatus::Pending,
        SubmissionStatus::Eligible,
        SubmissionStatus::Winner,
        SubmissionStatus::Paid,
        SubmissionStatus::Rejected,
    ];

    /// Status assigned at creation from the eligibility verdict
    pub fn initial(eligible: bool) -> Self {
        if eligible {
            SubmissionStatus::Eligible
        } else {
            SubmissionStatus::Rejected
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Eligible => "eligible",
            SubmissionStatus::Winner => "winner",
            SubmissionStatus::Paid => "paid",
            SubmissionStatus::Rejected => "rejected",
        }
    }

    /// Check if status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionStatus::Paid | SubmissionStatus::Rejected)
    }

    /// Whether a payout batch may select a submission in this status
    pub fn is_payable(&self) -> bool {
        matches!(self, SubmissionStatus::Eligible | SubmissionStatus::Winner)
    }

    /// Lifecycle transitions from the current status
    pub fn valid_transitions(&self) -> Vec<SubmissionStatus> {
        match self {
            SubmissionStatus::Pending => {
                vec![SubmissionStatus::Eligible, SubmissionStatus::Rejected]
            }
            SubmissionStatus::Eligible => vec![SubmissionStatus::Winner, SubmissionStatus::Paid],
            SubmissionStatus::Winner => vec![SubmissionStatus::Paid],
            SubmissionStatus::Paid | SubmissionStatus::Rejected => vec![],
        }
    }

    /// Check if a lifecycle transition to `target` is valid
    pub fn can_transition_to(&self, target: &SubmissionStatus) -> bool {
        self.valid_transitions().contains(target)
    }

    /// Check if an operator may force this status to `target`
    ///
    /// Terminal states cannot be overridden and `paid` can never be forced.
    pub fn can_override_to(&self, target: &SubmissionStatus) -> bool {
        !self.is_terminal() && *target != SubmissionStatus::Paid
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SubmissionStatus::Pending),
            "eligible" => Ok(SubmissionStatus::Eligible),
            "winner" => Ok(SubmissionStatus::Winner),
            "paid" => Ok(SubmissionStatus::Paid),
            "rejected" => Ok(SubmissionStatus::Rejected),
            other => Err(CoreError::invalid_status(other)),
        }
    }
}

/// A persisted submission
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub campaign_id: u64,
    /// Platform content identifier, globally unique
    pub content_id: String,
    pub content_url: String,
    /// Opaque external account id of the submitter
    pub submitter_identity: String,
    pub submitter_username: Option<String>,
    /// Chain address receiving the reward
    pub payout_address: String,
    /// Metrics snapshot taken at evaluation time
    pub metrics: EngagementMetrics,
    pub status: SubmissionStatus,
    /// Settlement transaction, set only when paid
    pub tx_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Submission {
    /// Build a row from an insert payload
    pub fn from_new(id: SubmissionId, new: NewSubmission, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            campaign_id: new.campaign_id,
            content_id: new.content_id,
            content_url: new.content_url,
            submitter_identity: new.submitter_identity,
            submitter_username: new.submitter_username,
            payout_address: new.payout_address,
            metrics: new.metrics,
            status: new.status,
            tx_reference: None,
            created_at,
            paid_at: None,
        }
    }

    /// Record a confirmed settlement
    pub fn mark_paid(&mut self, tx_reference: impl Into<String>, paid_at: DateTime<Utc>) -> CoreResult<()> {
        if !self.status.can_transition_to(&SubmissionStatus::Paid) {
            return Err(CoreError::InvalidTransition {
                from: self.status.to_string(),
                to: SubmissionStatus::Paid.to_string(),
            });
        }
        self.status = SubmissionStatus::Paid;
        self.tx_reference = Some(tx_reference.into());
        self.paid_at = Some(paid_at);
        Ok(())
    }

    /// Apply an operator status override
    ///
    /// Returns `Ok(false)` when the submission already has `target`.
    pub fn apply_override(&mut self, target: SubmissionStatus) -> CoreResult<bool> {
        if self.status == target {
            return Ok(false);
        }
        if !self.status.can_override_to(&target) {
            return Err(CoreError::InvalidTransition {
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }
        self.status = target;
        Ok(true)
    }
}

/// Insert payload for a submission
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewSubmission {
    pub campaign_id: u64,
    pub content_id: String,
    pub content_url: String,
    pub submitter_identity: String,
    pub submitter_username: Option<String>,
    pub payout_address: String,
    pub metrics: EngagementMetrics,
    pub status: SubmissionStatus,
}

/// Submission joined with its campaign's display fields
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmissionView {
    #[serde(flatten)]
    pub submission: Submission,
    pub campaign_name: String,
    pub reward_amount: Decimal,
}

/// Filter for listing submissions
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SubmissionFilter {
    pub campaign_id: Option<u64>,
    pub status: Option<SubmissionStatus>,
}

impl SubmissionFilter {
    pub fn matches(&self, submission: &Submission) -> bool {
        self.campaign_id.map_or(true, |id| submission.campaign_id == id)
            && self.status.map_or(true, |s| submission.status == s)
    }
}

/// Per-status submission counts
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionStats {
    pub total: u64,
    pub pending: u64,
    pub eligible: u64,
    pub winners: u64,
    pub paid: u64,
    pub rejected: u64,
}

impl SubmissionStats {
    /// Count one submission
    pub fn record(&mut self, status: SubmissionStatus) {
        self.total += 1;
        match status {
            SubmissionStatus::Pending => self.pending += 1,
            SubmissionStatus::Eligible => self.eligible += 1,
            SubmissionStatus::Winner => self.winners += 1,
            SubmissionStatus::Paid => self.paid += 1,
            SubmissionStatus::Rejected => self.rejected += 1,
        }
    }
}
