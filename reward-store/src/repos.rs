//! Repository Traits
//!
//! Data access contracts shared by the in-memory and sled backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reward_core::{
    AttemptOutcome, Campaign, CampaignId, CampaignPatch, NewCampaign, NewSession, NewSubmission,
    PayoutAttempt, Session, Submission, SubmissionFilter, SubmissionId, SubmissionStats,
    SubmissionStatus,
};

use crate::error::{StoreError, StoreResult};

/// Campaign repository
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    /// Insert a campaign and assign its id
    async fn create_campaign(&self, new: NewCampaign) -> StoreResult<Campaign>;

    async fn get_campaign(&self, id: CampaignId) -> StoreResult<Option<Campaign>>;

    /// Get campaign by ID, error if not found
    async fn get_campaign_required(&self, id: CampaignId) -> StoreResult<Campaign> {
        self.get_campaign(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Campaign", id))
    }

    /// All campaigns, highest id first
    async fn list_campaigns(&self) -> StoreResult<Vec<Campaign>>;

    /// The active campaign with the highest id
    async fn active_campaign(&self) -> StoreResult<Option<Campaign>> {
        Ok(self
            .list_campaigns()
            .await?
            .into_iter()
            .find(|c| c.is_active))
    }

    /// Apply a partial update
    async fn update_campaign(&self, id: CampaignId, patch: CampaignPatch) -> StoreResult<Campaign>;

    /// Delete a campaign and its submissions, returning the number of
    /// submissions removed
    async fn delete_campaign(&self, id: CampaignId) -> StoreResult<u64>;

    async fn count_campaigns(&self) -> StoreResult<u64>;
}

/// Submission repository
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// Insert a submission; fails with `Duplicate` if the content id exists
    async fn insert_submission(&self, new: NewSubmission) -> StoreResult<Submission>;

    async fn get_submission(&self, id: SubmissionId) -> StoreResult<Option<Submission>>;

    /// Get submission by ID, error if not found
    async fn get_submission_required(&self, id: SubmissionId) -> StoreResult<Submission> {
        self.get_submission(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Submission", id))
    }

    async fn find_by_content_id(&self, content_id: &str) -> StoreResult<Option<Submission>>;

    /// Paid submission carrying this settlement transaction
    async fn find_by_tx_reference(&self, tx_reference: &str) -> StoreResult<Option<Submission>>;

    /// Submissions matching the filter, newest first
    async fn list_submissions(&self, filter: &SubmissionFilter) -> StoreResult<Vec<Submission>>;

    /// Requested ids currently in `eligible` or `winner`, ascending by id
    ///
    /// Unknown ids and ids in any other status are left out.
    async fn select_payable(&self, ids: &[SubmissionId]) -> StoreResult<Vec<Submission>>;

    /// Every submission in `eligible` or `winner`
    async fn list_payable(&self) -> StoreResult<Vec<Submission>> {
        let mut payable = Vec::new();
        for status in [SubmissionStatus::Eligible, SubmissionStatus::Winner] {
            let filter = SubmissionFilter {
                campaign_id: None,
                status: Some(status),
            };
            payable.extend(self.list_submissions(&filter).await?);
        }
        payable.sort_by_key(|s| s.id);
        Ok(payable)
    }

    /// Force a status through the operator override rules
    async fn override_status(
        &self,
        id: SubmissionId,
        status: SubmissionStatus,
    ) -> StoreResult<Submission>;

    /// Atomically set `paid`, the transaction reference and the payment time
    ///
    /// Fails with `InvalidState` unless the row is currently payable.
    async fn mark_paid(
        &self,
        id: SubmissionId,
        tx_reference: &str,
        paid_at: DateTime<Utc>,
    ) -> StoreResult<Submission>;

    async fn submission_stats(&self) -> StoreResult<SubmissionStats>;
}

/// Session repository
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Store a session under a fresh opaque id
    async fn create_session(&self, new: NewSession) -> StoreResult<Session>;

    async fn get_session(&self, id: &str) -> StoreResult<Option<Session>>;

    /// Returns whether a session was removed
    async fn delete_session(&self, id: &str) -> StoreResult<bool>;
}

/// Payout attempt journal
#[async_trait]
pub trait PayoutAttemptRepository: Send + Sync {
    async fn record_attempt(&self, attempt: &PayoutAttempt) -> StoreResult<()>;

    /// Resolve the attempt identified by its transaction reference
    async fn resolve_attempt(
        &self,
        submission_id: SubmissionId,
        tx_reference: &str,
        outcome: AttemptOutcome,
        error: Option<String>,
    ) -> StoreResult<()>;

    /// Attempts for a submission, oldest first
    async fn attempts_for(&self, submission_id: SubmissionId) -> StoreResult<Vec<PayoutAttempt>>;
}

/// Every repository behind one handle
pub trait RewardStore:
    CampaignRepository + SubmissionRepository + SessionRepository + PayoutAttemptRepository
{
}

impl<T> RewardStore for T where
    T: CampaignRepository + SubmissionRepository + SessionRepository + PayoutAttemptRepository
{
}
