//! In-memory store
//!
//! All tables live behind one lock so that index checks and writes happen
//! in the same critical section. Used for tests and ephemeral runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reward_core::{
    AttemptOutcome, Campaign, CampaignId, CampaignPatch, NewCampaign, NewSession, NewSubmission,
    PayoutAttempt, Session, Submission, SubmissionFilter, SubmissionId, SubmissionStats,
    SubmissionStatus,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::repos::{
    CampaignRepository, PayoutAttemptRepository, SessionRepository, SubmissionRepository,
};

#[derive(Debug, Default)]
struct Tables {
    campaigns: BTreeMap<CampaignId, Campaign>,
    submissions: BTreeMap<SubmissionId, Submission>,
    sessions: HashMap<String, Session>,
    attempts: HashMap<SubmissionId, Vec<PayoutAttempt>>,
    // Indexes
    content_index: HashMap<String, SubmissionId>,
    tx_index: HashMap<String, SubmissionId>,
    next_campaign_id: u64,
    next_submission_id: u64,
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data
    pub async fn clear(&self) {
        *self.tables.write().await = Tables::default();
    }
}

#[async_trait]
impl CampaignRepository for MemoryStore {
    async fn create_campaign(&self, new: NewCampaign) -> StoreResult<Campaign> {
        let mut tables = self.tables.write().await;
        tables.next_campaign_id += 1;
        let campaign = Campaign::from_new(tables.next_campaign_id, new, Utc::now());
        tables.campaigns.insert(campaign.id, campaign.clone());
        Ok(campaign)
    }

    async fn get_campaign(&self, id: CampaignId) -> StoreResult<Option<Campaign>> {
        Ok(self.tables.read().await.campaigns.get(&id).cloned())
    }

    async fn list_campaigns(&self) -> StoreResult<Vec<Campaign>> {
        let tables = self.tables.read().await;
        Ok(tables.campaigns.values().rev().cloned().collect())
    }

    async fn update_campaign(&self, id: CampaignId, patch: CampaignPatch) -> StoreResult<Campaign> {
        let mut tables = self.tables.write().await;
        let campaign = tables
            .campaigns
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Campaign", id))?;
        let mut updated = campaign.clone();
        updated.apply_patch(patch)?;
        *campaign = updated.clone();
        Ok(updated)
    }

    async fn delete_campaign(&self, id: CampaignId) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        if tables.campaigns.remove(&id).is_none() {
            return Err(StoreError::not_found("Campaign", id));
        }

        let doomed: Vec<Submission> = tables
            .submissions
            .values()
            .filter(|s| s.campaign_id == id)
            .cloned()
            .collect();
        for submission in &doomed {
            tables.submissions.remove(&submission.id);
            tables.content_index.remove(&submission.content_id);
            tables.attempts.remove(&submission.id);
            if let Some(tx) = &submission.tx_reference {
                tables.tx_index.remove(tx);
            }
        }
        Ok(doomed.len() as u64)
    }

    async fn count_campaigns(&self) -> StoreResult<u64> {
        Ok(self.tables.read().await.campaigns.len() as u64)
    }
}

#[async_trait]
impl SubmissionRepository for MemoryStore {
    async fn insert_submission(&self, new: NewSubmission) -> StoreResult<Submission> {
        let mut tables = self.tables.write().await;
        if tables.content_index.contains_key(&new.content_id) {
            return Err(StoreError::duplicate("Submission", &new.content_id));
        }
        tables.next_submission_id += 1;
        let submission = Submission::from_new(tables.next_submission_id, new, Utc::now());
        tables
            .content_index
            .insert(submission.content_id.clone(), submission.id);
        tables.submissions.insert(submission.id, submission.clone());
        Ok(submission)
    }

    async fn get_submission(&self, id: SubmissionId) -> StoreResult<Option<Submission>> {
        Ok(self.tables.read().await.submissions.get(&id).cloned())
    }

    async fn find_by_content_id(&self, content_id: &str) -> StoreResult<Option<Submission>> {
        let tables = self.tables.read().await;
        Ok(tables
            .content_index
            .get(content_id)
            .and_then(|id| tables.submissions.get(id))
            .cloned())
    }

    async fn find_by_tx_reference(&self, tx_reference: &str) -> StoreResult<Option<Submission>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tx_index
            .get(tx_reference)
            .and_then(|id| tables.submissions.get(id))
            .cloned())
    }

    async fn list_submissions(&self, filter: &SubmissionFilter) -> StoreResult<Vec<Submission>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Submission> = tables
            .submissions
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn select_payable(&self, ids: &[SubmissionId]) -> StoreResult<Vec<Submission>> {
        let tables = self.tables.read().await;
        let mut wanted: Vec<SubmissionId> = ids.to_vec();
        wanted.sort_unstable();
        wanted.dedup();
        Ok(wanted
            .iter()
            .filter_map(|id| tables.submissions.get(id))
            .filter(|s| s.status.is_payable())
            .cloned()
            .collect())
    }

    async fn override_status(
        &self,
        id: SubmissionId,
        status: SubmissionStatus,
    ) -> StoreResult<Submission> {
        let mut tables = self.tables.write().await;
        let submission = tables
            .submissions
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Submission", id))?;
        submission.apply_override(status)?;
        Ok(submission.clone())
    }

    async fn mark_paid(
        &self,
        id: SubmissionId,
        tx_reference: &str,
        paid_at: DateTime<Utc>,
    ) -> StoreResult<Submission> {
        let mut tables = self.tables.write().await;
        let submission = tables
            .submissions
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Submission", id))?;
        if !submission.status.is_payable() {
            return Err(StoreError::invalid_state(format!(
                "submission {} is {}, not payable",
                id, submission.status
            )));
        }
        submission.mark_paid(tx_reference, paid_at)?;
        let updated = submission.clone();
        tables.tx_index.insert(tx_reference.to_string(), id);
        Ok(updated)
    }

    async fn submission_stats(&self) -> StoreResult<SubmissionStats> {
        let tables = self.tables.read().await;
        let mut stats = SubmissionStats::default();
        for submission in tables.submissions.values() {
            stats.record(submission.status);
        }
        Ok(stats)
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn create_session(&self, new: NewSession) -> StoreResult<Session> {
        let session = Session::from_new(uuid::Uuid::new_v4().to_string(), new, Utc::now());
        self.tables
            .write()
            .await
            .sessions
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: &str) -> StoreResult<Option<Session>> {
        Ok(self.tables.read().await.sessions.get(id).cloned())
    }

    async fn delete_session(&self, id: &str) -> StoreResult<bool> {
        Ok(self.tables.write().await.sessions.remove(id).is_some())
    }
}

#[async_trait]
impl PayoutAttemptRepository for MemoryStore {
    async fn record_attempt(&self, attempt: &PayoutAttempt) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .attempts
            .entry(attempt.submission_id)
            .or_default()
            .push(attempt.clone());
        Ok(())
    }

    async fn resolve_attempt(
        &self,
        submission_id: SubmissionId,
        tx_reference: &str,
        outcome: AttemptOutcome,
        error: Option<String>,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let attempt = tables
            .attempts
            .get_mut(&submission_id)
            .and_then(|list| list.iter_mut().find(|a| a.tx_reference == tx_reference))
            .ok_or_else(|| StoreError::not_found("PayoutAttempt", tx_reference))?;
        attempt.resolve(outcome, error);
        Ok(())
    }

    async fn attempts_for(&self, submission_id: SubmissionId) -> StoreResult<Vec<PayoutAttempt>> {
        Ok(self
            .tables
            .read()
            .await
            .attempts
            .get(&submission_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reward_core::{EngagementMetrics, Thresholds};
    use rust_decimal::Decimal;

    fn new_submission(campaign_id: u64, content_id: &str, status: SubmissionStatus) -> NewSubmission {
        NewSubmission {
            campaign_id,
            content_id: content_id.to_string(),
            content_url: format!("https://www.tiktok.com/@u/video/{}", content_id),
            submitter_identity: "open-1".to_string(),
            submitter_username: Some("user".to_string()),
            payout_address: "0xabc".to_string(),
            metrics: EngagementMetrics::new(2000, 100, 3, 1),
            status,
        }
    }

    #[tokio::test]
    async fn test_content_id_unique() {
        let store = MemoryStore::new();
        store
            .insert_submission(new_submission(1, "100", SubmissionStatus::Eligible))
            .await
            .unwrap();

        let mut second = new_submission(1, "100", SubmissionStatus::Eligible);
        second.submitter_identity = "open-2".to_string();
        let err = store.insert_submission(second).await.unwrap_err();
        assert!(err.is_duplicate());

        let stored = store.find_by_content_id("100").await.unwrap().unwrap();
        assert_eq!(stored.submitter_identity, "open-1");
    }

    #[tokio::test]
    async fn test_select_payable_filters_status() {
        let store = MemoryStore::new();
        let a = store
            .insert_submission(new_submission(1, "1", SubmissionStatus::Eligible))
            .await
            .unwrap();
        let b = store
            .insert_submission(new_submission(1, "2", SubmissionStatus::Rejected))
            .await
            .unwrap();
        let c = store
            .insert_submission(new_submission(1, "3", SubmissionStatus::Eligible))
            .await
            .unwrap();
        store.override_status(c.id, SubmissionStatus::Winner).await.unwrap();

        let selected = store.select_payable(&[c.id, b.id, a.id, a.id, 999]).await.unwrap();
        let ids: Vec<u64> = selected.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![a.id, c.id]);
    }

    #[tokio::test]
    async fn test_mark_paid_once() {
        let store = MemoryStore::new();
        let a = store
            .insert_submission(new_submission(1, "1", SubmissionStatus::Eligible))
            .await
            .unwrap();

        let paid = store.mark_paid(a.id, "0xtx1", Utc::now()).await.unwrap();
        assert_eq!(paid.status, SubmissionStatus::Paid);

        let err = store.mark_paid(a.id, "0xtx2", Utc::now()).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidState { .. }));

        let by_tx = store.find_by_tx_reference("0xtx1").await.unwrap().unwrap();
        assert_eq!(by_tx.id, a.id);
        assert!(store.find_by_tx_reference("0xtx2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_override_cannot_touch_paid() {
        let store = MemoryStore::new();
        let a = store
            .insert_submission(new_submission(1, "1", SubmissionStatus::Eligible))
            .await
            .unwrap();
        store.mark_paid(a.id, "0xtx", Utc::now()).await.unwrap();

        assert!(store
            .override_status(a.id, SubmissionStatus::Eligible)
            .await
            .is_err());
        let row = store.get_submission_required(a.id).await.unwrap();
        assert_eq!(row.status, SubmissionStatus::Paid);
    }

    #[tokio::test]
    async fn test_active_campaign_highest_id() {
        let store = MemoryStore::new();
        let first = store
            .create_campaign(NewCampaign::new("first", Decimal::from(1)).unwrap())
            .await
            .unwrap();
        let second = store
            .create_campaign(NewCampaign::new("second", Decimal::from(2)).unwrap())
            .await
            .unwrap();
        assert_eq!(store.active_campaign().await.unwrap().unwrap().id, second.id);

        store
            .update_campaign(
                second.id,
                CampaignPatch {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(store.active_campaign().await.unwrap().unwrap().id, first.id);
    }

    #[tokio::test]
    async fn test_delete_campaign_cascades() {
        let store = MemoryStore::new();
        let campaign = store
            .create_campaign(
                NewCampaign::new("c", Decimal::from(1))
                    .unwrap()
                    .with_thresholds(Thresholds::new(1, 1, 0, 0)),
            )
            .await
            .unwrap();
        store
            .insert_submission(new_submission(campaign.id, "1", SubmissionStatus::Eligible))
            .await
            .unwrap();
        store
            .insert_submission(new_submission(campaign.id + 1, "2", SubmissionStatus::Eligible))
            .await
            .unwrap();

        assert_eq!(store.delete_campaign(campaign.id).await.unwrap(), 1);
        assert!(store.find_by_content_id("1").await.unwrap().is_none());
        assert!(store.find_by_content_id("2").await.unwrap().is_some());
        assert!(store.delete_campaign(campaign.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_attempt_journal() {
        let store = MemoryStore::new();
        let attempt = PayoutAttempt::submitted(7, "0xaa", "0xbeef", 10, 3);
        store.record_attempt(&attempt).await.unwrap();
        store
            .resolve_attempt(7, "0xaa", AttemptOutcome::Confirmed, None)
            .await
            .unwrap();

        let attempts = store.attempts_for(7).await.unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].outcome, AttemptOutcome::Confirmed);
        assert!(store
            .resolve_attempt(7, "0xbb", AttemptOutcome::Failed, None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_sessions() {
        let store = MemoryStore::new();
        let session = store
            .create_session(NewSession {
                external_account_id: "open-1".to_string(),
                username: None,
                access_token: "act.1".to_string(),
            })
            .await
            .unwrap();
        assert!(store.get_session(&session.id).await.unwrap().is_some());
        assert!(store.delete_session(&session.id).await.unwrap());
        assert!(!store.delete_session(&session.id).await.unwrap());
    }
}
