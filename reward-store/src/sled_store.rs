//! Sled persistent store
//!
//! Rows are JSON values keyed by big-endian ids. Secondary indexes live in
//! their own trees and are written in the same sled transaction as the row
//! they point to.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reward_core::{
    AttemptOutcome, Campaign, CampaignId, CampaignPatch, NewCampaign, NewSession, NewSubmission,
    PayoutAttempt, Session, Submission, SubmissionFilter, SubmissionId, SubmissionStats,
    SubmissionStatus,
};
use serde::{de::DeserializeOwned, Serialize};
use sled::transaction::{ConflictableTransactionError, TransactionError, Transactional};
use std::path::Path;

use crate::config::StorageConfig;
use crate::error::{StoreError, StoreResult};
use crate::repos::{
    CampaignRepository, PayoutAttemptRepository, SessionRepository, SubmissionRepository,
};

/// Tree names
const CAMPAIGNS_TREE: &str = "campaigns";
const SUBMISSIONS_TREE: &str = "submissions";
const SESSIONS_TREE: &str = "sessions";
const ATTEMPTS_TREE: &str = "payout_attempts";
const CONTENT_INDEX_TREE: &str = "content_index";
const TX_INDEX_TREE: &str = "tx_index";
const META_TREE: &str = "meta";

/// Id sequence keys in the meta tree
const CAMPAIGN_SEQ: &str = "campaign_seq";
const SUBMISSION_SEQ: &str = "submission_seq";

/// Sled store
#[derive(Debug, Clone)]
pub struct SledStore {
    db: sled::Db,
    campaigns: sled::Tree,
    submissions: sled::Tree,
    sessions: sled::Tree,
    attempts: sled::Tree,
    content_index: sled::Tree,
    tx_index: sled::Tree,
    meta: sled::Tree,
}

impl SledStore {
    /// Open with configuration
    pub fn new(config: &StorageConfig) -> StoreResult<Self> {
        let db = sled::Config::new()
            .path(&config.data_dir)
            .cache_capacity(config.cache_capacity)
            .flush_every_ms(config.flush_every_ms)
            .open()
            .map_err(|e| StoreError::database("Failed to open sled db", e))?;
        Self::from_db(db)
    }

    /// Open or create a database at `path` with default settings
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path).map_err(|e| StoreError::database("Failed to open sled db", e))?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> StoreResult<Self> {
        let open = |name: &str| {
            db.open_tree(name)
                .map_err(|e| StoreError::database(&format!("Failed to open {} tree", name), e))
        };

        Ok(Self {
            campaigns: open(CAMPAIGNS_TREE)?,
            submissions: open(SUBMISSIONS_TREE)?,
            sessions: open(SESSIONS_TREE)?,
            attempts: open(ATTEMPTS_TREE)?,
            content_index: open(CONTENT_INDEX_TREE)?,
            tx_index: open(TX_INDEX_TREE)?,
            meta: open(META_TREE)?,
            db,
        })
    }

    /// Flush to disk
    pub async fn flush(&self) -> StoreResult<()> {
        self.db
            .flush_async()
            .await
            .map_err(|e| StoreError::database("Failed to flush db", e))?;
        Ok(())
    }

    /// Clear all data (use with care)
    pub fn clear(&self) -> StoreResult<()> {
        for tree in [
            &self.campaigns,
            &self.submissions,
            &self.sessions,
            &self.attempts,
            &self.content_index,
            &self.tx_index,
            &self.meta,
        ] {
            tree.clear()
                .map_err(|e| StoreError::database("Failed to clear tree", e))?;
        }
        Ok(())
    }

    // ==================== Helpers ====================

    fn serialize<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn id_key(id: u64) -> [u8; 8] {
        id.to_be_bytes()
    }

    fn decode_id(bytes: &[u8]) -> Option<u64> {
        <[u8; 8]>::try_from(bytes).ok().map(u64::from_be_bytes)
    }

    fn attempt_key(submission_id: SubmissionId, tx_reference: &str) -> Vec<u8> {
        let mut key = submission_id.to_be_bytes().to_vec();
        key.extend_from_slice(tx_reference.as_bytes());
        key
    }

    /// Next value of a persistent id sequence
    fn next_id(&self, sequence: &str) -> StoreResult<u64> {
        let updated = self
            .meta
            .update_and_fetch(sequence, |old| {
                let current = old.and_then(Self::decode_id).unwrap_or(0);
                Some((current + 1).to_be_bytes().to_vec())
            })
            .map_err(|e| StoreError::database("Failed to advance id sequence", e))?;

        updated
            .as_deref()
            .and_then(Self::decode_id)
            .ok_or_else(|| StoreError::Internal(format!("Sequence {} is corrupt", sequence)))
    }

    fn scan<T: DeserializeOwned>(tree: &sled::Tree, what: &str) -> StoreResult<Vec<T>> {
        let mut rows = Vec::new();
        for item in tree.iter() {
            let (_, value) =
                item.map_err(|e| StoreError::database(&format!("Failed to iterate {}", what), e))?;
            rows.push(Self::deserialize(&value)?);
        }
        Ok(rows)
    }

    fn load_submission(&self, id: SubmissionId) -> StoreResult<Option<Submission>> {
        match self
            .submissions
            .get(Self::id_key(id))
            .map_err(|e| StoreError::database("Failed to get submission", e))?
        {
            Some(bytes) => Ok(Some(Self::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Read-modify-write one submission inside a transaction
    fn update_submission<F>(&self, id: SubmissionId, mutate: F) -> StoreResult<Submission>
    where
        F: Fn(&mut Submission) -> StoreResult<()>,
    {
        let key = Self::id_key(id);
        let result = self.submissions.transaction(|tx| {
            let bytes = tx
                .get(&key[..])?
                .ok_or_else(|| ConflictableTransactionError::Abort(StoreError::not_found("Submission", id)))?;
            let mut submission: Submission =
                Self::deserialize(&bytes).map_err(ConflictableTransactionError::Abort)?;
            mutate(&mut submission).map_err(ConflictableTransactionError::Abort)?;
            let value = Self::serialize(&submission).map_err(ConflictableTransactionError::Abort)?;
            tx.insert(&key[..], value)?;
            Ok(submission)
        });
        flatten_tx(result)
    }
}

fn flatten_tx<T>(result: Result<T, TransactionError<StoreError>>) -> StoreResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(TransactionError::Abort(e)) => Err(e),
        Err(TransactionError::Storage(e)) => Err(StoreError::database("Transaction failed", e)),
    }
}

#[async_trait]
impl CampaignRepository for SledStore {
    async fn create_campaign(&self, new: NewCampaign) -> StoreResult<Campaign> {
        let id = self.next_id(CAMPAIGN_SEQ)?;
        let campaign = Campaign::from_new(id, new, Utc::now());
        self.campaigns
            .insert(Self::id_key(id), Self::serialize(&campaign)?)
            .map_err(|e| StoreError::database("Failed to save campaign", e))?;
        Ok(campaign)
    }

    async fn get_campaign(&self, id: CampaignId) -> StoreResult<Option<Campaign>> {
        match self
            .campaigns
            .get(Self::id_key(id))
            .map_err(|e| StoreError::database("Failed to get campaign", e))?
        {
            Some(bytes) => Ok(Some(Self::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn list_campaigns(&self) -> StoreResult<Vec<Campaign>> {
        let mut campaigns: Vec<Campaign> = Self::scan(&self.campaigns, "campaigns")?;
        // Big-endian keys iterate ascending
        campaigns.reverse();
        Ok(campaigns)
    }

    async fn update_campaign(&self, id: CampaignId, patch: CampaignPatch) -> StoreResult<Campaign> {
        let key = Self::id_key(id);
        let result = self.campaigns.transaction(|tx| {
            let bytes = tx
                .get(&key[..])?
                .ok_or_else(|| ConflictableTransactionError::Abort(StoreError::not_found("Campaign", id)))?;
            let mut campaign: Campaign =
                Self::deserialize(&bytes).map_err(ConflictableTransactionError::Abort)?;
            campaign
                .apply_patch(patch.clone())
                .map_err(|e| ConflictableTransactionError::Abort(StoreError::from(e)))?;
            let value = Self::serialize(&campaign).map_err(ConflictableTransactionError::Abort)?;
            tx.insert(&key[..], value)?;
            Ok(campaign)
        });
        flatten_tx(result)
    }

    async fn delete_campaign(&self, id: CampaignId) -> StoreResult<u64> {
        if self.get_campaign(id).await?.is_none() {
            return Err(StoreError::not_found("Campaign", id));
        }

        let doomed: Vec<Submission> = Self::scan::<Submission>(&self.submissions, "submissions")?
            .into_iter()
            .filter(|s| s.campaign_id == id)
            .collect();

        let campaign_key = Self::id_key(id);
        let result = (&self.campaigns, &self.submissions, &self.content_index, &self.tx_index)
            .transaction(|(campaigns, submissions, content_index, tx_index)| {
                campaigns.remove(&campaign_key[..])?;
                for submission in &doomed {
                    submissions.remove(&Self::id_key(submission.id)[..])?;
                    content_index.remove(submission.content_id.as_bytes())?;
                    if let Some(tx) = &submission.tx_reference {
                        tx_index.remove(tx.as_bytes())?;
                    }
                }
                Ok(())
            });
        flatten_tx::<()>(result)?;

        for submission in &doomed {
            let prefix = submission.id.to_be_bytes();
            for item in self.attempts.scan_prefix(prefix) {
                let (key, _) =
                    item.map_err(|e| StoreError::database("Failed to iterate attempts", e))?;
                self.attempts
                    .remove(key)
                    .map_err(|e| StoreError::database("Failed to delete attempt", e))?;
            }
        }

        tracing::info!(campaign_id = id, removed = doomed.len(), "Campaign deleted");
        Ok(doomed.len() as u64)
    }

    async fn count_campaigns(&self) -> StoreResult<u64> {
        Ok(self.campaigns.len() as u64)
    }
}

#[async_trait]
impl SubmissionRepository for SledStore {
    async fn insert_submission(&self, new: NewSubmission) -> StoreResult<Submission> {
        let id = self.next_id(SUBMISSION_SEQ)?;
        let submission = Submission::from_new(id, new, Utc::now());
        let key = Self::id_key(id);
        let value = Self::serialize(&submission)?;
        let content_key = submission.content_id.as_bytes();

        let result = (&self.submissions, &self.content_index).transaction(|(submissions, index)| {
            if index.get(content_key)?.is_some() {
                return Err(ConflictableTransactionError::Abort(StoreError::duplicate(
                    "Submission",
                    &submission.content_id,
                )));
            }
            index.insert(content_key, &key[..])?;
            submissions.insert(&key[..], value.as_slice())?;
            Ok(())
        });
        flatten_tx::<()>(result)?;

        Ok(submission)
    }

    async fn get_submission(&self, id: SubmissionId) -> StoreResult<Option<Submission>> {
        self.load_submission(id)
    }

    async fn find_by_content_id(&self, content_id: &str) -> StoreResult<Option<Submission>> {
        let id = self
            .content_index
            .get(content_id.as_bytes())
            .map_err(|e| StoreError::database("Failed to read content index", e))?
            .and_then(|bytes| Self::decode_id(&bytes));
        match id {
            Some(id) => self.load_submission(id),
            None => Ok(None),
        }
    }

    async fn find_by_tx_reference(&self, tx_reference: &str) -> StoreResult<Option<Submission>> {
        let id = self
            .tx_index
            .get(tx_reference.as_bytes())
            .map_err(|e| StoreError::database("Failed to read tx index", e))?
            .and_then(|bytes| Self::decode_id(&bytes));
        match id {
            Some(id) => self.load_submission(id),
            None => Ok(None),
        }
    }

    async fn list_submissions(&self, filter: &SubmissionFilter) -> StoreResult<Vec<Submission>> {
        let mut rows: Vec<Submission> = Self::scan::<Submission>(&self.submissions, "submissions")?
            .into_iter()
            .filter(|s| filter.matches(s))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn select_payable(&self, ids: &[SubmissionId]) -> StoreResult<Vec<Submission>> {
        let mut wanted: Vec<SubmissionId> = ids.to_vec();
        wanted.sort_unstable();
        wanted.dedup();

        let mut selected = Vec::new();
        for id in wanted {
            if let Some(submission) = self.load_submission(id)? {
                if submission.status.is_payable() {
                    selected.push(submission);
                }
            }
        }
        Ok(selected)
    }

    async fn override_status(
        &self,
        id: SubmissionId,
        status: SubmissionStatus,
    ) -> StoreResult<Submission> {
        self.update_submission(id, |submission| {
            submission.apply_override(status)?;
            Ok(())
        })
    }

    async fn mark_paid(
        &self,
        id: SubmissionId,
        tx_reference: &str,
        paid_at: DateTime<Utc>,
    ) -> StoreResult<Submission> {
        let key = Self::id_key(id);
        let result = (&self.submissions, &self.tx_index).transaction(|(submissions, tx_index)| {
            let bytes = submissions
                .get(&key[..])?
                .ok_or_else(|| ConflictableTransactionError::Abort(StoreError::not_found("Submission", id)))?;
            let mut submission: Submission =
                Self::deserialize(&bytes).map_err(ConflictableTransactionError::Abort)?;
            if !submission.status.is_payable() {
                return Err(ConflictableTransactionError::Abort(StoreError::invalid_state(
                    format!("submission {} is {}, not payable", id, submission.status),
                )));
            }
            submission
                .mark_paid(tx_reference, paid_at)
                .map_err(|e| ConflictableTransactionError::Abort(StoreError::from(e)))?;
            let value = Self::serialize(&submission).map_err(ConflictableTransactionError::Abort)?;
            submissions.insert(&key[..], value)?;
            tx_index.insert(tx_reference.as_bytes(), &key[..])?;
            Ok(submission)
        });
        let submission = flatten_tx(result)?;

        // Payment state must survive a crash right after this call
        self.flush().await?;
        Ok(submission)
    }

    async fn submission_stats(&self) -> StoreResult<SubmissionStats> {
        let mut stats = SubmissionStats::default();
        for submission in Self::scan::<Submission>(&self.submissions, "submissions")? {
            stats.record(submission.status);
        }
        Ok(stats)
    }
}

#[async_trait]
impl SessionRepository for SledStore {
    async fn create_session(&self, new: NewSession) -> StoreResult<Session> {
        let session = Session::from_new(uuid::Uuid::new_v4().to_string(), new, Utc::now());
        self.sessions
            .insert(session.id.as_bytes(), Self::serialize(&session)?)
            .map_err(|e| StoreError::database("Failed to save session", e))?;
        Ok(session)
    }

    async fn get_session(&self, id: &str) -> StoreResult<Option<Session>> {
        match self
            .sessions
            .get(id.as_bytes())
            .map_err(|e| StoreError::database("Failed to get session", e))?
        {
            Some(bytes) => Ok(Some(Self::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn delete_session(&self, id: &str) -> StoreResult<bool> {
        let removed = self
            .sessions
            .remove(id.as_bytes())
            .map_err(|e| StoreError::database("Failed to delete session", e))?;
        Ok(removed.is_some())
    }
}

#[async_trait]
impl PayoutAttemptRepository for SledStore {
    async fn record_attempt(&self, attempt: &PayoutAttempt) -> StoreResult<()> {
        let key = Self::attempt_key(attempt.submission_id, &attempt.tx_reference);
        self.attempts
            .insert(key, Self::serialize(attempt)?)
            .map_err(|e| StoreError::database("Failed to save payout attempt", e))?;
        self.flush().await
    }

    async fn resolve_attempt(
        &self,
        submission_id: SubmissionId,
        tx_reference: &str,
        outcome: AttemptOutcome,
        error: Option<String>,
    ) -> StoreResult<()> {
        let key = Self::attempt_key(submission_id, tx_reference);
        let result = self.attempts.transaction(|tx| {
            let bytes = tx.get(key.as_slice())?.ok_or_else(|| {
                ConflictableTransactionError::Abort(StoreError::not_found(
                    "PayoutAttempt",
                    tx_reference,
                ))
            })?;
            let mut attempt: PayoutAttempt =
                Self::deserialize(&bytes).map_err(ConflictableTransactionError::Abort)?;
            attempt.resolve(outcome, error.clone());
            let value = Self::serialize(&attempt).map_err(ConflictableTransactionError::Abort)?;
            tx.insert(key.as_slice(), value)?;
            Ok(())
        });
        flatten_tx(result)
    }

    async fn attempts_for(&self, submission_id: SubmissionId) -> StoreResult<Vec<PayoutAttempt>> {
        let mut attempts = Vec::new();
        for item in self.attempts.scan_prefix(submission_id.to_be_bytes()) {
            let (_, value) =
                item.map_err(|e| StoreError::database("Failed to iterate attempts", e))?;
            attempts.push(Self::deserialize::<PayoutAttempt>(&value)?);
        }
        attempts.sort_by_key(|a| a.submitted_at);
        Ok(attempts)
    }
}
