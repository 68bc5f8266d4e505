//! Background payout jobs
//!
//! Batches run on their own task so a client that disconnects or times out
//! cannot cancel a payout between submitting a transfer and recording it.

use chrono::{DateTime, Duration, Utc};
use reward_core::SubmissionId;
use reward_engine::{EngineError, EngineResult, PayoutEngine, PayoutReport};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

/// A detached payout batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutJob {
    pub job_id: String,
    pub status: JobStatus,
    pub requested: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<PayoutReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Hours a finished job stays queryable
pub const DEFAULT_JOB_RETENTION_HOURS: i64 = 24;

/// Finished jobs kept at most; running jobs are never evicted
pub const DEFAULT_MAX_FINISHED_JOBS: usize = 1000;

/// In-memory registry of payout jobs
///
/// Finished jobs are evicted once older than the retention window, and the
/// oldest go first when more than `max_finished` are kept.
#[derive(Debug, Clone)]
pub struct PayoutJobs {
    jobs: Arc<RwLock<HashMap<String, PayoutJob>>>,
    retention: Duration,
    max_finished: usize,
}

impl Default for PayoutJobs {
    fn default() -> Self {
        Self::with_retention(
            Duration::hours(DEFAULT_JOB_RETENTION_HOURS),
            DEFAULT_MAX_FINISHED_JOBS,
        )
    }
}

impl PayoutJobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: Duration, max_finished: usize) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            retention,
            max_finished,
        }
    }

    /// Start a batch in the background and return its job id
    pub async fn start(&self, engine: Arc<PayoutEngine>, ids: Vec<SubmissionId>) -> String {
        let job_id = uuid::Uuid::new_v4().to_string();
        let mut registry = self.jobs.write().await;
        let evicted = prune(&mut registry, Utc::now(), self.retention, self.max_finished);
        if evicted > 0 {
            debug!(evicted, "Evicted finished payout jobs");
        }
        registry.insert(
            job_id.clone(),
            PayoutJob {
                job_id: job_id.clone(),
                status: JobStatus::Running,
                requested: ids.len(),
                report: None,
                error: None,
                started_at: Utc::now(),
                finished_at: None,
            },
        );
        drop(registry);
        info!(%job_id, requested = ids.len(), "Payout job started");

        let jobs = self.jobs.clone();
        let id = job_id.clone();
        tokio::spawn(async move {
            let result = engine.disburse(&ids).await;
            let mut jobs = jobs.write().await;
            if let Some(job) = jobs.get_mut(&id) {
                job.finished_at = Some(Utc::now());
                match result {
                    Ok(report) => {
                        info!(job_id = %id, successful = report.successful, failed = report.failed, "Payout job completed");
                        job.status = JobStatus::Completed;
                        job.report = Some(report);
                    }
                    Err(e) => {
                        error!(job_id = %id, error = %e, "Payout job failed");
                        job.status = JobStatus::Failed;
                        job.error = Some(e.to_string());
                    }
                }
            }
        });

        job_id
    }

    pub async fn get(&self, job_id: &str) -> Option<PayoutJob> {
        self.jobs.read().await.get(job_id).cloned()
    }
}

/// Drop finished jobs past `retention`, then the oldest above `max_finished`
fn prune(
    jobs: &mut HashMap<String, PayoutJob>,
    now: DateTime<Utc>,
    retention: Duration,
    max_finished: usize,
) -> usize {
    let before = jobs.len();
    jobs.retain(|_, job| match job.finished_at {
        Some(finished) => now - finished <= retention,
        None => true,
    });

    let mut finished: Vec<(DateTime<Utc>, String)> = jobs
        .values()
        .filter_map(|job| job.finished_at.map(|at| (at, job.job_id.clone())))
        .collect();
    if finished.len() > max_finished {
        finished.sort();
        let excess = finished.len() - max_finished;
        for (_, job_id) in finished.into_iter().take(excess) {
            jobs.remove(&job_id);
        }
    }

    before - jobs.len()
}

/// Run a batch on its own task and wait for it
pub async fn run_detached(
    engine: Arc<PayoutEngine>,
    ids: Vec<SubmissionId>,
) -> EngineResult<PayoutReport> {
    tokio::spawn(async move { engine.disburse(&ids).await })
        .await
        .map_err(|e| EngineError::Internal(format!("Payout task aborted: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use reward_core::{EngagementMetrics, NewCampaign, NewSubmission, SubmissionStatus};
    use reward_engine::MockLedger;
    use reward_store::{CampaignRepository, MemoryStore, SubmissionRepository};
    use rust_decimal::Decimal;

    async fn engine_with_one_payable() -> (Arc<PayoutEngine>, SubmissionId) {
        let store = Arc::new(MemoryStore::new());
        let campaign = store
            .create_campaign(NewCampaign::new("Jobs", Decimal::TEN).unwrap())
            .await
            .unwrap();
        let submission = store
            .insert_submission(NewSubmission {
                campaign_id: campaign.id,
                content_id: "1".to_string(),
                content_url: "https://www.tiktok.com/@u/video/1".to_string(),
                submitter_identity: "open".to_string(),
                submitter_username: None,
                payout_address: "0xabc".to_string(),
                metrics: EngagementMetrics::zero(),
                status: SubmissionStatus::Eligible,
            })
            .await
            .unwrap();
        let engine = PayoutEngine::new(store, Arc::new(MockLedger::new("0xa11ce")));
        (Arc::new(engine), submission.id)
    }

    #[tokio::test]
    async fn test_job_completes() {
        let (engine, id) = engine_with_one_payable().await;
        let jobs = PayoutJobs::new();
        let job_id = jobs.start(engine, vec![id]).await;

        let mut job = jobs.get(&job_id).await.unwrap();
        for _ in 0..50 {
            if job.status != JobStatus::Running {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            job = jobs.get(&job_id).await.unwrap();
        }
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.report.unwrap().successful, 1);
        assert!(jobs.get("missing").await.is_none());
    }

    fn job(job_id: &str, finished_minutes_ago: Option<i64>, now: DateTime<Utc>) -> PayoutJob {
        PayoutJob {
            job_id: job_id.to_string(),
            status: if finished_minutes_ago.is_some() {
                JobStatus::Completed
            } else {
                JobStatus::Running
            },
            requested: 1,
            report: None,
            error: None,
            started_at: now - Duration::hours(48),
            finished_at: finished_minutes_ago.map(|m| now - Duration::minutes(m)),
        }
    }

    #[test]
    fn test_prune_expired_and_excess_jobs() {
        let now = Utc::now();
        let mut jobs: HashMap<String, PayoutJob> = [
            job("expired", Some(120), now),
            job("old", Some(30), now),
            job("recent", Some(5), now),
            job("newest", Some(1), now),
            job("running", None, now),
        ]
        .into_iter()
        .map(|j| (j.job_id.clone(), j))
        .collect();

        let evicted = prune(&mut jobs, now, Duration::hours(1), 2);
        assert_eq!(evicted, 2);
        assert!(!jobs.contains_key("expired"));
        assert!(!jobs.contains_key("old"));
        assert!(jobs.contains_key("recent"));
        assert!(jobs.contains_key("newest"));
        assert!(jobs.contains_key("running"));
    }

    #[tokio::test]
    async fn test_start_evicts_finished_jobs() {
        let (engine, id) = engine_with_one_payable().await;
        let jobs = PayoutJobs::with_retention(Duration::hours(1), 0);
        let first = jobs.start(engine.clone(), vec![id]).await;

        for _ in 0..50 {
            if jobs.get(&first).await.map(|j| j.status) != Some(JobStatus::Running) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        let second = jobs.start(engine, vec![id]).await;
        assert!(jobs.get(&first).await.is_none());
        assert!(jobs.get(&second).await.is_some());
    }

    #[tokio::test]
    async fn test_run_detached_propagates_errors() {
        let (engine, _) = engine_with_one_payable().await;
        let err = run_detached(engine, vec![999]).await.unwrap_err();
        assert!(matches!(err, EngineError::NothingToPay));
    }
}
