//! Submission Intake
//!
//! Creates submissions from a session, a content URL and a payout address,
//! and carries the operator-side submission administration: listing,
//! statistics, status overrides, and session registration.

use reward_core::{
    evaluate, require_content_id, validate_address, verdict_message, Campaign, CampaignId,
    CoreError, EngagementMetrics, NewSession, NewSubmission, Session, Submission,
    SubmissionFilter, SubmissionId, SubmissionStats, SubmissionStatus, SubmissionView,
};
use reward_store::{
    CampaignRepository, RewardStore, SessionRepository, StoreError, SubmissionRepository,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::provider::{MetricsLookup, MetricsProvider};

/// Submission creation input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionRequest {
    #[serde(default, alias = "sessionId")]
    pub session_id: Option<String>,
    #[serde(default, alias = "videoUrl", alias = "video_url")]
    pub content_url: Option<String>,
    #[serde(default, alias = "walletAddress", alias = "wallet_address")]
    pub payout_address: Option<String>,
    #[serde(default, alias = "campaignId")]
    pub campaign_id: Option<CampaignId>,
}

/// Created submission and its verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub submission: Submission,
    pub eligible: bool,
    pub message: String,
}

/// Result of a batch status override
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOverrideResult {
    pub success: bool,
    pub updated: usize,
    /// Ids that were unknown or whose status could not be forced
    pub skipped: Vec<SubmissionId>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Submission workflows
pub struct SubmissionService {
    store: Arc<dyn RewardStore>,
    provider: Arc<dyn MetricsProvider>,
}

impl SubmissionService {
    pub fn new(store: Arc<dyn RewardStore>, provider: Arc<dyn MetricsProvider>) -> Self {
        Self { store, provider }
    }

    /// Evaluate content against a campaign and persist the submission
    ///
    /// The row enters as `eligible` or `rejected`. An unavailable provider
    /// degrades to zero metrics instead of failing the request.
    pub async fn create_submission(
        &self,
        request: SubmissionRequest,
    ) -> EngineResult<SubmissionOutcome> {
        let (session_id, content_url, payout_address) = match (
            present(request.session_id),
            present(request.content_url),
            present(request.payout_address),
        ) {
            (Some(session), Some(url), Some(address)) => (session, url, address),
            _ => {
                return Err(CoreError::missing(
                    "Session ID, video URL, and wallet address required",
                )
                .into())
            }
        };

        validate_address(&payout_address)?;

        let session = self
            .store
            .get_session(&session_id)
            .await?
            .ok_or(EngineError::InvalidSession)?;

        let campaign = self.resolve_campaign(request.campaign_id).await?;
        let content_id = require_content_id(&content_url)?;

        if self.store.find_by_content_id(&content_id).await?.is_some() {
            return Err(EngineError::DuplicateContent { content_id });
        }

        let metrics = match self.provider.fetch(&content_id, &session.access_token).await {
            MetricsLookup::Found(metrics) => metrics,
            MetricsLookup::NotFound => return Err(EngineError::ContentNotFound { content_id }),
            MetricsLookup::Unavailable(cause) => {
                warn!(
                    %content_id,
                    error = %cause,
                    "Metrics provider unavailable, evaluating with zero metrics"
                );
                EngagementMetrics::zero()
            }
        };

        let eligible = evaluate(&metrics, &campaign.thresholds);
        let submission = self
            .store
            .insert_submission(NewSubmission {
                campaign_id: campaign.id,
                content_id,
                content_url,
                submitter_identity: session.external_account_id.clone(),
                submitter_username: session.username.clone(),
                payout_address,
                metrics,
                status: SubmissionStatus::initial(eligible),
            })
            .await?;

        info!(
            id = submission.id,
            content_id = %submission.content_id,
            status = %submission.status,
            campaign_id = campaign.id,
            "Submission created"
        );
        metrics::counter!("rewards_submissions_total", "status" => submission.status.as_str())
            .increment(1);

        Ok(SubmissionOutcome {
            message: verdict_message(&campaign, eligible),
            submission,
            eligible,
        })
    }

    async fn resolve_campaign(&self, campaign_id: Option<CampaignId>) -> EngineResult<Campaign> {
        match campaign_id {
            Some(id) => self
                .store
                .get_campaign(id)
                .await?
                .filter(|c| c.is_active)
                .ok_or_else(|| EngineError::campaign_unavailable("Campaign not found or not active")),
            None => self
                .store
                .active_campaign()
                .await?
                .ok_or_else(|| EngineError::campaign_unavailable("No active campaign")),
        }
    }

    /// Submissions joined with their campaign, newest first
    ///
    /// Rows whose campaign no longer exists are left out.
    pub async fn list_submissions(
        &self,
        filter: &SubmissionFilter,
    ) -> EngineResult<Vec<SubmissionView>> {
        let campaigns: HashMap<CampaignId, Campaign> = self
            .store
            .list_campaigns()
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        Ok(self
            .store
            .list_submissions(filter)
            .await?
            .into_iter()
            .filter_map(|submission| {
                let campaign = campaigns.get(&submission.campaign_id)?;
                Some(SubmissionView {
                    campaign_name: campaign.name.clone(),
                    reward_amount: campaign.reward_amount,
                    submission,
                })
            })
            .collect())
    }

    pub async fn get_submission(&self, id: SubmissionId) -> EngineResult<Submission> {
        Ok(self.store.get_submission_required(id).await?)
    }

    pub async fn stats(&self) -> EngineResult<SubmissionStats> {
        Ok(self.store.submission_stats().await?)
    }

    /// Force one submission's status
    pub async fn override_status(&self, id: SubmissionId, status: &str) -> EngineResult<Submission> {
        let target: SubmissionStatus = status.parse()?;
        let submission = self.store.override_status(id, target).await?;
        info!(id, status = %target, "Submission status overridden");
        Ok(submission)
    }

    /// Force the status of several submissions
    ///
    /// Unknown ids and rows the override rules refuse are reported as
    /// skipped; the rest are applied.
    pub async fn batch_override_status(
        &self,
        ids: &[SubmissionId],
        status: &str,
    ) -> EngineResult<BatchOverrideResult> {
        if ids.is_empty() {
            return Err(EngineError::empty_selection("IDs array required"));
        }
        let target: SubmissionStatus = status.parse()?;

        let mut updated = 0;
        let mut skipped = Vec::new();
        for &id in ids {
            match self.store.override_status(id, target).await {
                Ok(_) => updated += 1,
                Err(e) if e.is_not_found() || matches!(e, StoreError::Validation(_)) => {
                    debug!(id, error = %e, "Status override skipped");
                    skipped.push(id);
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(updated, skipped = skipped.len(), status = %target, "Batch status override");
        Ok(BatchOverrideResult {
            success: true,
            updated,
            skipped,
        })
    }

    // ==================== Sessions ====================

    /// Store a session issued by the auth collaborator
    pub async fn register_session(&self, new: NewSession) -> EngineResult<Session> {
        if new.external_account_id.trim().is_empty() || new.access_token.trim().is_empty() {
            return Err(CoreError::missing("Open ID and access token required").into());
        }
        let session = self.store.create_session(new).await?;
        info!(session_id = %session.id, "Session registered");
        Ok(session)
    }

    pub async fn get_session(&self, id: &str) -> EngineResult<Session> {
        self.store
            .get_session(id)
            .await?
            .ok_or_else(|| EngineError::not_found("Session", id))
    }

    /// Delete a session; unknown ids are not an error
    pub async fn delete_session(&self, id: &str) -> EngineResult<()> {
        if self.store.delete_session(id).await? {
            debug!(session_id = %id, "Session deleted");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockMetricsProvider;
    use reward_core::{NewCampaign, Thresholds};
    use reward_store::MemoryStore;
    use rust_decimal::Decimal;

    const WALLET: &str = "0x0123abc";

    struct Fixture {
        service: SubmissionService,
        store: Arc<MemoryStore>,
        provider: Arc<MockMetricsProvider>,
        session_id: String,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        store
            .create_campaign(
                NewCampaign::new("Launch", Decimal::from(10))
                    .unwrap()
                    .with_thresholds(Thresholds::new(1000, 50, 0, 0)),
            )
            .await
            .unwrap();
        let session = store
            .create_session(NewSession {
                external_account_id: "open-1".to_string(),
                username: Some("creator".to_string()),
                access_token: "token-1".to_string(),
            })
            .await
            .unwrap();
        let provider = Arc::new(MockMetricsProvider::new());
        Fixture {
            service: SubmissionService::new(store.clone(), provider.clone()),
            store,
            provider,
            session_id: session.id,
        }
    }

    fn request(session_id: &str, video: &str) -> SubmissionRequest {
        SubmissionRequest {
            session_id: Some(session_id.to_string()),
            content_url: Some(format!("https://www.tiktok.com/@creator/video/{}", video)),
            payout_address: Some(WALLET.to_string()),
            campaign_id: None,
        }
    }

    #[tokio::test]
    async fn test_threshold_boundary_scenario() {
        let f = fixture().await;
        f.provider
            .set_video("100", EngagementMetrics::new(1000, 49, 0, 0))
            .await;
        f.provider
            .set_video("101", EngagementMetrics::new(1000, 50, 0, 0))
            .await;

        let rejected = f.service.create_submission(request(&f.session_id, "100")).await.unwrap();
        assert!(!rejected.eligible);
        assert_eq!(rejected.submission.status, SubmissionStatus::Rejected);
        assert_eq!(
            rejected.message,
            "Your video does not meet the criteria. Required: 1000 views, 50 likes."
        );

        let eligible = f.service.create_submission(request(&f.session_id, "101")).await.unwrap();
        assert!(eligible.eligible);
        assert_eq!(eligible.submission.status, SubmissionStatus::Eligible);
        assert_eq!(eligible.submission.submitter_identity, "open-1");
        assert_eq!(
            eligible.message,
            "Congratulations! Your video is eligible for 10 STRK."
        );
    }

    #[tokio::test]
    async fn test_duplicate_content_from_other_submitter() {
        let f = fixture().await;
        f.provider
            .set_video("200", EngagementMetrics::new(5000, 500, 0, 0))
            .await;
        let first = f.service.create_submission(request(&f.session_id, "200")).await.unwrap();

        let other = f
            .store
            .create_session(NewSession {
                external_account_id: "open-2".to_string(),
                username: None,
                access_token: "token-2".to_string(),
            })
            .await
            .unwrap();
        let err = f
            .service
            .create_submission(request(&other.id, "200"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateContent { .. }));
        assert_eq!(err.to_string(), "This video has already been submitted");

        let stored = f.store.get_submission(first.submission.id).await.unwrap().unwrap();
        assert_eq!(stored, first.submission);
    }

    #[tokio::test]
    async fn test_validation_order() {
        let f = fixture().await;

        let mut missing = request(&f.session_id, "1");
        missing.payout_address = Some("  ".to_string());
        let err = f.service.create_submission(missing).await.unwrap_err();
        assert_eq!(err.to_string(), "Session ID, video URL, and wallet address required");

        let mut bad_address = request("no-such-session", "1");
        bad_address.payout_address = Some("0xZZ".to_string());
        let err = f.service.create_submission(bad_address).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid Starknet wallet address");

        let err = f
            .service
            .create_submission(request("no-such-session", "1"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidSession));

        let mut bad_url = request(&f.session_id, "1");
        bad_url.content_url = Some("https://vm.tiktok.com/ZMabc/".to_string());
        let err = f.service.create_submission(bad_url).await.unwrap_err();
        assert!(err.to_string().starts_with("Could not extract video ID from URL"));
    }

    #[tokio::test]
    async fn test_campaign_selection() {
        let f = fixture().await;
        f.provider
            .set_video("300", EngagementMetrics::new(0, 0, 0, 0))
            .await;

        let mut explicit = request(&f.session_id, "300");
        explicit.campaign_id = Some(99);
        let err = f.service.create_submission(explicit).await.unwrap_err();
        assert_eq!(err.to_string(), "Campaign not found or not active");

        let active = f.store.active_campaign().await.unwrap().unwrap();
        f.store
            .update_campaign(
                active.id,
                reward_core::CampaignPatch {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let err = f
            .service
            .create_submission(request(&f.session_id, "300"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No active campaign");
    }

    #[tokio::test]
    async fn test_provider_not_found_rejects() {
        let f = fixture().await;
        let err = f
            .service
            .create_submission(request(&f.session_id, "404"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ContentNotFound { .. }));
        assert!(f.store.find_by_content_id("404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_provider_unavailable_degrades_to_zero() {
        let f = fixture().await;
        f.provider.set_unavailable(Some("HTTP 503")).await;

        let outcome = f
            .service
            .create_submission(request(&f.session_id, "500"))
            .await
            .unwrap();
        assert!(!outcome.eligible);
        assert_eq!(outcome.submission.status, SubmissionStatus::Rejected);
        assert_eq!(outcome.submission.metrics, EngagementMetrics::zero());
    }

    #[tokio::test]
    async fn test_list_joins_campaign() {
        let f = fixture().await;
        f.provider
            .set_video("1", EngagementMetrics::new(5000, 500, 0, 0))
            .await;
        f.service.create_submission(request(&f.session_id, "1")).await.unwrap();

        let views = f
            .service
            .list_submissions(&SubmissionFilter::default())
            .await
            .unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].campaign_name, "Launch");
        assert_eq!(views[0].reward_amount, Decimal::from(10));
    }

    #[tokio::test]
    async fn test_override_rules() {
        let f = fixture().await;
        f.provider
            .set_video("1", EngagementMetrics::new(5000, 500, 0, 0))
            .await;
        let created = f.service.create_submission(request(&f.session_id, "1")).await.unwrap();
        let id = created.submission.id;

        let err = f.service.override_status(id, "archived").await.unwrap_err();
        assert!(err.to_string().starts_with("Invalid status"));

        let winner = f.service.override_status(id, "winner").await.unwrap();
        assert_eq!(winner.status, SubmissionStatus::Winner);

        assert!(f.service.override_status(id, "paid").await.is_err());
        assert!(matches!(
            f.service.override_status(999, "winner").await.unwrap_err(),
            EngineError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_batch_override_skips_refused_rows() {
        let f = fixture().await;
        f.provider
            .set_video("1", EngagementMetrics::new(5000, 500, 0, 0))
            .await;
        let a = f.service.create_submission(request(&f.session_id, "1")).await.unwrap();
        let b = f.service.create_submission(request(&f.session_id, "2")).await;
        // "2" is unknown to the provider
        assert!(b.is_err());
        f.provider
            .set_video("3", EngagementMetrics::new(0, 0, 0, 0))
            .await;
        let rejected = f.service.create_submission(request(&f.session_id, "3")).await.unwrap();

        let result = f
            .service
            .batch_override_status(
                &[a.submission.id, rejected.submission.id, 404],
                "winner",
            )
            .await
            .unwrap();
        assert_eq!(result.updated, 1);
        assert_eq!(result.skipped, vec![rejected.submission.id, 404]);

        let err = f.service.batch_override_status(&[], "winner").await.unwrap_err();
        assert_eq!(err.to_string(), "IDs array required");
    }

    #[tokio::test]
    async fn test_sessions() {
        let f = fixture().await;
        let session = f
            .service
            .register_session(NewSession {
                external_account_id: "open-9".to_string(),
                username: None,
                access_token: "tok".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(f.service.get_session(&session.id).await.unwrap().external_account_id, "open-9");

        f.service.delete_session(&session.id).await.unwrap();
        assert!(f.service.get_session(&session.id).await.is_err());
        f.service.delete_session(&session.id).await.unwrap();

        assert!(f
            .service
            .register_session(NewSession {
                external_account_id: String::new(),
                username: None,
                access_token: "tok".to_string(),
            })
            .await
            .is_err());
    }
}
