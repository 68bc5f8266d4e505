//! API Client
//!
//! HTTP client for the reward API. Admin routes receive the operator
//! password in the `x-admin-password` header.

use crate::error::{CliError, CliResult};
use reqwest::{Client, Method, RequestBuilder, Response};
use reward_api::{
    DeleteCampaignResponse, ErrorResponse, HealthResponse, JobStartedResponse, PayoutJob,
    ADMIN_HEADER,
};
use reward_core::{Campaign, CampaignPatch, Submission, SubmissionStats, SubmissionView};
use reward_engine::{
    Balance, BatchOverrideResult, CampaignDraft, PayoutReport, ReconcileReport, SimulationReport,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

/// Reward API client
pub struct RewardClient {
    client: Client,
    base_url: String,
    admin_password: Option<String>,
}

impl RewardClient {
    /// Create a new client
    pub fn new(base_url: impl Into<String>, admin_password: Option<String>) -> CliResult<Self> {
        // Payout batches wait on finality, so keep the timeout generous.
        Self::with_timeout(base_url, admin_password, 300)
    }

    /// Create with custom timeout
    pub fn with_timeout(
        base_url: impl Into<String>,
        admin_password: Option<String>,
        timeout_secs: u64,
    ) -> CliResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CliError::connection(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            admin_password,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    fn admin(&self, method: Method, path: &str) -> CliResult<RequestBuilder> {
        let password = self
            .admin_password
            .as_deref()
            .ok_or_else(|| CliError::config("ADMIN_PASSWORD is required for this command"))?;
        Ok(self.request(method, path).header(ADMIN_HEADER, password))
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> CliResult<T> {
        let response = builder.send().await.map_err(|e| {
            if e.is_connect() {
                CliError::connection(e.to_string())
            } else {
                CliError::HttpError(e)
            }
        })?;
        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> CliResult<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        Err(CliError::api(status.as_u16(), error_message(&text)))
    }

    // ============================================
    // Public
    // ============================================

    pub async fn health(&self) -> CliResult<HealthResponse> {
        Self::send(self.request(Method::GET, "/health")).await
    }

    pub async fn active_campaign(&self) -> CliResult<Campaign> {
        Self::send(self.request(Method::GET, "/campaigns/active")).await
    }

    // ============================================
    // Admin
    // ============================================

    pub async fn list_campaigns(&self) -> CliResult<Vec<Campaign>> {
        Self::send(self.admin(Method::GET, "/campaigns")?).await
    }

    pub async fn create_campaign(&self, draft: &CampaignDraft) -> CliResult<Campaign> {
        Self::send(self.admin(Method::POST, "/campaigns")?.json(draft)).await
    }

    pub async fn update_campaign(&self, id: u64, patch: &CampaignPatch) -> CliResult<Campaign> {
        Self::send(
            self.admin(Method::PUT, &format!("/campaigns/{}", id))?
                .json(patch),
        )
        .await
    }

    pub async fn delete_campaign(&self, id: u64) -> CliResult<DeleteCampaignResponse> {
        Self::send(self.admin(Method::DELETE, &format!("/campaigns/{}", id))?).await
    }

    pub async fn list_submissions(
        &self,
        campaign_id: Option<u64>,
        status: Option<&str>,
    ) -> CliResult<Vec<SubmissionView>> {
        let mut query = Vec::new();
        if let Some(id) = campaign_id {
            query.push(("campaign_id", id.to_string()));
        }
        if let Some(status) = status {
            query.push(("status", status.to_string()));
        }
        Self::send(self.admin(Method::GET, "/submissions")?.query(&query)).await
    }

    pub async fn stats(&self) -> CliResult<SubmissionStats> {
        Self::send(self.admin(Method::GET, "/submissions/stats")?).await
    }

    pub async fn set_status(&self, id: u64, status: &str) -> CliResult<Submission> {
        Self::send(
            self.admin(Method::PATCH, &format!("/submissions/{}", id))?
                .json(&json!({ "status": status })),
        )
        .await
    }

    pub async fn batch_status(&self, ids: &[u64], status: &str) -> CliResult<BatchOverrideResult> {
        Self::send(
            self.admin(Method::POST, "/submissions/batch-status")?
                .json(&json!({ "ids": ids, "status": status })),
        )
        .await
    }

    pub async fn balance(&self) -> CliResult<Balance> {
        Self::send(self.admin(Method::GET, "/admin/payout/balance")?).await
    }

    pub async fn payout(&self, ids: &[u64]) -> CliResult<PayoutReport> {
        Self::send(
            self.admin(Method::POST, "/admin/payout")?
                .json(&json!({ "submission_ids": ids })),
        )
        .await
    }

    pub async fn simulate(&self, ids: &[u64]) -> CliResult<SimulationReport> {
        Self::send(
            self.admin(Method::POST, "/admin/payout/simulate")?
                .json(&json!({ "submission_ids": ids })),
        )
        .await
    }

    pub async fn reconcile(&self, repair: bool) -> CliResult<ReconcileReport> {
        Self::send(
            self.admin(Method::POST, "/admin/payout/reconcile")?
                .json(&json!({ "repair": repair })),
        )
        .await
    }

    pub async fn start_job(&self, ids: &[u64]) -> CliResult<JobStartedResponse> {
        Self::send(
            self.admin(Method::POST, "/admin/payout/jobs")?
                .json(&json!({ "submission_ids": ids })),
        )
        .await
    }

    pub async fn job(&self, job_id: &str) -> CliResult<PayoutJob> {
        Self::send(self.admin(Method::GET, &format!("/admin/payout/jobs/{}", job_id))?).await
    }
}

/// Extract the `error` field of an API error body, falling back to the raw text
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) => match parsed.details {
            Some(details) => format!("{} ({})", parsed.error, details),
            None => parsed.error,
        },
        Err(_) => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = RewardClient::new("http://localhost:4000/", None).unwrap();
        assert_eq!(client.url("/health"), "http://localhost:4000/health");
    }

    #[test]
    fn test_admin_requires_password() {
        let client = RewardClient::new("http://localhost:4000", None).unwrap();
        let err = client.admin(Method::GET, "/campaigns").unwrap_err();
        assert_eq!(err.exit_code(), 1);

        let client = RewardClient::new("http://localhost:4000", Some("secret".into())).unwrap();
        assert!(client.admin(Method::GET, "/campaigns").is_ok());
    }

    #[test]
    fn test_error_message() {
        assert_eq!(error_message(r#"{"error":"Unauthorized"}"#), "Unauthorized");
        assert_eq!(
            error_message(r#"{"error":"Invalid payout address","details":{"field":"payout_address"}}"#),
            r#"Invalid payout address ({"field":"payout_address"})"#
        );
        assert_eq!(error_message("bad gateway"), "bad gateway");
    }
}
