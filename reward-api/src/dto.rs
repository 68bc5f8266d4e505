//! Data Transfer Objects
//!
//! Request and response bodies that are not engine types. Request fields
//! accept both snake_case and the camelCase spelling used by web clients.

use chrono::{DateTime, Utc};
use reward_core::{CampaignId, Session, SubmissionId, SubmissionStatus};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

// ============================================
// Common
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub storage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub components: Vec<ComponentHealth>,
}

// ============================================
// Campaigns
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteCampaignResponse {
    pub success: bool,
    pub removed_submissions: u64,
}

// ============================================
// Submissions
// ============================================

/// `GET /submissions` filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionListQuery {
    pub campaign_id: Option<CampaignId>,
    pub status: Option<String>,
}

impl SubmissionListQuery {
    pub fn status(&self) -> Result<Option<SubmissionStatus>, ApiError> {
        match self.status.as_deref().filter(|s| !s.is_empty()) {
            Some(s) => s
                .parse()
                .map(Some)
                .map_err(|_| ApiError::validation("Invalid status")),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverrideStatusRequest {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchStatusRequest {
    #[serde(default)]
    pub ids: Vec<SubmissionId>,
    #[serde(default)]
    pub status: Option<String>,
}

// ============================================
// Sessions
// ============================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterSessionRequest {
    #[serde(default, alias = "openId", alias = "open_id")]
    pub tiktok_open_id: String,
    #[serde(default, alias = "username")]
    pub tiktok_username: Option<String>,
    #[serde(default, alias = "accessToken")]
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(rename = "openId")]
    pub open_id: String,
    pub username: Option<String>,
}

impl From<&Session> for SessionUser {
    fn from(session: &Session) -> Self {
        Self {
            open_id: session.external_account_id.clone(),
            username: session.username.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user: SessionUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCreatedResponse {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub user: SessionUser,
}

// ============================================
// Payouts
// ============================================

/// Body of the payout and simulate endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayoutRequest {
    #[serde(default, alias = "submissionIds")]
    pub submission_ids: Vec<SubmissionId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReconcileRequest {
    #[serde(default)]
    pub repair: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStartedResponse {
    pub job_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payout_request_aliases() {
        let snake: PayoutRequest = serde_json::from_str(r#"{"submission_ids":[1,2]}"#).unwrap();
        let camel: PayoutRequest = serde_json::from_str(r#"{"submissionIds":[1,2]}"#).unwrap();
        let empty: PayoutRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(snake.submission_ids, vec![1, 2]);
        assert_eq!(camel.submission_ids, vec![1, 2]);
        assert!(empty.submission_ids.is_empty());
    }

    #[test]
    fn test_list_query_status() {
        let query = SubmissionListQuery {
            campaign_id: None,
            status: Some("winner".into()),
        };
        assert_eq!(query.status().unwrap(), Some(SubmissionStatus::Winner));

        let bad = SubmissionListQuery {
            campaign_id: None,
            status: Some("shipped".into()),
        };
        assert!(bad.status().is_err());
        assert_eq!(SubmissionListQuery::default().status().unwrap(), None);
    }

    #[test]
    fn test_session_user_shape() {
        let user = SessionUser {
            open_id: "open-1".into(),
            username: Some("dancer".into()),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["openId"], "open-1");
        assert_eq!(json["username"], "dancer");
    }
}
