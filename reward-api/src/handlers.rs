//! API Handlers
//!
//! HTTP handler implementations for the reward API endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use reward_core::{
    Campaign, CampaignId, CampaignPatch, NewSession, Submission, SubmissionFilter, SubmissionId,
    SubmissionStats, SubmissionView,
};
use reward_engine::{
    Balance, BatchOverrideResult, CampaignDraft, EngineError, PayoutReport, ReconcileReport,
    SimulationReport, SubmissionOutcome, SubmissionRequest,
};
use std::sync::Arc;

use crate::dto::*;
use crate::error::{ApiError, ApiResult};
use crate::jobs::{run_detached, PayoutJob};
use crate::state::{AppState, ComponentHealthCheck, HealthStatus};

/// Unwrap a JSON body, reporting malformed input in the API error shape
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}

// ============================================
// Health
// ============================================

/// Health check handler
pub async fn health_check(State(state): State<Arc<AppState>>) -> ApiResult<Json<HealthResponse>> {
    let mut components = vec![];

    match state.database.health_check().await {
        Ok(_) => components.push(ComponentHealthCheck::healthy("store")),
        Err(e) => components.push(ComponentHealthCheck::unhealthy("store", e.to_string())),
    }

    let chain_id = match state.payouts.ledger().chain_id().await {
        Ok(id) => {
            components.push(ComponentHealthCheck::healthy("ledger"));
            Some(id)
        }
        Err(e) => {
            components.push(ComponentHealthCheck::degraded("ledger", e.to_string()));
            None
        }
    };

    let overall_status = if components.iter().all(|c| c.status == HealthStatus::Healthy) {
        HealthStatus::Healthy
    } else if components.iter().any(|c| c.status == HealthStatus::Unhealthy) {
        HealthStatus::Unhealthy
    } else {
        HealthStatus::Degraded
    };

    Ok(Json(HealthResponse {
        status: overall_status.as_str().to_string(),
        version: state.config.version.clone(),
        uptime_secs: state.uptime_secs(),
        storage: state.database.backend_name().to_string(),
        chain_id,
        timestamp: Utc::now(),
        components: components
            .into_iter()
            .map(|c| ComponentHealth {
                name: c.name,
                status: c.status.as_str().to_string(),
                message: c.message,
            })
            .collect(),
    }))
}

// ============================================
// Campaign Handlers
// ============================================

/// Most recent active campaign
pub async fn active_campaign(State(state): State<Arc<AppState>>) -> ApiResult<Json<Campaign>> {
    match state.campaigns.active().await {
        Ok(campaign) => Ok(Json(campaign)),
        Err(EngineError::NotFound { .. }) => Err(ApiError::not_found("No active campaign")),
        Err(e) => Err(e.into()),
    }
}

pub async fn list_campaigns(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Campaign>>> {
    Ok(Json(state.campaigns.list().await?))
}

pub async fn create_campaign(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CampaignDraft>, JsonRejection>,
) -> ApiResult<Json<Campaign>> {
    Ok(Json(state.campaigns.create(body(payload)?).await?))
}

pub async fn update_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<CampaignId>,
    payload: Result<Json<CampaignPatch>, JsonRejection>,
) -> ApiResult<Json<Campaign>> {
    Ok(Json(state.campaigns.update(id, body(payload)?).await?))
}

pub async fn delete_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<CampaignId>,
) -> ApiResult<Json<DeleteCampaignResponse>> {
    let removed = state.campaigns.delete(id).await?;
    Ok(Json(DeleteCampaignResponse {
        success: true,
        removed_submissions: removed,
    }))
}

// ============================================
// Submission Handlers
// ============================================

pub async fn create_submission(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SubmissionRequest>, JsonRejection>,
) -> ApiResult<Json<SubmissionOutcome>> {
    Ok(Json(state.submissions.create_submission(body(payload)?).await?))
}

pub async fn list_submissions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SubmissionListQuery>,
) -> ApiResult<Json<Vec<SubmissionView>>> {
    let filter = SubmissionFilter {
        campaign_id: query.campaign_id,
        status: query.status()?,
    };
    Ok(Json(state.submissions.list_submissions(&filter).await?))
}

pub async fn submission_stats(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<SubmissionStats>> {
    Ok(Json(state.submissions.stats().await?))
}

/// Operator status override
pub async fn override_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SubmissionId>,
    payload: Result<Json<OverrideStatusRequest>, JsonRejection>,
) -> ApiResult<Json<Submission>> {
    let request = body(payload)?;
    let status = request.status.unwrap_or_default();
    Ok(Json(state.submissions.override_status(id, &status).await?))
}

pub async fn batch_override_status(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BatchStatusRequest>, JsonRejection>,
) -> ApiResult<Json<BatchOverrideResult>> {
    let request = body(payload)?;
    let status = request.status.unwrap_or_default();
    Ok(Json(
        state
            .submissions
            .batch_override_status(&request.ids, &status)
            .await?,
    ))
}

// ============================================
// Session Handlers
// ============================================

/// Register a session issued by the auth flow
pub async fn register_session(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterSessionRequest>, JsonRejection>,
) -> ApiResult<Json<SessionCreatedResponse>> {
    let request = body(payload)?;
    let session = state
        .submissions
        .register_session(NewSession {
            external_account_id: request.tiktok_open_id,
            username: request.tiktok_username,
            access_token: request.access_token,
        })
        .await?;

    Ok(Json(SessionCreatedResponse {
        user: SessionUser::from(&session),
        session_id: session.id,
    }))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionResponse>> {
    match state.submissions.get_session(&session_id).await {
        Ok(session) => Ok(Json(SessionResponse {
            user: SessionUser::from(&session),
        })),
        Err(EngineError::NotFound { .. }) => Err(ApiError::not_found("Session not found")),
        Err(e) => Err(e.into()),
    }
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SuccessResponse>> {
    state.submissions.delete_session(&session_id).await?;
    Ok(Json(SuccessResponse::ok()))
}

// ============================================
// Payout Handlers
// ============================================

pub async fn treasury_balance(State(state): State<Arc<AppState>>) -> ApiResult<Json<Balance>> {
    Ok(Json(state.payouts.balance().await?))
}

/// Pay the selected submissions and wait for the report
pub async fn disburse(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PayoutRequest>, JsonRejection>,
) -> ApiResult<Json<PayoutReport>> {
    let request = body(payload)?;
    let report = run_detached(state.payouts.clone(), request.submission_ids).await?;
    Ok(Json(report))
}

pub async fn simulate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PayoutRequest>, JsonRejection>,
) -> ApiResult<Json<SimulationReport>> {
    let request = body(payload)?;
    Ok(Json(state.payouts.simulate(&request.submission_ids).await?))
}

pub async fn reconcile(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ReconcileRequest>, JsonRejection>,
) -> ApiResult<Json<ReconcileReport>> {
    let request = body(payload)?;
    Ok(Json(state.payouts.reconcile(request.repair).await?))
}

/// Start a payout batch in the background
pub async fn start_payout_job(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PayoutRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<JobStartedResponse>)> {
    let request = body(payload)?;
    if request.submission_ids.is_empty() {
        return Err(EngineError::empty_selection("Submission IDs array required").into());
    }

    let job_id = state
        .jobs
        .start(state.payouts.clone(), request.submission_ids)
        .await;
    Ok((StatusCode::ACCEPTED, Json(JobStartedResponse { job_id })))
}

pub async fn get_payout_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<PayoutJob>> {
    state
        .jobs
        .get(&job_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Job not found"))
}
