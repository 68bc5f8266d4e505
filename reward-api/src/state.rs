//! Application State
//!
//! Shared state for the reward API service.

use chrono::{DateTime, Utc};
use reward_engine::{
    CampaignService, MetricsProvider, PayoutEngine, SettlementLedger, SubmissionService,
};
use reward_store::RewardDatabase;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::auth::AuthConfig;
use crate::jobs::PayoutJobs;

/// Application configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Service name
    pub service_name: String,
    /// Service version
    pub version: String,
    /// Listen address
    pub listen_addr: String,
    /// Allowed CORS origin; any origin when unset
    pub frontend_url: Option<String>,
    /// Max request body size (bytes)
    pub max_body_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            service_name: "reward-api".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            listen_addr: "0.0.0.0:4000".to_string(),
            frontend_url: None,
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

impl ApiConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let host = std::env::var("REWARDS_API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("REWARDS_API_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(crate::DEFAULT_PORT);

        Self {
            listen_addr: format!("{}:{}", host, port),
            frontend_url: std::env::var("FRONTEND_URL").ok().filter(|v| !v.is_empty()),
            ..Default::default()
        }
    }
}

/// Application state shared across handlers
pub struct AppState {
    /// Configuration
    pub config: ApiConfig,
    /// Authentication configuration
    pub auth_config: AuthConfig,
    /// Database facade
    pub database: RewardDatabase,
    /// Intake, administration and sessions
    pub submissions: SubmissionService,
    /// Campaign CRUD
    pub campaigns: CampaignService,
    /// Payouts and reconciliation
    pub payouts: Arc<PayoutEngine>,
    /// Background payout batches
    pub jobs: PayoutJobs,
    /// Service start time
    pub started_at: DateTime<Utc>,
    request_counter: AtomicU64,
    active_requests: AtomicU64,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        auth_config: AuthConfig,
        database: RewardDatabase,
        provider: Arc<dyn MetricsProvider>,
        ledger: Arc<dyn SettlementLedger>,
    ) -> Self {
        let store = database.store();
        Self {
            config,
            auth_config,
            submissions: SubmissionService::new(store.clone(), provider),
            campaigns: CampaignService::new(store.clone()),
            payouts: Arc::new(PayoutEngine::new(store, ledger)),
            jobs: PayoutJobs::new(),
            database,
            started_at: Utc::now(),
            request_counter: AtomicU64::new(0),
            active_requests: AtomicU64::new(0),
        }
    }

    /// Get service uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        let now = Utc::now();
        (now - self.started_at).num_seconds().max(0) as u64
    }

    /// Count a request as started; returns requests in flight
    pub fn request_started(&self) -> u64 {
        self.request_counter.fetch_add(1, Ordering::Relaxed);
        self.active_requests.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Count a request as finished; returns requests in flight
    pub fn request_finished(&self) -> u64 {
        self.active_requests
            .fetch_sub(1, Ordering::Relaxed)
            .saturating_sub(1)
    }

    /// Total requests served since start
    pub fn request_count(&self) -> u64 {
        self.request_counter.load(Ordering::Relaxed)
    }
}

/// Health status of the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }
}

/// Component health check result
#[derive(Debug, Clone)]
pub struct ComponentHealthCheck {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,
}

impl ComponentHealthCheck {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Healthy,
            message: None,
        }
    }

    pub fn degraded(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Degraded,
            message: Some(message.into()),
        }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Unhealthy,
            message: Some(message.into()),
        }
    }
}
