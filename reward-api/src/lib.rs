//! Reward API - HTTP Interface Layer
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 Reward API                   │
//! │  ┌────────────────────────────────────────┐  │
//! │  │  public routes      admin routes       │  │
//! │  │  /health            /campaigns         │  │
//! │  │  /submissions       /submissions/*     │  │
//! │  │  /auth/session/:id  /admin/payout/*    │  │
//! │  └────────────────────────────────────────┘  │
//! │        │                  │          │       │
//! │        ▼                  ▼          ▼       │
//! │   ┌──────────┐      ┌──────────┐ ┌────────┐  │
//! │   │ Handlers │      │   Jobs   │ │ State  │  │
//! │   └──────────┘      └──────────┘ └────────┘  │
//! └──────────────────────────────────────────────┘
//!          │                  │          │
//!          ▼                  ▼          ▼
//!    reward-engine      reward-store  ledger
//! ```
//!
//! # Endpoints
//!
//! ## Public
//! - `GET /health` - service health and chain id
//! - `GET /campaigns/active` - campaign accepting submissions
//! - `POST /submissions` - submit content for a campaign
//! - `GET|DELETE /auth/session/:id` - session lookup and logout
//!
//! ## Admin (`x-admin-password`)
//! - `GET|POST /campaigns`, `PUT|DELETE /campaigns/:id`
//! - `GET /submissions`, `GET /submissions/stats`
//! - `PATCH /submissions/:id`, `POST /submissions/batch-status`
//! - `POST /auth/sessions`
//! - `GET /admin/payout/balance`
//! - `POST /admin/payout`, `POST /admin/payout/simulate`
//! - `POST /admin/payout/reconcile`
//! - `POST /admin/payout/jobs`, `GET /admin/payout/jobs/:id`
//!
//! # Usage Example
//!
//! ```ignore
//! use reward_api::{ApiConfig, AppState, AuthConfig, start_server};
//! use reward_engine::{MockLedger, MockMetricsProvider};
//! use reward_store::RewardDatabase;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let state = AppState::new(
//!         ApiConfig::default(),
//!         AuthConfig::from_env(),
//!         RewardDatabase::memory(),
//!         Arc::new(MockMetricsProvider::new()),
//!         Arc::new(MockLedger::new("0x1")),
//!     );
//!     start_server(state).await.unwrap();
//! }
//! ```

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod routes;
pub mod state;

pub use auth::{AuthConfig, ADMIN_HEADER};
pub use dto::*;
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use jobs::{JobStatus, PayoutJob, PayoutJobs};
pub use metrics::{init_metrics, MetricsConfig};
pub use routes::{build_app, create_router};
pub use state::{ApiConfig, AppState, ComponentHealthCheck, HealthStatus};

/// API version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default API port
pub const DEFAULT_PORT: u16 = 4000;

/// Start the API server
pub async fn start_server(state: AppState) -> Result<(), std::io::Error> {
    let addr = state.config.listen_addr.clone();
    let app = build_app(state);

    tracing::info!("Starting reward API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_port() {
        assert_eq!(DEFAULT_PORT, 4000);
        assert!(ApiConfig::default().listen_addr.ends_with(":4000"));
    }
}
