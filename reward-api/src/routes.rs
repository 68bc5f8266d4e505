//! API Routes
//!
//! Route definitions for the reward API. Admin routes sit behind
//! [`admin_auth`]; the rest are public.

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::admin_auth;
use crate::handlers::*;
use crate::metrics::metrics_middleware;
use crate::state::AppState;

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/campaigns/active", get(active_campaign))
        .route("/submissions", post(create_submission))
        .route(
            "/auth/session/:session_id",
            get(get_session).delete(delete_session),
        )
}

fn admin_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        // Campaigns
        .route("/campaigns", get(list_campaigns).post(create_campaign))
        .route("/campaigns/:id", put(update_campaign).delete(delete_campaign))
        // Submissions
        .route("/submissions", get(list_submissions))
        .route("/submissions/stats", get(submission_stats))
        .route("/submissions/batch-status", post(batch_override_status))
        .route("/submissions/:id", patch(override_status))
        // Sessions
        .route("/auth/sessions", post(register_session))
        // Payouts
        .route("/admin/payout", post(disburse))
        .route("/admin/payout/balance", get(treasury_balance))
        .route("/admin/payout/simulate", post(simulate))
        .route("/admin/payout/reconcile", post(reconcile))
        .route("/admin/payout/jobs", post(start_payout_job))
        .route("/admin/payout/jobs/:job_id", get(get_payout_job))
        .route_layer(middleware::from_fn_with_state(state, admin_auth))
}

fn cors_layer(frontend_url: Option<&str>) -> CorsLayer {
    let origin = match frontend_url.map(HeaderValue::from_str) {
        Some(Ok(origin)) => AllowOrigin::exact(origin),
        Some(Err(_)) => {
            tracing::warn!("FRONTEND_URL is not a valid origin, allowing any origin");
            AllowOrigin::from(Any)
        }
        None => AllowOrigin::from(Any),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the API router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(state.config.frontend_url.as_deref());
    let body_limit = state.config.max_body_size;

    public_routes()
        .merge(admin_routes(state.clone()))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(state, metrics_middleware))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Build the full application router
pub fn build_app(state: AppState) -> Router {
    create_router(Arc::new(state))
}
