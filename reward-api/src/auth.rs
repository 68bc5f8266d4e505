//! Admin Authentication
//!
//! Operator routes require the shared admin password in a header:
//!
//! ```text
//! x-admin-password: <ADMIN_PASSWORD>
//! ```
//!
//! With no password configured every admin request is refused.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the admin password
pub const ADMIN_HEADER: &str = "x-admin-password";

/// Authentication configuration
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub admin_password: Option<String>,
}

impl AuthConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self {
            admin_password: std::env::var("ADMIN_PASSWORD")
                .ok()
                .filter(|v| !v.is_empty()),
        }
    }

    pub fn with_password(password: impl Into<String>) -> Self {
        Self {
            admin_password: Some(password.into()),
        }
    }

    /// Check a presented password against the configured one
    pub fn validate(&self, presented: &str) -> bool {
        match &self.admin_password {
            Some(expected) => constant_time_eq(expected.as_bytes(), presented.as_bytes()),
            None => false,
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Admin authentication middleware
pub async fn admin_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let authorized = request
        .headers()
        .get(ADMIN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |password| state.auth_config.validate(password));

    if !authorized {
        tracing::debug!(path = %request.uri().path(), "Rejected admin request");
        return ApiError::unauthorized("Unauthorized").into_response();
    }

    next.run(request).await
}
