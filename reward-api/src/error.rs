//! API Error Types
//!
//! Every failure leaves the API as `{ "error": <message>, "details"?: <json> }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reward_engine::{EngineError, LedgerError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API-specific errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed or rejected input
    #[error("{message}")]
    ValidationError {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Missing or wrong credentials
    #[error("{reason}")]
    Unauthorized { reason: String },

    /// Resource not found
    #[error("{message}")]
    NotFound { message: String },

    /// Upstream ledger or provider answered with an error
    #[error("{message}")]
    BadGateway { message: String },

    /// Upstream ledger or provider could not be reached
    #[error("{reason}")]
    ServiceUnavailable { reason: String },

    /// Internal error
    #[error("{message}")]
    Internal { message: String },

    /// Engine error
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Engine(e) => engine_status(e),
        }
    }

    /// Get error code string, used in logs
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::Unauthorized { .. } => "UNAUTHORIZED",
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::BadGateway { .. } => "BAD_GATEWAY",
            ApiError::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
            ApiError::Internal { .. } => "INTERNAL_ERROR",
            ApiError::Engine(EngineError::Ledger(_)) => "LEDGER_ERROR",
            ApiError::Engine(EngineError::Storage(_)) => "STORE_ERROR",
            ApiError::Engine(_) => "ENGINE_ERROR",
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            details: None,
        }
    }

    pub fn validation_with(message: impl Into<String>, details: serde_json::Value) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound {
            message: message.into(),
        }
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        ApiError::Unauthorized {
            reason: reason.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal {
            message: message.into(),
        }
    }
}

fn engine_status(err: &EngineError) -> StatusCode {
    match err {
        EngineError::InvalidSession => StatusCode::UNAUTHORIZED,
        EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
        EngineError::Ledger(e) => ledger_status(e),
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn ledger_status(err: &LedgerError) -> StatusCode {
    match err {
        e if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
        LedgerError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "Request failed");
        }

        let details = match &self {
            ApiError::ValidationError { details, .. } => details.clone(),
            _ => None,
        };
        let body = ErrorResponse {
            error: self.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reward_core::CoreError;
    use reward_store::StoreError;

    #[test]
    fn test_validation_error() {
        let err = ApiError::validation("Invalid status");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Invalid status");
    }

    #[test]
    fn test_engine_error_mapping() {
        let cases = [
            (EngineError::InvalidSession, StatusCode::UNAUTHORIZED),
            (EngineError::NothingToPay, StatusCode::BAD_REQUEST),
            (
                EngineError::DuplicateContent {
                    content_id: "1".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (EngineError::not_found("Submission", 3), StatusCode::NOT_FOUND),
            (
                EngineError::Validation(CoreError::missing("IDs array required")),
                StatusCode::BAD_REQUEST,
            ),
            (
                EngineError::Storage(StoreError::Database("io".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_ledger_error_mapping() {
        let unreachable = ApiError::from(EngineError::Ledger(LedgerError::RpcConnection("down".into())));
        assert_eq!(unreachable.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let rejected = ApiError::from(EngineError::Ledger(LedgerError::RpcResponse {
            code: 40,
            message: "Contract error".into(),
        }));
        assert_eq!(rejected.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(rejected.error_code(), "LEDGER_ERROR");
    }
}
