//! CLI Error Types

use thiserror::Error;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// API connection error
    #[error("API connection error: {message}")]
    ConnectionError { message: String },

    /// API request failed
    #[error("API request failed: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Store error
    #[error("Store error: {0}")]
    StoreError(#[from] reward_store::StoreError),

    /// Engine error
    #[error("Engine error: {0}")]
    EngineError(#[from] reward_engine::EngineError),

    /// Server error
    #[error("Server error: {message}")]
    ServerError { message: String },
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub fn config(message: impl Into<String>) -> Self {
        CliError::ConfigError {
            message: message.into(),
        }
    }

    pub fn invalid_arg(message: impl Into<String>) -> Self {
        CliError::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        CliError::ConnectionError {
            message: message.into(),
        }
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        CliError::ApiError {
            status,
            message: message.into(),
        }
    }

    pub fn server(message: impl Into<String>) -> Self {
        CliError::ServerError {
            message: message.into(),
        }
    }

    /// Get exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::ConfigError { .. } => 1,
            CliError::InvalidArgument { .. } => 2,
            CliError::ConnectionError { .. } => 3,
            CliError::ApiError { .. } => 4,
            CliError::JsonError(_) => 6,
            CliError::HttpError(_) => 7,
            CliError::StoreError(_) => 10,
            CliError::EngineError(_) => 11,
            CliError::ServerError { .. } => 30,
        }
    }
}
