//! Store Error Types

use reward_core::CoreError;
use thiserror::Error;

/// Store result type
pub type StoreResult<T> = Result<T, StoreError>;

/// Store error
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entity not found
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    /// Duplicate entity
    #[error("Duplicate entity: {entity_type} with id {id}")]
    Duplicate { entity_type: String, id: String },

    /// Row is not in a state that allows the change
    #[error("Invalid entity state: {message}")]
    InvalidState { message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Domain rule rejected the change
    #[error("Validation error: {0}")]
    Validation(#[from] CoreError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Create a not found error
    pub fn not_found(entity_type: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Create a duplicate error
    pub fn duplicate(entity_type: impl Into<String>, id: impl ToString) -> Self {
        Self::Duplicate {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a database error
    pub fn database(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Database(format!("{}: {}", context, err))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        Self::Database(err.to_string())
    }
}
