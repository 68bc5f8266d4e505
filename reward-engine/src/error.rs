//! Engine Error Types
//!
//! `LedgerError` covers the chain and signer boundary. `EngineError` is what
//! the workflows return; API and CLI layers classify it for their callers.

use reward_core::CoreError;
use reward_store::StoreError;
use thiserror::Error;

/// Ledger result type
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Engine result type
pub type EngineResult<T> = Result<T, EngineError>;

/// Settlement ledger error
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Node unreachable
    #[error("Starknet RPC connection failed: {0}")]
    RpcConnection(String),

    /// Non-success HTTP response or undecodable body
    #[error("Starknet RPC request failed: {0}")]
    RpcRequest(String),

    /// JSON-RPC error object
    #[error("Starknet RPC error {code}: {message}")]
    RpcResponse { code: i64, message: String },

    /// Signer relayer refused or failed
    #[error("Transfer signer failed: {0}")]
    Signer(String),

    /// Transaction unknown to the node
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Finality not observed in time
    #[error("Finality timeout for {tx_reference} after {waited_secs}s")]
    FinalityTimeout {
        tx_reference: String,
        waited_secs: u64,
    },

    /// Treasury cannot cover the transfer
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: u128, available: u128 },

    /// Response did not have the expected shape
    #[error("Invalid ledger response: {0}")]
    InvalidResponse(String),

    /// Missing or invalid settings
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LedgerError {
    /// Whether a poll or read may succeed if repeated
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerError::RpcConnection(_) | LedgerError::RpcRequest(_)
        )
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(e: reqwest::Error) -> Self {
        LedgerError::RpcConnection(e.to_string())
    }
}

impl From<CoreError> for LedgerError {
    fn from(e: CoreError) -> Self {
        LedgerError::InvalidResponse(e.to_string())
    }
}

/// Engine error
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input rejected by a domain rule
    #[error("{}", .0.user_message())]
    Validation(#[from] CoreError),

    /// Session id unknown
    #[error("Invalid session")]
    InvalidSession,

    /// Requested or default campaign cannot take submissions
    #[error("{message}")]
    CampaignUnavailable { message: String },

    /// Content id already submitted
    #[error("This video has already been submitted")]
    DuplicateContent { content_id: String },

    /// Content does not resolve under the submitter's credential
    #[error("Video not found or does not belong to your account. Make sure you are logged in with the correct TikTok account.")]
    ContentNotFound { content_id: String },

    /// A required id list was empty
    #[error("{message}")]
    EmptySelection { message: String },

    /// Payout selection matched nothing
    #[error("No eligible submissions found")]
    NothingToPay,

    /// Entity missing
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    /// Ledger failure outside per-item processing
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Storage failure
    #[error("Storage error: {0}")]
    Storage(StoreError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn campaign_unavailable(message: impl Into<String>) -> Self {
        Self::CampaignUnavailable {
            message: message.into(),
        }
    }

    pub fn empty_selection(message: impl Into<String>) -> Self {
        Self::EmptySelection {
            message: message.into(),
        }
    }

    pub fn not_found(entity_type: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Caller input was at fault
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            EngineError::Validation(_)
                | EngineError::CampaignUnavailable { .. }
                | EngineError::DuplicateContent { .. }
                | EngineError::ContentNotFound { .. }
                | EngineError::EmptySelection { .. }
                | EngineError::NothingToPay
        )
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity_type, id } => Self::NotFound { entity_type, id },
            StoreError::Duplicate { id, .. } => Self::DuplicateContent { content_id: id },
            StoreError::Validation(core) => Self::Validation(core),
            other => Self::Storage(other),
        }
    }
}
