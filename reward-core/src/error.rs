//! Core Error Codes
//!
//! Error code format: RW-{module}-{sequence}
//! - RW-STATUS: Submission status errors
//! - RW-AMOUNT: Token amount errors
//! - RW-INPUT: Input validation errors

use thiserror::Error;

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    // ============================================================
    // Status Errors (RW-STATUS-*)
    // ============================================================
    /// [RW-STATUS-001] Unknown status value
    #[error("[RW-STATUS-001] Invalid status: {value}")]
    InvalidStatus { value: String },

    /// [RW-STATUS-002] Transition not allowed by the state machine
    #[error("[RW-STATUS-002] Transition from {from} to {to} is not allowed")]
    InvalidTransition { from: String, to: String },

    // ============================================================
    // Amount Errors (RW-AMOUNT-*)
    // ============================================================
    /// [RW-AMOUNT-001] Amount could not be parsed
    #[error("[RW-AMOUNT-001] Invalid amount: {value}")]
    InvalidAmount { value: String },

    /// [RW-AMOUNT-002] Amount must be positive
    #[error("[RW-AMOUNT-002] Amount must be positive: {value}")]
    NonPositiveAmount { value: String },

    /// [RW-AMOUNT-003] Amount does not fit the chain integer width
    #[error("[RW-AMOUNT-003] Amount overflows base units: {value}")]
    AmountOverflow { value: String },

    // ============================================================
    // Input Errors (RW-INPUT-*)
    // ============================================================
    /// [RW-INPUT-001] Malformed payout address
    #[error("[RW-INPUT-001] Invalid Starknet wallet address")]
    InvalidAddress { value: String },

    /// [RW-INPUT-002] Content id could not be extracted from URL
    #[error("[RW-INPUT-002] Could not extract video ID from URL. Please use a direct TikTok video URL.")]
    UnrecognizedContentUrl { url: String },

    /// [RW-INPUT-003] Required field missing
    #[error("[RW-INPUT-003] {message}")]
    MissingField { message: String },
}

impl CoreError {
    /// Create an invalid status error
    pub fn invalid_status(value: impl Into<String>) -> Self {
        CoreError::InvalidStatus { value: value.into() }
    }

    /// Create an invalid amount error
    pub fn invalid_amount(value: impl Into<String>) -> Self {
        CoreError::InvalidAmount { value: value.into() }
    }

    /// Create a missing field error
    pub fn missing(message: impl Into<String>) -> Self {
        CoreError::MissingField {
            message: message.into(),
        }
    }

    /// Message without the bracketed code, for surfacing to API callers
    pub fn user_message(&self) -> String {
        let full = self.to_string();
        match full.find("] ") {
            Some(idx) if full.starts_with('[') => full[idx + 2..].to_string(),
            _ => full,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_in_display() {
        let err = CoreError::invalid_status("archived");
        assert!(err.to_string().starts_with("[RW-STATUS-001]"));
        assert!(err.to_string().contains("archived"));
    }

    #[test]
    fn test_user_message_strips_code() {
        let err = CoreError::InvalidAddress {
            value: "abc".to_string(),
        };
        assert_eq!(err.user_message(), "Invalid Starknet wallet address");

        let err = CoreError::missing("Name and reward amount required");
        assert_eq!(err.user_message(), "Name and reward amount required");
    }
}
