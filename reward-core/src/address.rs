//! Starknet address validation

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CoreError, CoreResult};

static ADDRESS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^0x[a-fA-F0-9]{1,64}$").expect("Invalid address regex")
});

/// Check a payout address against the Starknet felt format
pub fn validate_address(address: &str) -> CoreResult<()> {
    if ADDRESS_PATTERN.is_match(address) {
        Ok(())
    } else {
        Err(CoreError::InvalidAddress {
            value: address.to_string(),
        })
    }
}

/// Canonical form for comparing addresses: lowercase, no leading zeros
pub fn normalize_address(address: &str) -> String {
    let digits = address
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X")
        .trim_start_matches('0')
        .to_ascii_lowercase();
    if digits.is_empty() {
        "0x0".to_string()
    } else {
        format!("0x{}", digits)
    }
}
