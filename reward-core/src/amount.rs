//! Token Amounts
//!
//! Conversion between decimal token units and the chain's smallest unit,
//! plus the uint256 `{low, high}` split used by Starknet ERC20 calldata.

use num_bigint::BigUint;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};

/// Decimals of the reward token (STRK)
pub const TOKEN_DECIMALS: u32 = 18;

/// Decimal places shown for balances
pub const DISPLAY_DECIMALS: u32 = 4;

/// Convert a decimal token amount to base units, truncating toward zero
///
/// `"10"` becomes `10 * 10^18`, `"0.000001"` becomes `1_000_000_000_000`.
/// An amount that truncates to zero base units is rejected like zero itself.
pub fn to_base_units(amount: &Decimal, decimals: u32) -> CoreResult<u128> {
    let non_positive = || CoreError::NonPositiveAmount {
        value: amount.to_string(),
    };
    if amount.is_sign_negative() || amount.is_zero() {
        return Err(non_positive());
    }

    let overflow = || CoreError::AmountOverflow {
        value: amount.to_string(),
    };

    let mantissa = u128::try_from(amount.mantissa()).map_err(|_| overflow())?;
    let scale = amount.scale();

    let raw = if decimals >= scale {
        let factor = 10u128.checked_pow(decimals - scale).ok_or_else(overflow)?;
        mantissa.checked_mul(factor).ok_or_else(overflow)?
    } else {
        let divisor = 10u128.checked_pow(scale - decimals).ok_or_else(overflow)?;
        mantissa / divisor
    };

    if raw == 0 {
        return Err(non_positive());
    }
    Ok(raw)
}

/// Parse a decimal amount string and convert it to base units
pub fn parse_base_units(amount: &str, decimals: u32) -> CoreResult<u128> {
    let value: Decimal = amount
        .trim()
        .parse()
        .map_err(|_| CoreError::invalid_amount(amount))?;
    to_base_units(&value, decimals)
}

/// Render base units as a decimal string rounded to `places`
pub fn format_units(raw: &BigUint, decimals: u32, places: u32) -> String {
    let scale = BigUint::from(10u32).pow(decimals);
    let mut whole = raw / &scale;
    let fraction = raw % &scale;

    if places == 0 {
        if decimals > 0 && fraction >= &scale / 2u32 {
            whole += 1u32;
        }
        return whole.to_string();
    }

    let places = places.min(decimals);
    let unit = BigUint::from(10u32).pow(decimals - places);
    let half_unit = &unit / 2u32;
    let mut rounded = (fraction + half_unit) / &unit;

    let limit = BigUint::from(10u32).pow(places);
    if rounded >= limit {
        whole += 1u32;
        rounded -= limit;
    }

    format!(
        "{}.{:0>width$}",
        whole,
        rounded.to_string(),
        width = places as usize
    )
}

/// Starknet uint256 as two 128-bit limbs
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uint256 {
    pub low: u128,
    pub high: u128,
}

impl Uint256 {
    pub fn from_u128(value: u128) -> Self {
        Self { low: value, high: 0 }
    }

    /// Parse from hex felt limbs as returned by the RPC
    pub fn from_felts(low: &str, high: &str) -> CoreResult<Self> {
        Ok(Self {
            low: parse_felt_u128(low)?,
            high: parse_felt_u128(high)?,
        })
    }

    /// Full value: low + high * 2^128
    pub fn to_biguint(&self) -> BigUint {
        (BigUint::from(self.high) << 128u32) + BigUint::from(self.low)
    }

    /// The value as u128 when the high limb is empty
    pub fn as_u128(&self) -> Option<u128> {
        if self.high == 0 {
            Some(self.low)
        } else {
            None
        }
    }

    /// Calldata limbs as hex felts
    pub fn to_felts(&self) -> [String; 2] {
        [format!("{:#x}", self.low), format!("{:#x}", self.high)]
    }
}

impl fmt::Display for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_biguint())
    }
}

/// Parse a hex felt that must fit in 128 bits
pub fn parse_felt_u128(felt: &str) -> CoreResult<u128> {
    let digits = felt.trim().trim_start_matches("0x").trim_start_matches("0X");
    if digits.is_empty() {
        return Ok(0);
    }
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16).map_err(|_| CoreError::invalid_amount(felt))
}
