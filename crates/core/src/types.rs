//! Core type definitions

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{SwapError, SwapResult, TradeSide};

/// Decimals of the chain's native currency (ETH, BNB, ...)
pub const NATIVE_DECIMALS: u8 = 18;

/// Parse a human amount ("0.01", "125.5") as entered by a user.
///
/// Range checks happen in `to_base_units` once the decimals are known.
/// No floating point is involved.
pub fn parse_amount(input: &str) -> SwapResult<Decimal> {
    Decimal::from_str(input.trim())
        .map_err(|e| SwapError::InvalidAmount(format!("{:?}: {}", input, e)))
}

/// Parse a human native-currency amount ("0.01") into wei.
///
/// Rejects zero, negative values and more fractional digits than the
/// native currency carries.
pub fn parse_native_amount(input: &str) -> SwapResult<U256> {
    to_base_units(parse_amount(input)?, NATIVE_DECIMALS)
}

/// Convert a decimal amount into integer base units for `decimals`.
pub fn to_base_units(amount: Decimal, decimals: u8) -> SwapResult<U256> {
    if amount.is_zero() || amount.is_sign_negative() {
        return Err(SwapError::InvalidAmount(format!(
            "{} must be greater than zero",
            amount
        )));
    }

    let scale = amount.scale();
    if scale > decimals as u32 {
        return Err(SwapError::InvalidAmount(format!(
            "{} has more than {} decimal places",
            amount, decimals
        )));
    }

    // Positive, so the mantissa fits in u128
    let mantissa = U256::from(amount.mantissa() as u128);
    let factor = U256::from(10u8).pow(U256::from(decimals as u32 - scale));
    Ok(mantissa * factor)
}

/// Render integer base units as a decimal string without trailing zeros.
pub fn format_units(value: U256, decimals: u8) -> String {
    let raw = value.to_string();
    let d = decimals as usize;
    if d == 0 {
        return raw;
    }

    let padded = format!("{:0>width$}", raw, width = d + 1);
    let (int_part, frac_part) = padded.split_at(padded.len() - d);
    let frac_part = frac_part.trim_end_matches('0');

    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac_part)
    }
}

/// Base units as a `Decimal`, `None` when the value exceeds 28 digits.
pub fn to_decimal(value: U256, decimals: u8) -> Option<Decimal> {
    Decimal::from_str(&format_units(value, decimals)).ok()
}

/// Token amount with proper decimal handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    pub raw: U256,
    pub decimals: u8,
}

impl TokenAmount {
    pub fn new(raw: U256, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    pub fn native(raw: U256) -> Self {
        Self::new(raw, NATIVE_DECIMALS)
    }

}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_units(self.raw, self.decimals))
    }
}

/// Stored wallet for one external account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserWallet {
    pub user_id: i64,
    pub external_id: String,
    pub encrypted_wallet: String,
}

/// Outcome of a broadcast swap, handed back to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapReceipt {
    pub record_id: i64,
    pub tx_hash: String,
    pub side: TradeSide,
    pub from: Address,
    pub token: Address,
    pub amount_in: U256,
    pub expected_out: U256,
    pub amount_out_min: U256,
    pub nonce: u64,
    pub deadline: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_amount_parsing() {
        assert_eq!(
            parse_native_amount("0.01").unwrap(),
            U256::from(10_000_000_000_000_000u64)
        );
        assert_eq!(
            parse_native_amount("1.5").unwrap(),
            U256::from(1_500_000_000_000_000_000u64)
        );
        assert_eq!(parse_native_amount(" 2 ").unwrap(), U256::from(2_000_000_000_000_000_000u64));
        assert_eq!(parse_native_amount("0.000000000000000001").unwrap(), U256::from(1u8));
    }

    #[test]
    fn test_native_amount_rejects_bad_input() {
        for bad in ["", "abc", "0", "-1", "0.0000000000000000001"] {
            assert!(
                matches!(parse_native_amount(bad), Err(SwapError::InvalidAmount(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(U256::from(10_000_000_000_000_000u64), 18), "0.01");
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_units(U256::from(42u8), 0), "42");
        assert_eq!(format_units(U256::ZERO, 18), "0");
        assert_eq!(TokenAmount::native(U256::from(3_000_000_000_000_000_000u64)).to_string(), "3");
    }

    #[test]
    fn test_token_amount_display() {
        // USDC with 6 decimals
        let amount = TokenAmount::new(U256::from(100_500_000u64), 6);
        assert_eq!(amount.to_string(), "100.5");
    }

    #[test]
    fn test_parse_amount_keeps_precision() {
        assert_eq!(parse_amount(" 125.5 ").unwrap(), Decimal::from_str("125.5").unwrap());
        assert!(matches!(parse_amount("1e3x"), Err(SwapError::InvalidAmount(_))));
    }
}
