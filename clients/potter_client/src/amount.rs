//! Human <-> raw amount conversion.
//!
//! Raw amounts are `u64` counts of the smallest unit. Human amounts are exact
//! decimals, so `to_raw(to_human(r, d), d) == r` holds for every raw value.
//! Rounding is round-half-up (midpoint away from zero), applied once when a
//! human amount is scaled to raw.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::errors::ClientError;

/// Largest decimals value a token may use.
pub const MAX_DECIMALS: u8 = 9;

pub fn check_decimals(decimals: u8) -> Result<(), ClientError> {
    if decimals > MAX_DECIMALS {
        return Err(ClientError::InvalidDecimals(decimals));
    }
    Ok(())
}

/// `round(human * 10^decimals)`, failing with `AmountOverflow` when the
/// rounded result is negative or above `u64::MAX`. A negative input that
/// rounds to zero yields `0`.
pub fn to_raw(human: Decimal, decimals: u8) -> Result<u64, ClientError> {
    check_decimals(decimals)?;

    let scale = Decimal::from(10u64.pow(u32::from(decimals)));
    let scaled = human
        .checked_mul(scale)
        .ok_or(ClientError::AmountOverflow)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

    if scaled.is_zero() {
        return Ok(0);
    }
    if scaled.is_sign_negative() {
        return Err(ClientError::AmountOverflow);
    }
    scaled.to_u64().ok_or(ClientError::AmountOverflow)
}

/// Exact inverse of [`to_raw`].
pub fn to_human(raw: u64, decimals: u8) -> Result<Decimal, ClientError> {
    check_decimals(decimals)?;
    Ok(Decimal::from_i128_with_scale(i128::from(raw), u32::from(decimals)).normalize())
}

/// Presentation-only float view. Values above 2^53 lose precision; never
/// feed this back into [`to_raw`].
pub fn to_display_f64(raw: u64, decimals: u8) -> Result<f64, ClientError> {
    to_human(raw, decimals)?
        .to_f64()
        .ok_or(ClientError::AmountOverflow)
}

/// Parses user input such as `"1000"` or `"0.25"`.
pub fn parse_human(input: &str) -> Result<Decimal, ClientError> {
    let trimmed = input.trim();
    Decimal::from_str(trimmed).map_err(|e| ClientError::InvalidAmount(format!("{trimmed:?}: {e}")))
}

/// Parses and scales in one step.
pub fn parse_raw(input: &str, decimals: u8) -> Result<u64, ClientError> {
    to_raw(parse_human(input)?, decimals)
}

/// Raw amount formatted for display, e.g. `1000000000` at 6 decimals -> `"1000"`.
pub fn format_human(raw: u64, decimals: u8) -> Result<String, ClientError> {
    Ok(to_human(raw, decimals)?.to_string())
}
