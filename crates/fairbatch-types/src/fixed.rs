//! 18-decimal fixed-point helpers.
//!
//! The engine does all value and price arithmetic on `u128` scaled by
//! [`WAD`]. `rust_decimal` is only used at the edges: configuration input and
//! human-readable log output.

use alloy_primitives::U256;
use rust_decimal::Decimal;

use crate::{
    FairbatchError, Result,
    constants::{BPS_DENOMINATOR, WAD, WAD_DECIMALS},
};

/// An amount of value (stake, bid, trade leg) scaled by [`WAD`].
pub type Amount = u128;

/// A quote-per-base price scaled by [`WAD`].
pub type Price = u128;

/// Convert a non-negative decimal into its fixed-point representation.
///
/// Digits beyond 18 decimal places are truncated.
pub fn to_wad(value: Decimal) -> Result<Amount> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(FairbatchError::Configuration(format!(
            "negative amount {value}"
        )));
    }
    let mantissa =
        u128::try_from(value.mantissa()).map_err(|_| FairbatchError::Overflow { context: "to_wad" })?;
    let scale = value.scale();
    let scaled = if scale <= WAD_DECIMALS {
        10u128
            .checked_pow(WAD_DECIMALS - scale)
            .and_then(|factor| mantissa.checked_mul(factor))
    } else {
        10u128
            .checked_pow(scale - WAD_DECIMALS)
            .map(|divisor| mantissa / divisor)
    };
    scaled.ok_or(FairbatchError::Overflow { context: "to_wad" })
}

/// Render a fixed-point amount as a decimal. Saturates at `Decimal::MAX`.
#[must_use]
pub fn from_wad(amount: Amount) -> Decimal {
    i128::try_from(amount)
        .ok()
        .and_then(|v| Decimal::try_from_i128_with_scale(v, WAD_DECIMALS).ok())
        .map_or(Decimal::MAX, |d| d.normalize())
}

/// Parse a decimal literal (e.g. `"1.05"`) straight into fixed point.
pub fn parse_wad(literal: &str) -> Result<Amount> {
    let value: Decimal = literal
        .parse()
        .map_err(|e| FairbatchError::Configuration(format!("bad amount {literal:?}: {e}")))?;
    to_wad(value)
}

/// `a * b / denominator` with a 256-bit intermediate product.
///
/// Rounds down. Fails only when the quotient itself exceeds 128 bits.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128> {
    if denominator == 0 {
        return Err(FairbatchError::Overflow {
            context: "mul_div: zero denominator",
        });
    }
    if let Some(product) = a.checked_mul(b) {
        return Ok(product / denominator);
    }
    let quotient = U256::from(a) * U256::from(b) / U256::from(denominator);
    u128::try_from(quotient).map_err(|_| FairbatchError::Overflow { context: "mul_div" })
}

/// `a * WAD / b`.
pub fn wad_div(a: u128, b: u128) -> Result<u128> {
    mul_div(a, WAD, b)
}

/// Share of `amount` expressed in basis points, rounded down.
pub fn bps_of(amount: u128, bps: u16) -> Result<u128> {
    mul_div(amount, u128::from(bps), BPS_DENOMINATOR)
}

/// Integer square root (floor).
#[must_use]
pub fn isqrt(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    let mut x = 1u128 << (n.ilog2() / 2 + 1);
    loop {
        let y = (x + n / x) / 2;
        if y >= x {
            return x;
        }
        x = y;
    }
}

/// Geometric mean `sqrt(a * b)`, falling back to `sqrt(a) * sqrt(b)` when the
/// product does not fit in 128 bits.
#[must_use]
pub fn geometric_mean(a: u128, b: u128) -> u128 {
    match a.checked_mul(b) {
        Some(product) => isqrt(product),
        None => isqrt(a).saturating_mul(isqrt(b)),
    }
}
