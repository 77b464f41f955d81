//! Wide integer helpers for fixed-point intermediates
//!
//! Products of two 128-bit values are formed in 256 bits so that
//! multiply-then-divide never overflows before the division.

use ethnum::U256;

use crate::errors::{CoreResult, TenorError};

/// Rounding mode for division operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub enum Rounding {
    /// Round down (towards zero)
    Down,
    /// Round up (away from zero)
    Up,
}

/// Compute `a * b / denominator` with a 256-bit intermediate
pub fn mul_div(a: u128, b: u128, denominator: u128, rounding: Rounding) -> CoreResult<u128> {
    if denominator == 0 {
        return Err(TenorError::DivisionByZero);
    }

    let product = U256::from(a) * U256::from(b);
    let denominator = U256::from(denominator);
    let mut quotient = product / denominator;
    if rounding == Rounding::Up && product % denominator != U256::ZERO {
        quotient += U256::ONE;
    }

    narrow(quotient)
}

/// Compute `(a * wa + b * wb) / (wa + wb)` without intermediate overflow
pub fn weighted_mean(a: u128, wa: u128, b: u128, wb: u128, rounding: Rounding) -> CoreResult<u128> {
    let total = U256::from(wa) + U256::from(wb);
    if total == U256::ZERO {
        return Ok(0);
    }

    let numerator = (U256::from(a) * U256::from(wa))
        .checked_add(U256::from(b) * U256::from(wb))
        .ok_or(TenorError::ArithmeticOverflow)?;
    let mut quotient = numerator / total;
    if rounding == Rounding::Up && numerator % total != U256::ZERO {
        quotient += U256::ONE;
    }

    narrow(quotient)
}

/// Remove a weighted point from a mean: `(a * wa - b * wb) / (wa - wb)`
///
/// Dust from earlier rounding can make the numerator slightly negative; it
/// saturates at zero.
pub fn weighted_mean_remove(
    a: u128,
    wa: u128,
    b: u128,
    wb: u128,
    rounding: Rounding,
) -> CoreResult<u128> {
    if wb > wa {
        return Err(TenorError::ArithmeticUnderflow);
    }
    if wb == wa {
        return Ok(0);
    }

    let total = U256::from(wa - wb);
    let kept = U256::from(a) * U256::from(wa);
    let removed = U256::from(b) * U256::from(wb);
    let numerator = if kept > removed { kept - removed } else { U256::ZERO };
    let mut quotient = numerator / total;
    if rounding == Rounding::Up && numerator % total != U256::ZERO {
        quotient += U256::ONE;
    }

    narrow(quotient)
}

fn narrow(value: U256) -> CoreResult<u128> {
    if value > U256::from(u128::MAX) {
        return Err(TenorError::ArithmeticOverflow);
    }
    Ok(value.as_u128())
}
