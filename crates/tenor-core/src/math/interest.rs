//! # Rates and Interest
//!
//! Conversions between prices and annualized rates, the time stretch
//! heuristic, compounding, and weighted averages of maturity times.

use crate::constants::{
    EXP_MAX_INPUT, SECONDS_PER_YEAR, TIME_STRETCH_NUMERATOR, TIME_STRETCH_RATE_COEFFICIENT,
};
use crate::errors::{CoreResult, TenorError};
use crate::math::big_int::{weighted_mean, weighted_mean_remove, Rounding};
use crate::math::fixed_point::FixedPoint;

/// Duration in seconds as a fraction of a year
pub fn annualized(duration: u64) -> CoreResult<FixedPoint> {
    FixedPoint::from_int(duration).div_down(FixedPoint::from_int(SECONDS_PER_YEAR))
}

/// Time stretch calibrated for a target rate: `1 / (5.24592 / (0.04665 * rate * 100))`
pub fn calculate_time_stretch(rate: FixedPoint) -> CoreResult<FixedPoint> {
    let scaled = FixedPoint::from_raw(TIME_STRETCH_RATE_COEFFICIENT).mul_down(rate.mul_int(100)?)?;
    if scaled.is_zero() {
        return Err(TenorError::InvalidApr);
    }
    let inverse = FixedPoint::from_raw(TIME_STRETCH_NUMERATOR).div_down(scaled)?;
    FixedPoint::ONE.div_down(inverse)
}

/// Rate implied by a bond price: `(1 - p) / (p * t)`
///
/// Prices at or above par imply no positive rate and report zero.
pub fn calculate_apr_from_price(price: FixedPoint, position_duration: u64) -> CoreResult<FixedPoint> {
    if price >= FixedPoint::ONE {
        return Ok(FixedPoint::ZERO);
    }
    if price.is_zero() {
        return Err(TenorError::DivisionByZero);
    }
    let t = annualized(position_duration)?;
    FixedPoint::ONE.safe_sub(price)?.div_down(price.mul_up(t)?)
}

/// Bond price implied by a rate: `1 / (1 + r * t)`
pub fn calculate_price_from_apr(apr: FixedPoint, position_duration: u64) -> CoreResult<FixedPoint> {
    let t = annualized(position_duration)?;
    FixedPoint::ONE.div_up(FixedPoint::ONE.safe_add(apr.mul_down(t)?)?)
}

/// Rate realized by a discrete trade: `(bonds / base - 1) / t`
///
/// `time_remaining` is in years. Receiving fewer bonds than base paid is a
/// negative rate.
pub fn calculate_apr_from_realized_price(
    base_amount: FixedPoint,
    bond_amount: FixedPoint,
    time_remaining: FixedPoint,
) -> CoreResult<FixedPoint> {
    if bond_amount < base_amount {
        return Err(TenorError::NegativeInterest);
    }
    if base_amount.is_zero() || time_remaining.is_zero() {
        return Err(TenorError::DivisionByZero);
    }
    bond_amount
        .safe_sub(base_amount)?
        .div_down(base_amount.mul_up(time_remaining)?)
}

/// Continuously compound `principal` at a signed annual `rate` (raw 18
/// decimals) for `duration` seconds
///
/// Returns the accrued value and the signed interest. Negative rates divide
/// by `e^{|r|t}`, so depreciation never drives the value below zero.
pub fn calculate_compound_interest(
    principal: FixedPoint,
    rate: i128,
    duration: u64,
) -> CoreResult<(FixedPoint, i128)> {
    if rate == 0 || duration == 0 {
        return Ok((principal, 0));
    }

    let t = annualized(duration)?;
    let rt = FixedPoint::from_raw(rate.unsigned_abs()).mul_down(t)?;
    if rt.raw() >= EXP_MAX_INPUT as u128 {
        if rate > 0 {
            return Err(TenorError::ExpInputTooLarge);
        }
        return Ok((FixedPoint::ZERO, -principal.to_signed()?));
    }
    let growth = FixedPoint::exp(rt.to_signed()?)?;

    let accrued = if rate > 0 {
        principal.mul_down(growth)?
    } else {
        principal.div_down(growth)?
    };
    let interest = accrued.to_signed()? - principal.to_signed()?;

    Ok((accrued, interest))
}

/// Fold a weighted point into (or out of) a running average
pub fn update_weighted_average(
    average: FixedPoint,
    total_weight: FixedPoint,
    delta: FixedPoint,
    delta_weight: FixedPoint,
    is_adding: bool,
) -> CoreResult<FixedPoint> {
    let raw = if is_adding {
        weighted_mean(
            average.raw(),
            total_weight.raw(),
            delta.raw(),
            delta_weight.raw(),
            Rounding::Up,
        )?
    } else {
        weighted_mean_remove(
            average.raw(),
            total_weight.raw(),
            delta.raw(),
            delta_weight.raw(),
            Rounding::Up,
        )?
    };
    Ok(FixedPoint::from_raw(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SECONDS_PER_DAY;
    use crate::math::fixed_point::fixed;

    #[test]
    fn test_time_stretch_for_five_percent() {
        // 1 / (5.24592 / (0.04665 * 5)) ~= 0.04446
        let ts = calculate_time_stretch(fixed("0.05")).unwrap().to_f64();
        assert!((ts - 0.233_25 / 5.245_92).abs() < 1e-12);
        assert_eq!(calculate_time_stretch(FixedPoint::ZERO), Err(TenorError::InvalidApr));
    }

    #[test]
    fn test_price_apr_inverse() {
        let duration = 365 * SECONDS_PER_DAY;
        let price = calculate_price_from_apr(fixed("0.05"), duration).unwrap();
        assert!((price.to_f64() - 1.0 / 1.05).abs() < 1e-15);

        let apr = calculate_apr_from_price(price, duration).unwrap();
        assert!((apr.to_f64() - 0.05).abs() < 1e-15);

        assert_eq!(calculate_apr_from_price(FixedPoint::ONE, duration).unwrap(), FixedPoint::ZERO);
    }

    #[test]
    fn test_realized_apr() {
        let apr = calculate_apr_from_realized_price(fixed("100"), fixed("105"), FixedPoint::ONE).unwrap();
        assert_eq!(apr, fixed("0.05"));

        let half_year = calculate_apr_from_realized_price(fixed("100"), fixed("105"), fixed("0.5")).unwrap();
        assert_eq!(half_year, fixed("0.1"));

        assert_eq!(
            calculate_apr_from_realized_price(fixed("100"), fixed("99"), FixedPoint::ONE),
            Err(TenorError::NegativeInterest)
        );
    }

    #[test]
    fn test_compound_interest_signed() {
        let year = 365 * SECONDS_PER_DAY;
        let (up, gained) = calculate_compound_interest(fixed("100"), 5 * 10_i128.pow(16), year).unwrap();
        assert!((up.to_f64() - 100.0 * 0.05_f64.exp()).abs() < 1e-9);
        assert!(gained > 0);

        let (down, lost) = calculate_compound_interest(fixed("100"), -5 * 10_i128.pow(16), year).unwrap();
        assert!((down.to_f64() - 100.0 / 0.05_f64.exp()).abs() < 1e-9);
        assert!(lost < 0);

        // Extreme depreciation bottoms out at zero instead of underflowing
        let (floor, _) = calculate_compound_interest(fixed("100"), -1_000 * 10_i128.pow(18), year).unwrap();
        assert_eq!(floor, FixedPoint::ZERO);
    }

    #[test]
    fn test_weighted_average() {
        let avg = update_weighted_average(fixed("10"), fixed("1"), fixed("20"), fixed("1"), true).unwrap();
        assert_eq!(avg, fixed("15"));

        let back = update_weighted_average(avg, fixed("2"), fixed("20"), fixed("1"), false).unwrap();
        assert_eq!(back, fixed("10"));

        let empty = update_weighted_average(back, fixed("1"), fixed("10"), fixed("1"), false).unwrap();
        assert_eq!(empty, FixedPoint::ZERO);
    }
}
