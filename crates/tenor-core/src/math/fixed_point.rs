//! # Fixed-Point Arithmetic
//!
//! Unsigned 18-decimal fixed-point numbers. Every multiplication and
//! division names its rounding direction; callers pick the direction that
//! keeps rounding dust inside the pool.

use std::fmt;
use std::str::FromStr;

use ethnum::I256;

use crate::constants::{DECIMALS, ONE};
use crate::errors::{CoreResult, TenorError};
use crate::math::big_int::{mul_div, Rounding};
use crate::math::log_exp::{exp, ln};

/// 18-decimal unsigned fixed-point value
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FixedPoint(u128);

impl FixedPoint {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(ONE);
    pub const MAX: Self = Self(u128::MAX);

    /// Wrap a raw 18-decimal value
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Whole units to fixed point
    pub const fn from_int(value: u64) -> Self {
        Self(value as u128 * ONE)
    }

    /// Lossy conversion from a float, for tooling and tests
    pub fn from_f64(value: f64) -> CoreResult<Self> {
        if !value.is_finite() || value < 0.0 {
            return Err(TenorError::ArithmeticUnderflow);
        }
        let scaled = value * ONE as f64;
        if scaled >= u128::MAX as f64 {
            return Err(TenorError::ArithmeticOverflow);
        }
        Ok(Self(scaled as u128))
    }

    /// Signed raw value to fixed point, rejecting negatives
    pub fn from_signed(value: i128) -> CoreResult<Self> {
        if value < 0 {
            return Err(TenorError::ArithmeticUnderflow);
        }
        Ok(Self(value as u128))
    }

    pub const fn raw(self) -> u128 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Lossy conversion to a float
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / ONE as f64
    }

    /// Raw value as a signed integer
    pub fn to_signed(self) -> CoreResult<i128> {
        i128::try_from(self.0).map_err(|_| TenorError::ArithmeticOverflow)
    }

    // ========================================================================
    // Checked Arithmetic
    // ========================================================================

    pub fn safe_add(self, other: Self) -> CoreResult<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(TenorError::ArithmeticOverflow)
    }

    pub fn safe_sub(self, other: Self) -> CoreResult<Self> {
        self.0
            .checked_sub(other.0)
            .map(Self)
            .ok_or(TenorError::ArithmeticUnderflow)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub fn mul_div_down(self, numerator: Self, denominator: Self) -> CoreResult<Self> {
        mul_div(self.0, numerator.0, denominator.0, Rounding::Down).map(Self)
    }

    pub fn mul_div_up(self, numerator: Self, denominator: Self) -> CoreResult<Self> {
        mul_div(self.0, numerator.0, denominator.0, Rounding::Up).map(Self)
    }

    pub fn mul_down(self, other: Self) -> CoreResult<Self> {
        self.mul_div_down(other, Self::ONE)
    }

    pub fn mul_up(self, other: Self) -> CoreResult<Self> {
        self.mul_div_up(other, Self::ONE)
    }

    pub fn div_down(self, other: Self) -> CoreResult<Self> {
        self.mul_div_down(Self::ONE, other)
    }

    pub fn div_up(self, other: Self) -> CoreResult<Self> {
        self.mul_div_up(Self::ONE, other)
    }

    /// Multiply by a plain integer
    pub fn mul_int(self, factor: u128) -> CoreResult<Self> {
        self.0
            .checked_mul(factor)
            .map(Self)
            .ok_or(TenorError::ArithmeticOverflow)
    }

    // ========================================================================
    // Transcendental Functions
    // ========================================================================

    /// x^y computed as exp(y * ln(x))
    ///
    /// The result carries the approximation error of `ln` and `exp` (about
    /// 1e-18 relative), with no guaranteed rounding direction. Callers round
    /// the exponent instead, see the curve functions.
    pub fn pow(self, y: Self) -> CoreResult<Self> {
        if y.is_zero() {
            return Ok(Self::ONE);
        }
        if self.is_zero() {
            return Ok(Self::ZERO);
        }

        let ln_x = ln(I256::from(self.0))?;
        let y_ln_x = I256::from(y.0)
            .checked_mul(ln_x)
            .ok_or(TenorError::ArithmeticOverflow)?
            / I256::new(ONE as i128);
        let result = exp(y_ln_x)?;
        if result > I256::from(u128::MAX) {
            return Err(TenorError::ArithmeticOverflow);
        }

        Ok(Self(result.as_u128()))
    }

    /// Signed natural logarithm in 18-decimal raw form
    pub fn ln(self) -> CoreResult<i128> {
        let value = ln(I256::from(self.0))?;
        Ok(value.as_i128())
    }

    /// e^x for a signed 18-decimal raw exponent
    pub fn exp(x: i128) -> CoreResult<Self> {
        let value = exp(I256::new(x))?;
        if value > I256::from(u128::MAX) {
            return Err(TenorError::ArithmeticOverflow);
        }
        Ok(Self(value.as_u128()))
    }
}

// ============================================================================
// Signed Helpers
// ============================================================================

/// Add a signed raw delta to an unsigned value
pub fn apply_signed_delta(value: FixedPoint, delta: i128) -> CoreResult<FixedPoint> {
    if delta >= 0 {
        value.safe_add(FixedPoint::from_raw(delta as u128))
    } else {
        value.safe_sub(FixedPoint::from_raw(delta.unsigned_abs()))
    }
}

/// Checked signed addition surfacing core errors
pub fn safe_add_i128(a: i128, b: i128) -> CoreResult<i128> {
    a.checked_add(b).ok_or(TenorError::ArithmeticOverflow)
}

/// Checked signed subtraction surfacing core errors
pub fn safe_sub_i128(a: i128, b: i128) -> CoreResult<i128> {
    a.checked_sub(b).ok_or(TenorError::ArithmeticOverflow)
}

// ============================================================================
// Formatting and Parsing
// ============================================================================

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / ONE;
        let fraction = self.0 % ONE;
        if fraction == 0 {
            return write!(f, "{}", whole);
        }
        let digits = format!("{:018}", fraction);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}

impl fmt::Debug for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedPoint({})", self)
    }
}

impl FromStr for FixedPoint {
    type Err = TenorError;

    /// Parse a plain decimal such as `"0.05"` or `"500000000"` exactly
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().replace('_', "");
        let invalid = || TenorError::invalid_config("fixed_point", "not a non-negative decimal");

        let (whole, fraction) = match s.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (s.as_str(), ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if fraction.len() > DECIMALS as usize {
            return Err(invalid());
        }
        if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| invalid())? };
        let fraction: u128 = if fraction.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", fraction, width = DECIMALS as usize);
            padded.parse().map_err(|_| invalid())?
        };

        whole
            .checked_mul(ONE)
            .and_then(|w| w.checked_add(fraction))
            .map(Self)
            .ok_or(TenorError::ArithmeticOverflow)
    }
}

impl From<u64> for FixedPoint {
    fn from(value: u64) -> Self {
        Self::from_int(value)
    }
}

#[cfg(feature = "client")]
impl serde::Serialize for FixedPoint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(feature = "client")]
impl<'de> serde::Deserialize<'de> for FixedPoint {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
pub(crate) fn fixed(literal: &str) -> FixedPoint {
    literal.parse().expect("valid fixed-point literal")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_rounding_directions() {
        let third = FixedPoint::ONE.div_down(FixedPoint::from_int(3)).unwrap();
        let third_up = FixedPoint::ONE.div_up(FixedPoint::from_int(3)).unwrap();
        assert_eq!(third_up.raw() - third.raw(), 1);

        let x = fixed("1.5");
        assert_eq!(x.mul_down(fixed("2")).unwrap(), fixed("3"));
        assert_eq!(fixed("0.000000000000000001").mul_down(fixed("0.5")).unwrap(), FixedPoint::ZERO);
        assert_eq!(
            fixed("0.000000000000000001").mul_up(fixed("0.5")).unwrap(),
            fixed("0.000000000000000001")
        );
    }

    #[test]
    fn test_sub_underflow_is_typed() {
        let result = FixedPoint::ONE.safe_sub(FixedPoint::from_int(2));
        assert_eq!(result, Err(TenorError::ArithmeticUnderflow));
        assert_eq!(FixedPoint::ONE.saturating_sub(FixedPoint::from_int(2)), FixedPoint::ZERO);
    }

    #[test]
    fn test_pow() {
        assert_eq!(fixed("7").pow(FixedPoint::ZERO).unwrap(), FixedPoint::ONE);
        assert_eq!(FixedPoint::ZERO.pow(fixed("2")).unwrap(), FixedPoint::ZERO);
        assert_eq!(FixedPoint::ONE.pow(fixed("0.3")).unwrap(), FixedPoint::ONE);

        let root = fixed("2").pow(fixed("0.5")).unwrap().to_f64();
        assert!((root - std::f64::consts::SQRT_2).abs() < 1e-12);

        let compounded = fixed("0.95").pow(fixed("22")).unwrap().to_f64();
        assert!((compounded - 0.95_f64.powi(22)).abs() < 1e-12);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(fixed("0.05").raw(), ONE / 20);
        assert_eq!(fixed("500_000_000"), FixedPoint::from_int(500_000_000));
        assert_eq!(fixed("1.250").to_string(), "1.25");
        assert_eq!(FixedPoint::from_int(3).to_string(), "3");
        assert!("1.2.3".parse::<FixedPoint>().is_err());
        assert!("-1".parse::<FixedPoint>().is_err());
        assert!("0.0000000000000000001".parse::<FixedPoint>().is_err());
    }

    #[test]
    fn test_signed_delta() {
        let base = FixedPoint::from_int(10);
        assert_eq!(apply_signed_delta(base, 5 * ONE as i128).unwrap(), FixedPoint::from_int(15));
        assert_eq!(apply_signed_delta(base, -(4 * ONE as i128)).unwrap(), FixedPoint::from_int(6));
        assert_eq!(
            apply_signed_delta(base, -(11 * ONE as i128)),
            Err(TenorError::ArithmeticUnderflow)
        );
    }
}
