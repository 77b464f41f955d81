//! # YieldSpace Curve
//!
//! The invariant priced by the pool:
//!
//! ```text
//! k = (c / mu) * (mu * z_e)^(1 - ts) + y^(1 - ts)
//! ```
//!
//! where `z_e` is the effective share reserves, `y` the bond reserves, `c`
//! the current vault share price, `mu` the initial vault share price and
//! `ts` the time stretch. Spot price of a bond in base is
//! `(mu * z_e / y)^ts`.
//!
//! Every solver names the direction it rounds in. `pow` has no guaranteed
//! rounding, so the invariant and the exponents are rounded instead: when
//! a result should round up, a base at or above one takes the rounded-up
//! exponent and a base below one the rounded-down exponent.

use crate::constants::SECONDS_PER_YEAR;
use crate::errors::{CoreResult, TenorError};
use crate::math::big_int::Rounding;
use crate::math::fixed_point::FixedPoint;

/// Curve snapshot: reserves plus the parameters that shape the invariant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YieldSpace {
    pub effective_share_reserves: FixedPoint,
    pub bond_reserves: FixedPoint,
    pub time_stretch: FixedPoint,
    pub vault_share_price: FixedPoint,
    pub initial_vault_share_price: FixedPoint,
}

impl YieldSpace {
    pub fn new(
        effective_share_reserves: FixedPoint,
        bond_reserves: FixedPoint,
        time_stretch: FixedPoint,
        vault_share_price: FixedPoint,
        initial_vault_share_price: FixedPoint,
    ) -> Self {
        Self {
            effective_share_reserves,
            bond_reserves,
            time_stretch,
            vault_share_price,
            initial_vault_share_price,
        }
    }

    /// Same curve parameters with different reserves
    pub fn with_reserves(self, effective_share_reserves: FixedPoint, bond_reserves: FixedPoint) -> Self {
        Self {
            effective_share_reserves,
            bond_reserves,
            ..self
        }
    }

    /// `1 - ts`
    fn exponent(&self) -> CoreResult<FixedPoint> {
        FixedPoint::ONE.safe_sub(self.time_stretch)
    }

    // ========================================================================
    // Invariant
    // ========================================================================

    pub fn k_down(&self) -> CoreResult<FixedPoint> {
        let t = self.exponent()?;
        let mu = self.initial_vault_share_price;
        let shares_term = self
            .vault_share_price
            .mul_div_down(mu.mul_down(self.effective_share_reserves)?.pow(t)?, mu)?;
        shares_term.safe_add(self.bond_reserves.pow(t)?)
    }

    pub fn k_up(&self) -> CoreResult<FixedPoint> {
        let t = self.exponent()?;
        let mu = self.initial_vault_share_price;
        let shares_term = self
            .vault_share_price
            .mul_div_up(mu.mul_up(self.effective_share_reserves)?.pow(t)?, mu)?;
        shares_term.safe_add(self.bond_reserves.pow(t)?)
    }

    // ========================================================================
    // Trade Solvers
    // ========================================================================

    /// Bonds the curve pays out for `dz` shares in
    pub fn bonds_out_given_shares_in_down(&self, dz: FixedPoint) -> CoreResult<FixedPoint> {
        let t = self.exponent()?;
        let mu = self.initial_vault_share_price;
        let k = self.k_up()?;

        let ze = mu.mul_up(self.effective_share_reserves.safe_add(dz)?)?.pow(t)?;
        let ze = self.vault_share_price.mul_div_up(ze, mu)?;
        let y = root(shortfall(k, ze)?, t, Rounding::Up)?;

        shortfall(self.bond_reserves, y)
    }

    /// Shares the curve requires to pay out `dy` bonds, rounded up
    pub fn shares_in_given_bonds_out_up(&self, dy: FixedPoint) -> CoreResult<FixedPoint> {
        let t = self.exponent()?;
        let mu = self.initial_vault_share_price;
        let k = self.k_up()?;

        let y = shortfall(self.bond_reserves, dy)?.pow(t)?;
        let ze = shortfall(k, y)?.mul_div_up(mu, self.vault_share_price)?;
        let ze = root(ze, t, Rounding::Up)?.div_up(mu)?;

        shortfall(ze, self.effective_share_reserves)
    }

    /// Shares the curve requires to pay out `dy` bonds, rounded down
    ///
    /// Used when valuing the pool's own obligations, where overstating the
    /// cost would overstate what LPs owe.
    pub fn shares_in_given_bonds_out_down(&self, dy: FixedPoint) -> CoreResult<FixedPoint> {
        let t = self.exponent()?;
        let mu = self.initial_vault_share_price;
        let k = self.k_down()?;

        let y = shortfall(self.bond_reserves, dy)?.pow(t)?;
        let ze = shortfall(k, y)?.mul_div_down(mu, self.vault_share_price)?;
        let ze = root(ze, t, Rounding::Down)?.div_down(mu)?;

        shortfall(ze, self.effective_share_reserves)
    }

    /// Shares the curve pays out for `dy` bonds in
    pub fn shares_out_given_bonds_in_down(&self, dy: FixedPoint) -> CoreResult<FixedPoint> {
        let t = self.exponent()?;
        let mu = self.initial_vault_share_price;
        let k = self.k_up()?;

        let y = self.bond_reserves.safe_add(dy)?.pow(t)?;
        let ze = shortfall(k, y)?.mul_div_up(mu, self.vault_share_price)?;
        let ze = root(ze, t, Rounding::Up)?.div_up(mu)?;

        shortfall(self.effective_share_reserves, ze)
    }

    // ========================================================================
    // Curve Limits
    // ========================================================================

    /// Shares that push the spot price to one when buying bonds
    pub fn max_buy_shares_in(&self) -> CoreResult<FixedPoint> {
        let t = self.exponent()?;
        let mu = self.initial_vault_share_price;
        let k = self.k_down()?;

        let denominator = self.vault_share_price.div_up(mu)?.safe_add(FixedPoint::ONE)?;
        let optimal_ze = root(k.div_down(denominator)?, t, Rounding::Down)?.div_down(mu)?;

        shortfall(optimal_ze, self.effective_share_reserves)
    }

    /// Bonds paid out when the spot price is pushed to one
    pub fn max_buy_bonds_out(&self) -> CoreResult<FixedPoint> {
        let t = self.exponent()?;
        let mu = self.initial_vault_share_price;
        let k = self.k_up()?;

        let denominator = self.vault_share_price.div_down(mu)?.safe_add(FixedPoint::ONE)?;
        let optimal_y = root(k.div_up(denominator)?, t, Rounding::Up)?;

        shortfall(self.bond_reserves, optimal_y)
    }

    /// Bonds that can be sold before effective share reserves reach `ze_floor`
    pub fn max_sell_bonds_in(&self, ze_floor: FixedPoint) -> CoreResult<FixedPoint> {
        let t = self.exponent()?;
        let mu = self.initial_vault_share_price;
        let k = self.k_down()?;

        let floor_term = self
            .vault_share_price
            .mul_div_up(mu.mul_up(ze_floor)?.pow(t)?, mu)?;
        let optimal_y = root(shortfall(k, floor_term)?, t, Rounding::Down)?;

        shortfall(optimal_y, self.bond_reserves)
    }

    // ========================================================================
    // Prices and Rates
    // ========================================================================

    /// Spot price of one bond in base: `(mu * z_e / y)^ts`
    pub fn spot_price(&self) -> CoreResult<FixedPoint> {
        if self.bond_reserves.is_zero() {
            return Err(TenorError::DivisionByZero);
        }
        self.initial_vault_share_price
            .mul_div_down(self.effective_share_reserves, self.bond_reserves)?
            .pow(self.time_stretch)
    }

    /// Reserves on the current invariant whose spot rate equals `rate`
    ///
    /// Ignores open exposure; the caller decides whether the resulting
    /// reserves are admissible.
    pub fn reserves_given_rate(
        &self,
        rate: FixedPoint,
        position_duration: u64,
    ) -> CoreResult<(FixedPoint, FixedPoint)> {
        if self.time_stretch.is_zero() {
            return Err(TenorError::invalid_config("time_stretch", "must be positive"));
        }
        let t = self.exponent()?;
        let mu = self.initial_vault_share_price;
        let k = self.k_down()?;

        // (1 + r * t)^(1 / ts)
        let years = FixedPoint::from_int(position_duration).div_down(FixedPoint::from_int(SECONDS_PER_YEAR))?;
        let scaled_rate = rate
            .mul_up(years)?
            .safe_add(FixedPoint::ONE)?
            .pow(FixedPoint::ONE.div_up(self.time_stretch)?)?;

        let denominator = self
            .vault_share_price
            .div_up(mu)?
            .safe_add(scaled_rate.pow(t)?)?;
        let inner = root(k.div_down(denominator)?, t, Rounding::Down)?;

        Ok((inner.div_down(mu)?, inner.mul_down(scaled_rate)?))
    }
}

/// `base^(1/t)`, with the exponent rounded so the result errs towards `rounding`
fn root(base: FixedPoint, t: FixedPoint, rounding: Rounding) -> CoreResult<FixedPoint> {
    let round_exponent_up = (base >= FixedPoint::ONE) == (rounding == Rounding::Up);
    let exponent = if round_exponent_up {
        FixedPoint::ONE.div_up(t)?
    } else {
        FixedPoint::ONE.div_down(t)?
    };
    base.pow(exponent)
}

/// Subtraction where running out means the curve cannot honor the trade
fn shortfall(a: FixedPoint, b: FixedPoint) -> CoreResult<FixedPoint> {
    a.safe_sub(b).map_err(|_| TenorError::InsufficientLiquidity)
}
