//! # LP Accounting
//!
//! Liquidity resizing, idle reserves and the distribution of excess idle
//! capital to withdrawal shares.
//!
//! Adding or removing liquidity rescales the share reserves, the share
//! adjustment and the bond reserves together, so the spot price is left
//! unchanged. Withdrawal shares are paid out of idle reserves whenever the
//! pool can release shares without lowering the LP share price.

use tracing::debug;

use crate::constants::{SHARE_PROCEEDS_MAX_ITERATIONS, SHARE_PROCEEDS_TOLERANCE};
use crate::errors::{CoreResult, TenorError};
use crate::market::PoolView;
use crate::math::fixed_point::apply_signed_delta;
use crate::math::{mul_div, FixedPoint, Rounding};
use crate::position::{net_curve_position, present_value};
use crate::types::PoolState;

// ============================================================================
// Reserves
// ============================================================================

/// Resize the pool by `share_reserves_delta` shares at a constant spot price
pub fn update_liquidity(
    state: &PoolState,
    minimum_share_reserves: FixedPoint,
    share_reserves_delta: i128,
) -> CoreResult<PoolState> {
    if share_reserves_delta == 0 {
        return Ok(*state);
    }

    let share_reserves = state.share_reserves;
    if share_reserves.is_zero() {
        return Err(TenorError::DivisionByZero);
    }
    let effective = state.effective_share_reserves()?;

    let updated = apply_signed_delta(share_reserves, share_reserves_delta)
        .map_err(|_| TenorError::InvalidShareReserves)?;
    if updated < minimum_share_reserves {
        return Err(TenorError::InvalidShareReserves);
    }

    let adjustment_magnitude = mul_div(
        state.share_adjustment.unsigned_abs(),
        updated.raw(),
        share_reserves.raw(),
        Rounding::Down,
    )?;
    let adjustment_magnitude =
        i128::try_from(adjustment_magnitude).map_err(|_| TenorError::ArithmeticOverflow)?;
    let share_adjustment = if state.share_adjustment < 0 {
        -adjustment_magnitude
    } else {
        adjustment_magnitude
    };

    let mut next = *state;
    next.share_reserves = updated;
    next.share_adjustment = share_adjustment;
    let updated_effective = next.effective_share_reserves()?;
    next.bond_reserves = state.bond_reserves.mul_div_down(updated_effective, effective)?;

    Ok(next)
}

/// Shares not needed to cover long exposure and the minimum reserves
pub fn idle_share_reserves(view: &PoolView) -> CoreResult<FixedPoint> {
    let state = &view.state;
    let exposure_shares = state.long_exposure.div_up(view.vault_share_price)?;
    let locked = exposure_shares.safe_add(view.config.minimum_share_reserves)?;
    Ok(state.share_reserves.saturating_sub(locked))
}

/// Base value of one active LP share, zero when no LP shares are active
pub fn lp_share_price(view: &PoolView) -> CoreResult<FixedPoint> {
    let active = view.state.active_lp_supply()?;
    if active.is_zero() {
        return Ok(FixedPoint::ZERO);
    }
    present_value(view)?.mul_div_down(view.vault_share_price, active)
}

// ============================================================================
// Excess Idle Distribution
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdleDistribution {
    /// Withdrawal shares that become redeemable
    pub withdrawal_shares_redeemed: FixedPoint,
    /// Shares moved out of the reserves to back them
    pub share_proceeds: FixedPoint,
}

impl IdleDistribution {
    pub fn is_empty(&self) -> bool {
        self.withdrawal_shares_redeemed.is_zero() || self.share_proceeds.is_zero()
    }
}

/// Work out how many withdrawal shares idle capital can pay for
pub fn calculate_distribute_excess_idle(view: &PoolView) -> CoreResult<IdleDistribution> {
    let state = &view.state;
    let outstanding = state.outstanding_withdrawal_shares()?;
    if outstanding.is_zero() {
        return Ok(IdleDistribution::default());
    }

    let max_delta = max_share_reserves_delta(view)?;
    if max_delta.is_zero() {
        return Ok(IdleDistribution::default());
    }

    let starting_value = present_value(view)?;
    if starting_value.is_zero() {
        return Ok(IdleDistribution::default());
    }
    let ending_value = present_value_after_removal(view, max_delta)?;
    if ending_value >= starting_value {
        return Ok(IdleDistribution::default());
    }

    // Withdrawal shares the released value is worth, at the current share price
    let active = state.active_lp_supply()?;
    let redeemable = starting_value
        .safe_sub(ending_value)?
        .mul_div_down(active, starting_value)?;
    if redeemable <= outstanding {
        return Ok(IdleDistribution {
            withdrawal_shares_redeemed: redeemable,
            share_proceeds: max_delta,
        });
    }

    // Idle covers every withdrawal share: release only what they are worth
    let target = starting_value.mul_div_up(active.safe_sub(outstanding)?, active)?;
    let share_proceeds = solve_share_proceeds(view, max_delta, starting_value, ending_value, target);

    Ok(IdleDistribution {
        withdrawal_shares_redeemed: outstanding,
        share_proceeds,
    })
}

/// Apply [`calculate_distribute_excess_idle`] to the view's state
pub fn distribute_excess_idle(view: &PoolView) -> CoreResult<(IdleDistribution, PoolState)> {
    let distribution = calculate_distribute_excess_idle(view)?;
    if distribution.is_empty() {
        return Ok((distribution, view.state));
    }

    let mut state = update_liquidity(
        &view.state,
        view.config.minimum_share_reserves,
        -distribution.share_proceeds.to_signed()?,
    )?;
    state.withdrawal_shares_ready_to_withdraw = state
        .withdrawal_shares_ready_to_withdraw
        .safe_add(distribution.withdrawal_shares_redeemed)?;
    state.withdrawal_share_proceeds = state
        .withdrawal_share_proceeds
        .safe_add(distribution.share_proceeds)?;

    debug!(
        withdrawal_shares = %distribution.withdrawal_shares_redeemed,
        share_proceeds = %distribution.share_proceeds,
        "distributed excess idle"
    );

    Ok((distribution, state))
}

/// Most shares removable while the curve can still absorb the net short
fn max_share_reserves_delta(view: &PoolView) -> CoreResult<FixedPoint> {
    let idle = idle_share_reserves(view)?;
    let net_curve = net_curve_position(view)?;
    if net_curve >= 0 {
        return Ok(idle);
    }

    // Shrinking the pool by a factor s shrinks max bonds out by s too
    let max_bonds_out = view
        .curve()?
        .max_buy_bonds_out()
        .unwrap_or(FixedPoint::ZERO);
    if max_bonds_out.is_zero() {
        return Ok(FixedPoint::ZERO);
    }
    let minimum_scale = FixedPoint::from_raw(net_curve.unsigned_abs()).div_up(max_bonds_out)?;
    if minimum_scale >= FixedPoint::ONE {
        return Ok(FixedPoint::ZERO);
    }

    let removable = view
        .state
        .share_reserves
        .mul_down(FixedPoint::ONE.safe_sub(minimum_scale)?)?;
    Ok(idle.min(removable))
}

fn present_value_after_removal(view: &PoolView, share_amount: FixedPoint) -> CoreResult<FixedPoint> {
    let state = update_liquidity(
        &view.state,
        view.config.minimum_share_reserves,
        -share_amount.to_signed()?,
    )?;
    present_value(&view.with_state(state))
}

/// Largest removal in `[0, max_delta]` whose present value stays at or above
/// `target`
///
/// Present value falls as shares are removed. Secant and bisection steps
/// alternate inside the bracket; a candidate that cannot be evaluated counts
/// as removing too much. The lower bracket is returned so the remaining LPs
/// never lose value.
fn solve_share_proceeds(
    view: &PoolView,
    max_delta: FixedPoint,
    starting_value: FixedPoint,
    ending_value: FixedPoint,
    target: FixedPoint,
) -> FixedPoint {
    let (mut low, mut high) = (0u128, max_delta.raw());
    let (mut value_low, mut value_high) = (starting_value.raw(), ending_value.raw());
    let target = target.raw();

    for iteration in 0..SHARE_PROCEEDS_MAX_ITERATIONS {
        if high - low <= SHARE_PROCEEDS_TOLERANCE {
            break;
        }

        let secant = if iteration % 2 == 0 && value_low > value_high {
            mul_div(value_low - target, high - low, value_low - value_high, Rounding::Down)
                .ok()
                .map(|step| low + step)
        } else {
            None
        };
        let candidate = secant
            .unwrap_or(low + (high - low) / 2)
            .clamp(low + 1, high - 1);

        match present_value_after_removal(view, FixedPoint::from_raw(candidate)) {
            Ok(value) if value.raw() >= target => {
                low = candidate;
                value_low = value.raw();
            }
            Ok(value) => {
                high = candidate;
                value_high = value.raw();
            }
            Err(_) => {
                high = candidate;
                value_high = 0;
            }
        }
    }

    FixedPoint::from_raw(low)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{ONE, SECONDS_PER_DAY};
    use crate::math::fixed_point::fixed;
    use crate::types::PoolConfig;

    fn state() -> PoolState {
        PoolState {
            share_reserves: fixed("1000000"),
            bond_reserves: fixed("1500000"),
            lp_total_supply: fixed("1000000"),
            initialized: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_update_liquidity_preserves_spot_price() {
        let config = PoolConfig::builder().build().unwrap();
        let mut before = state();
        before.share_reserves = fixed("1000");
        before.share_adjustment = -(200 * ONE as i128);
        before.bond_reserves = fixed("1500");

        let after = update_liquidity(&before, config.minimum_share_reserves, 1000 * ONE as i128).unwrap();
        assert_eq!(after.share_reserves, fixed("2000"));
        assert_eq!(after.share_adjustment, -(400 * ONE as i128));
        assert_eq!(after.bond_reserves, fixed("3000"));

        let view = PoolView::new(&config, before, FixedPoint::ONE, SECONDS_PER_DAY);
        assert_eq!(view.spot_price().unwrap(), view.with_state(after).spot_price().unwrap());
    }

    #[test]
    fn test_update_liquidity_rejects_below_minimum() {
        let config = PoolConfig::builder().build().unwrap();
        let before = state();
        let delta = -(999_995 * ONE as i128);
        assert_eq!(
            update_liquidity(&before, config.minimum_share_reserves, delta),
            Err(TenorError::InvalidShareReserves)
        );
    }

    #[test]
    fn test_idle_excludes_exposure_and_minimum() {
        let config = PoolConfig::builder().build().unwrap();
        let mut pool = state();
        pool.share_reserves = fixed("1000");
        pool.long_exposure = fixed("200");
        let view = PoolView::new(&config, pool, fixed("2"), SECONDS_PER_DAY);
        assert_eq!(idle_share_reserves(&view).unwrap(), fixed("890"));
    }

    #[test]
    fn test_lp_share_price() {
        let config = PoolConfig::builder().build().unwrap();
        let view = PoolView::new(&config, state(), FixedPoint::ONE, SECONDS_PER_DAY);
        assert_eq!(lp_share_price(&view).unwrap(), fixed("0.99999"));

        let mut empty = state();
        empty.lp_total_supply = FixedPoint::ZERO;
        assert_eq!(lp_share_price(&view.with_state(empty)).unwrap(), FixedPoint::ZERO);
    }

    #[test]
    fn test_no_distribution_without_withdrawal_shares() {
        let config = PoolConfig::builder().build().unwrap();
        let view = PoolView::new(&config, state(), FixedPoint::ONE, SECONDS_PER_DAY);
        let (distribution, after) = distribute_excess_idle(&view).unwrap();
        assert!(distribution.is_empty());
        assert_eq!(after, view.state);
    }

    #[test]
    fn test_partial_distribution_uses_all_idle() {
        let config = PoolConfig::builder().build().unwrap();
        let mut pool = state();
        pool.lp_total_supply = fixed("900000");
        pool.withdrawal_share_total_supply = fixed("100000");
        pool.long_exposure = fixed("990000");
        let view = PoolView::new(&config, pool, FixedPoint::ONE, SECONDS_PER_DAY);

        let (distribution, after) = distribute_excess_idle(&view).unwrap();
        assert_eq!(distribution.share_proceeds, fixed("9990"));
        assert!(distribution.withdrawal_shares_redeemed > fixed("9990"));
        assert!(distribution.withdrawal_shares_redeemed < fixed("9991"));
        assert_eq!(after.share_reserves, fixed("990010"));
        assert_eq!(after.withdrawal_share_proceeds, fixed("9990"));
    }

    #[test]
    fn test_full_distribution_preserves_lp_share_price() {
        let config = PoolConfig::builder().build().unwrap();
        let mut pool = state();
        pool.lp_total_supply = fixed("500000");
        pool.withdrawal_share_total_supply = fixed("500000");
        let view = PoolView::new(&config, pool, FixedPoint::ONE, SECONDS_PER_DAY);
        let price_before = lp_share_price(&view).unwrap();

        let (distribution, after) = distribute_excess_idle(&view).unwrap();
        assert_eq!(distribution.withdrawal_shares_redeemed, fixed("500000"));
        assert!((distribution.share_proceeds.to_f64() - 499_995.0).abs() < 1e-6);
        assert_eq!(after.withdrawal_shares_ready_to_withdraw, fixed("500000"));

        let price_after = lp_share_price(&view.with_state(after)).unwrap();
        assert!(price_after >= price_before);
    }
}
