//! # Position Accounting
//!
//! Aggregate long and short bookkeeping, long exposure and the pool's
//! present value.
//!
//! Present value is what the LPs would hold if every open position were
//! closed right now: the part of each position that has matured is settled
//! flat at par, the rest is traded against the curve.

use tracing::warn;

use crate::errors::{CoreResult, TenorError};
use crate::market::PoolView;
use crate::math::fixed_point::{safe_add_i128, safe_sub_i128};
use crate::math::{update_weighted_average, FixedPoint};
use crate::types::PoolState;

// ============================================================================
// Open Interest
// ============================================================================

pub fn add_longs(state: &mut PoolState, bonds: FixedPoint, maturity_time: u64) -> CoreResult<()> {
    state.long_average_maturity_time = update_weighted_average(
        state.long_average_maturity_time,
        state.longs_outstanding,
        FixedPoint::from_int(maturity_time),
        bonds,
        true,
    )?;
    state.longs_outstanding = state.longs_outstanding.safe_add(bonds)?;
    Ok(())
}

pub fn remove_longs(state: &mut PoolState, bonds: FixedPoint, maturity_time: u64) -> CoreResult<()> {
    state.long_average_maturity_time = update_weighted_average(
        state.long_average_maturity_time,
        state.longs_outstanding,
        FixedPoint::from_int(maturity_time),
        bonds,
        false,
    )?;
    state.longs_outstanding = state.longs_outstanding.safe_sub(bonds)?;
    Ok(())
}

pub fn add_shorts(state: &mut PoolState, bonds: FixedPoint, maturity_time: u64) -> CoreResult<()> {
    state.short_average_maturity_time = update_weighted_average(
        state.short_average_maturity_time,
        state.shorts_outstanding,
        FixedPoint::from_int(maturity_time),
        bonds,
        true,
    )?;
    state.shorts_outstanding = state.shorts_outstanding.safe_add(bonds)?;
    Ok(())
}

pub fn remove_shorts(state: &mut PoolState, bonds: FixedPoint, maturity_time: u64) -> CoreResult<()> {
    state.short_average_maturity_time = update_weighted_average(
        state.short_average_maturity_time,
        state.shorts_outstanding,
        FixedPoint::from_int(maturity_time),
        bonds,
        false,
    )?;
    state.shorts_outstanding = state.shorts_outstanding.safe_sub(bonds)?;
    Ok(())
}

/// Move global long exposure after one checkpoint's exposure changed
///
/// Longs and shorts in the same checkpoint net against each other; only a
/// checkpoint's positive net long counts towards the global exposure.
pub fn update_long_exposure(state: &mut PoolState, before: i128, after: i128) -> CoreResult<()> {
    let before = FixedPoint::from_raw(before.max(0) as u128);
    let after = FixedPoint::from_raw(after.max(0) as u128);
    state.long_exposure = state.long_exposure.safe_sub(before)?.safe_add(after)?;
    Ok(())
}

// ============================================================================
// Present Value
// ============================================================================

/// Net bonds the curve would have to absorb to close every position
///
/// Positive when the pool is net long (traders hold more long curve
/// exposure than short), negative when net short. Raw 18 decimals.
pub fn net_curve_position(view: &PoolView) -> CoreResult<i128> {
    let state = &view.state;
    let long_time = view.time_remaining_scaled(state.long_average_maturity_time)?;
    let short_time = view.time_remaining_scaled(state.short_average_maturity_time)?;

    let longs = state.longs_outstanding.mul_up(long_time)?.to_signed()?;
    let shorts = state.shorts_outstanding.mul_down(short_time)?.to_signed()?;
    safe_sub_i128(longs, shorts)
}

/// Signed shares the pool gains (positive) or pays (negative) when the net
/// curve position is closed
pub fn net_curve_trade(view: &PoolView) -> CoreResult<i128> {
    let position = net_curve_position(view)?;
    let curve = view.curve()?;

    if position > 0 {
        let bonds = FixedPoint::from_raw(position as u128);
        let floor = view.effective_share_reserves_floor()?;
        let effective = curve.effective_share_reserves;
        if effective <= floor {
            return Ok(0);
        }

        let max_bonds_in = curve.max_sell_bonds_in(floor).unwrap_or(FixedPoint::ZERO);
        if max_bonds_in >= bonds {
            if let Ok(shares) = curve.shares_out_given_bonds_in_down(bonds) {
                return Ok(-shares.to_signed()?);
            }
        }

        // The curve cannot absorb every long: unbacked longs are marked worthless
        let available = effective.safe_sub(floor)?;
        return Ok(-available.to_signed()?);
    }

    if position < 0 {
        let bonds = FixedPoint::from_raw(position.unsigned_abs());
        let max_bonds_out = curve.max_buy_bonds_out().unwrap_or(FixedPoint::ZERO);
        if max_bonds_out >= bonds {
            return curve.shares_in_given_bonds_out_down(bonds)?.to_signed();
        }

        // Past the curve's limit, the remainder trades at par
        let max_shares_in = curve.max_buy_shares_in().unwrap_or(FixedPoint::ZERO);
        let remainder = bonds.safe_sub(max_bonds_out)?.div_down(view.vault_share_price)?;
        return max_shares_in.safe_add(remainder)?.to_signed();
    }

    Ok(0)
}

/// Signed shares from settling the matured portion of every position at par
pub fn net_flat_trade(view: &PoolView) -> CoreResult<i128> {
    let state = &view.state;
    let c = view.vault_share_price;
    let long_time = view.time_remaining_scaled(state.long_average_maturity_time)?;
    let short_time = view.time_remaining_scaled(state.short_average_maturity_time)?;

    let shorts = state
        .shorts_outstanding
        .mul_div_down(FixedPoint::ONE.safe_sub(short_time)?, c)?
        .to_signed()?;
    let longs = state
        .longs_outstanding
        .mul_div_up(FixedPoint::ONE.safe_sub(long_time)?, c)?
        .to_signed()?;
    safe_sub_i128(shorts, longs)
}

/// Present value of the pool in shares, clamped at zero
pub fn present_value(view: &PoolView) -> CoreResult<FixedPoint> {
    let raw = present_value_signed(view)?;
    if raw < 0 {
        warn!(
            present_value = raw,
            share_reserves = %view.state.share_reserves,
            "present value is negative, clamping to zero"
        );
        return Ok(FixedPoint::ZERO);
    }
    Ok(FixedPoint::from_raw(raw as u128))
}

/// Unclamped present value (raw 18 decimals)
pub fn present_value_signed(view: &PoolView) -> CoreResult<i128> {
    let share_reserves = view.state.share_reserves.to_signed()?;
    let minimum = view.config.minimum_share_reserves.to_signed()?;

    let value = safe_add_i128(share_reserves, net_curve_trade(view)?)?;
    let value = safe_add_i128(value, net_flat_trade(view)?)?;
    safe_sub_i128(value, minimum).map_err(|_| TenorError::ArithmeticUnderflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{ONE, SECONDS_PER_DAY};
    use crate::math::fixed_point::fixed;
    use crate::types::PoolConfig;

    fn pool_state() -> PoolState {
        PoolState {
            share_reserves: fixed("1000000"),
            bond_reserves: fixed("2000000"),
            share_adjustment: 0,
            initialized: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_average_maturity_tracks_weights() {
        let mut state = PoolState::default();
        add_longs(&mut state, fixed("100"), 1_000).unwrap();
        add_longs(&mut state, fixed("300"), 2_000).unwrap();
        assert_eq!(state.longs_outstanding, fixed("400"));
        assert_eq!(state.long_average_maturity_time, fixed("1750"));

        remove_longs(&mut state, fixed("300"), 2_000).unwrap();
        assert_eq!(state.long_average_maturity_time, fixed("1000"));
        remove_longs(&mut state, fixed("100"), 1_000).unwrap();
        assert_eq!(state.long_average_maturity_time, FixedPoint::ZERO);
        assert_eq!(state.longs_outstanding, FixedPoint::ZERO);
    }

    #[test]
    fn test_long_exposure_nets_within_checkpoint() {
        let mut state = PoolState::default();
        update_long_exposure(&mut state, 0, 50 * ONE as i128).unwrap();
        assert_eq!(state.long_exposure, fixed("50"));

        // Shorts in the same checkpoint offset the longs
        update_long_exposure(&mut state, 50 * ONE as i128, -(10 * ONE as i128)).unwrap();
        assert_eq!(state.long_exposure, FixedPoint::ZERO);
    }

    #[test]
    fn test_present_value_without_positions() {
        let config = PoolConfig::builder().build().unwrap();
        let view = PoolView::new(&config, pool_state(), FixedPoint::ONE, SECONDS_PER_DAY);
        assert_eq!(present_value(&view).unwrap(), fixed("999990"));
    }

    #[test]
    fn test_matured_longs_are_valued_flat() {
        let config = PoolConfig::builder().build().unwrap();
        let mut state = pool_state();
        state.longs_outstanding = fixed("1000");
        state.long_average_maturity_time = FixedPoint::from_int(SECONDS_PER_DAY);
        let view = PoolView::new(&config, state, fixed("2"), 10 * SECONDS_PER_DAY);

        assert_eq!(net_curve_position(&view).unwrap(), 0);
        assert_eq!(net_flat_trade(&view).unwrap(), -(500 * ONE as i128));
        assert_eq!(present_value(&view).unwrap(), fixed("999490"));
    }

    #[test]
    fn test_open_longs_cost_less_than_par() {
        let config = PoolConfig::builder().build().unwrap();
        let mut state = pool_state();
        state.longs_outstanding = fixed("1000");
        state.long_average_maturity_time = FixedPoint::from_int(SECONDS_PER_DAY + config.position_duration);
        let view = PoolView::new(&config, state, FixedPoint::ONE, SECONDS_PER_DAY);

        let trade = net_curve_trade(&view).unwrap();
        assert!(trade < 0);
        assert!(trade > -(1000 * ONE as i128), "bonds are bought back below par");
    }

    #[test]
    fn test_present_value_clamps_to_zero() {
        let config = PoolConfig::builder().build().unwrap();
        let mut state = pool_state();
        state.share_reserves = fixed("20");
        state.bond_reserves = fixed("40");
        state.longs_outstanding = fixed("1000");
        state.long_average_maturity_time = FixedPoint::from_int(SECONDS_PER_DAY);
        let view = PoolView::new(&config, state, FixedPoint::ONE, 10 * SECONDS_PER_DAY);

        assert!(present_value_signed(&view).unwrap() < 0);
        assert_eq!(present_value(&view).unwrap(), FixedPoint::ZERO);
    }
}
