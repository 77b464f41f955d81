//! # Curve Engine
//!
//! Fee-inclusive pricing of longs and shorts against the YieldSpace curve.
//!
//! A trade before maturity is split by the fraction of the term remaining:
//! that fraction trades on the curve, the matured remainder settles flat at
//! par. Fees:
//!
//! - curve fee: `curve` times the implied interest of the curve portion,
//!   kept by LPs inside the curve
//! - flat fee: `flat` times the flat portion, kept by LPs outside the curve
//! - governance takes `governance_lp` of both
//!
//! Each `simulate_*` function prices a trade and returns the pool state the
//! trade would leave behind, with every check applied. The pool commits that
//! state; the max trade searches only inspect it.

use crate::constants::MAX_TRADE_ITERATIONS;
use crate::errors::{CoreResult, TenorError};
use crate::guard::SolvencyGuard;
use crate::market::PoolView;
use crate::math::fixed_point::safe_add_i128;
use crate::math::{calculate_apr_from_realized_price, FixedPoint};
use crate::position::{add_longs, add_shorts, remove_longs, remove_shorts, update_long_exposure};
use crate::types::PoolState;

// ============================================================================
// Fees and Price Bounds
// ============================================================================

/// Curve fee on an opened long, in bonds: `phi_c * (1/p - 1) * base`
pub fn open_long_curve_fee(base_amount: FixedPoint, spot_price: FixedPoint, curve_fee: FixedPoint) -> CoreResult<FixedPoint> {
    FixedPoint::ONE
        .div_up(spot_price)?
        .saturating_sub(FixedPoint::ONE)
        .mul_up(curve_fee)?
        .mul_up(base_amount)
}

/// Curve fee on the curve portion of a short open or any close, in shares:
/// `phi_c * (1 - p) * bonds * t / c`
pub fn curve_fee_shares(
    bond_amount: FixedPoint,
    time_remaining: FixedPoint,
    spot_price: FixedPoint,
    vault_share_price: FixedPoint,
    curve_fee: FixedPoint,
) -> CoreResult<FixedPoint> {
    FixedPoint::ONE
        .saturating_sub(spot_price)
        .mul_up(curve_fee)?
        .mul_up(bond_amount)?
        .mul_div_up(time_remaining, vault_share_price)
}

/// Flat fee on the matured portion of a trade, in shares
pub fn flat_fee_shares(
    bond_amount: FixedPoint,
    time_remaining: FixedPoint,
    vault_share_price: FixedPoint,
    flat_fee: FixedPoint,
) -> CoreResult<FixedPoint> {
    bond_amount
        .mul_div_up(FixedPoint::ONE.safe_sub(time_remaining)?, vault_share_price)?
        .mul_up(flat_fee)
}

/// Highest ending spot price an opened long may reach before its marginal
/// bond, net of fees, would cost more than par
pub fn max_spot_price(spot_price: FixedPoint, curve_fee: FixedPoint, flat_fee: FixedPoint) -> CoreResult<FixedPoint> {
    let one_minus_flat = FixedPoint::ONE.safe_sub(flat_fee)?;
    let implied_interest = FixedPoint::ONE.div_up(spot_price)?.saturating_sub(FixedPoint::ONE);
    let denominator = FixedPoint::ONE.safe_add(curve_fee.mul_up(implied_interest)?.mul_up(one_minus_flat)?)?;
    one_minus_flat.div_down(denominator)
}

/// Shares a short is entitled to on close:
/// `bonds * c1 / (c0 * c) + bonds * phi_f / c - share_amount`, floored at zero
pub fn short_proceeds_down(
    bond_amount: FixedPoint,
    share_amount: FixedPoint,
    open_vault_share_price: FixedPoint,
    close_vault_share_price: FixedPoint,
    vault_share_price: FixedPoint,
    flat_fee: FixedPoint,
) -> CoreResult<FixedPoint> {
    let bond_factor = bond_amount
        .mul_div_down(close_vault_share_price, open_vault_share_price.mul_up(vault_share_price)?)?
        .safe_add(bond_amount.mul_div_down(flat_fee, vault_share_price)?)?;
    Ok(bond_factor.saturating_sub(share_amount))
}

/// Rounded-up counterpart of [`short_proceeds_down`], used for deposits
pub fn short_proceeds_up(
    bond_amount: FixedPoint,
    share_amount: FixedPoint,
    open_vault_share_price: FixedPoint,
    close_vault_share_price: FixedPoint,
    vault_share_price: FixedPoint,
    flat_fee: FixedPoint,
) -> CoreResult<FixedPoint> {
    let bond_factor = bond_amount
        .mul_div_up(close_vault_share_price, open_vault_share_price.mul_down(vault_share_price)?)?
        .safe_add(bond_amount.mul_div_up(flat_fee, vault_share_price)?)?;
    Ok(bond_factor.saturating_sub(share_amount))
}

// ============================================================================
// Open Long
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenLongQuote {
    pub base_amount: FixedPoint,
    /// Shares paid in, `base / c`
    pub share_amount: FixedPoint,
    /// Bonds the trader receives
    pub bond_proceeds: FixedPoint,
    pub share_reserves_delta: FixedPoint,
    pub bond_reserves_delta: FixedPoint,
    /// Governance fee in shares
    pub governance_fee: FixedPoint,
    /// Spot price before the trade
    pub spot_price: FixedPoint,
    /// Spot price the trade leaves behind
    pub spot_price_after: FixedPoint,
}

impl OpenLongQuote {
    /// Rate locked in by the trade
    pub fn realized_rate(&self, position_duration: u64) -> CoreResult<FixedPoint> {
        let years = crate::math::annualized(position_duration)?;
        calculate_apr_from_realized_price(self.base_amount, self.bond_proceeds, years)
    }
}

pub fn quote_open_long(view: &PoolView, base_amount: FixedPoint) -> CoreResult<OpenLongQuote> {
    let fees = &view.config.fees;
    let c = view.vault_share_price;
    let curve = view.curve()?;

    let share_amount = base_amount.div_down(c)?;
    let spot_price = curve.spot_price()?;
    let curve_bonds = curve.bonds_out_given_shares_in_down(share_amount)?;

    let curve_fee = open_long_curve_fee(base_amount, spot_price, fees.curve)?;
    let governance_bonds = curve_fee.mul_down(fees.governance_lp)?;
    let governance_fee = governance_bonds.mul_div_down(spot_price, c)?;

    let bond_proceeds = curve_bonds
        .safe_sub(curve_fee)
        .map_err(|_| TenorError::NegativeInterest)?;
    let bond_reserves_delta = bond_proceeds.safe_add(governance_bonds)?;
    let share_reserves_delta = share_amount.safe_sub(governance_fee)?;

    // A long must not buy bonds above par once fees are counted
    let ending_curve = curve.with_reserves(
        curve.effective_share_reserves.safe_add(share_reserves_delta)?,
        curve
            .bond_reserves
            .safe_sub(bond_reserves_delta)
            .map_err(|_| TenorError::InsufficientLiquidity)?,
    );
    let ending_spot_price = ending_curve.spot_price()?;
    if ending_spot_price > max_spot_price(spot_price, fees.curve, fees.flat)? {
        return Err(TenorError::NegativeInterest);
    }
    if bond_proceeds < base_amount {
        return Err(TenorError::NegativeInterest);
    }

    Ok(OpenLongQuote {
        base_amount,
        share_amount,
        bond_proceeds,
        share_reserves_delta,
        bond_reserves_delta,
        governance_fee,
        spot_price,
        spot_price_after: ending_spot_price,
    })
}

/// Spot price after opening a long with `base_amount`
pub fn spot_price_after_long(view: &PoolView, base_amount: FixedPoint) -> CoreResult<FixedPoint> {
    Ok(quote_open_long(view, base_amount)?.spot_price_after)
}

/// Price an opened long and the state it leaves behind
///
/// `maturity_exposure` is the exposure already maturing at the checkpoint
/// the new long lands in.
pub fn simulate_open_long(
    view: &PoolView,
    base_amount: FixedPoint,
    maturity_exposure: i128,
) -> CoreResult<(OpenLongQuote, PoolState)> {
    let guard = SolvencyGuard::new(view.config);
    guard.check_minimum_transaction(base_amount)?;

    let quote = quote_open_long(view, base_amount)?;
    let mut state = view.state;
    state.share_reserves = state.share_reserves.safe_add(quote.share_reserves_delta)?;
    state.bond_reserves = state.bond_reserves.safe_sub(quote.bond_reserves_delta)?;
    state.governance_fees_accrued = state.governance_fees_accrued.safe_add(quote.governance_fee)?;

    let maturity_time = view.maturity_for_new_position();
    add_longs(&mut state, quote.bond_proceeds, maturity_time)?;
    let exposure_after = safe_add_i128(maturity_exposure, quote.bond_proceeds.to_signed()?)?;
    update_long_exposure(&mut state, maturity_exposure, exposure_after)?;

    guard.check_solvency(&state, view.vault_share_price)?;

    Ok((quote, state))
}

// ============================================================================
// Open Short
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenShortQuote {
    pub bond_amount: FixedPoint,
    /// Shares leaving the reserves, governance fee included
    pub share_reserves_delta: FixedPoint,
    pub governance_fee: FixedPoint,
    /// Shares the trader posts as margin
    pub share_deposit: FixedPoint,
    pub base_deposit: FixedPoint,
    pub spot_price: FixedPoint,
    pub spot_price_after: FixedPoint,
}

/// `open_vault_share_price` is the price of the checkpoint the short opens in
pub fn quote_open_short(
    view: &PoolView,
    bond_amount: FixedPoint,
    open_vault_share_price: FixedPoint,
) -> CoreResult<OpenShortQuote> {
    let fees = &view.config.fees;
    let c = view.vault_share_price;
    let curve = view.curve()?;

    let spot_price = curve.spot_price()?;
    let curve_shares = curve.shares_out_given_bonds_in_down(bond_amount)?;

    let curve_fee = curve_fee_shares(bond_amount, FixedPoint::ONE, spot_price, c, fees.curve)?;
    let governance_fee = curve_fee.mul_down(fees.governance_lp)?;
    let share_reserves_delta = curve_shares
        .safe_sub(curve_fee.safe_sub(governance_fee)?)
        .map_err(|_| TenorError::InsufficientLiquidity)?;

    // Selling bonds for more than their face value would be negative interest
    let trader_shares = share_reserves_delta.safe_sub(governance_fee)?;
    if trader_shares.mul_up(c)? > bond_amount {
        return Err(TenorError::NegativeInterest);
    }

    let share_deposit = short_proceeds_up(
        bond_amount,
        trader_shares,
        open_vault_share_price,
        c,
        c,
        fees.flat,
    )?;
    let base_deposit = share_deposit.mul_up(c)?;

    let ending_curve = curve.with_reserves(
        curve
            .effective_share_reserves
            .safe_sub(share_reserves_delta)
            .map_err(|_| TenorError::InsufficientLiquidity)?,
        curve.bond_reserves.safe_add(bond_amount)?,
    );

    Ok(OpenShortQuote {
        bond_amount,
        share_reserves_delta,
        governance_fee,
        share_deposit,
        base_deposit,
        spot_price,
        spot_price_after: ending_curve.spot_price()?,
    })
}

/// Spot price after shorting `bond_amount` bonds
pub fn spot_price_after_short(view: &PoolView, bond_amount: FixedPoint) -> CoreResult<FixedPoint> {
    Ok(quote_open_short(view, bond_amount, view.vault_share_price)?.spot_price_after)
}

pub fn simulate_open_short(
    view: &PoolView,
    bond_amount: FixedPoint,
    open_vault_share_price: FixedPoint,
    maturity_exposure: i128,
) -> CoreResult<(OpenShortQuote, PoolState)> {
    let guard = SolvencyGuard::new(view.config);
    guard.check_minimum_transaction(bond_amount)?;

    let quote = quote_open_short(view, bond_amount, open_vault_share_price)?;
    let mut state = view.state;
    state.share_reserves = state
        .share_reserves
        .safe_sub(quote.share_reserves_delta)
        .map_err(|_| TenorError::InsufficientLiquidity)?;
    state.bond_reserves = state.bond_reserves.safe_add(bond_amount)?;
    state.governance_fees_accrued = state.governance_fees_accrued.safe_add(quote.governance_fee)?;

    let maturity_time = view.maturity_for_new_position();
    add_shorts(&mut state, bond_amount, maturity_time)?;
    let exposure_after = maturity_exposure
        .checked_sub(bond_amount.to_signed()?)
        .ok_or(TenorError::ArithmeticOverflow)?;
    update_long_exposure(&mut state, maturity_exposure, exposure_after)?;

    guard.check_share_reserves(&state)?;
    guard.check_solvency(&state, view.vault_share_price)?;

    Ok((quote, state))
}

// ============================================================================
// Close Before Maturity
// ============================================================================

/// Outcome of a close before maturity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseQuote {
    /// Shares paid to the trader
    pub share_proceeds: FixedPoint,
    pub governance_fee: FixedPoint,
    pub spot_price: FixedPoint,
}

/// Close `bond_amount` longs maturing at `maturity_time` before maturity
pub fn simulate_close_long(
    view: &PoolView,
    bond_amount: FixedPoint,
    maturity_time: u64,
    open_vault_share_price: FixedPoint,
    maturity_exposure: i128,
) -> CoreResult<(CloseQuote, PoolState)> {
    let fees = &view.config.fees;
    let c = view.vault_share_price;
    let curve = view.curve()?;
    let time_remaining = view.time_remaining(maturity_time)?;
    let spot_price = curve.spot_price()?;

    // Matured portion settles at par, the rest sells into the curve
    let flat_shares = bond_amount.mul_div_down(FixedPoint::ONE.safe_sub(time_remaining)?, c)?;
    let curve_bonds = bond_amount.mul_down(time_remaining)?;
    let curve_shares = if curve_bonds.is_zero() {
        FixedPoint::ZERO
    } else {
        curve.shares_out_given_bonds_in_down(curve_bonds)?
    };

    let curve_fee = curve_fee_shares(bond_amount, time_remaining, spot_price, c, fees.curve)?;
    let flat_fee = flat_fee_shares(bond_amount, time_remaining, c, fees.flat)?;
    let governance_curve = curve_fee.mul_down(fees.governance_lp)?;
    let governance_flat = flat_fee.mul_down(fees.governance_lp)?;

    let curve_delta = curve_shares.saturating_sub(curve_fee.safe_sub(governance_curve)?);
    let mut share_proceeds = flat_shares
        .safe_add(curve_shares)?
        .saturating_sub(curve_fee.safe_add(flat_fee)?);
    let mut governance_fee = governance_curve.safe_add(governance_flat)?;

    // Negative interest since open is passed on to the long
    if c < open_vault_share_price {
        share_proceeds = share_proceeds.mul_div_down(c, open_vault_share_price)?;
        governance_fee = governance_fee.mul_div_down(c, open_vault_share_price)?;
    }

    let mut state = view.state;
    let outflow = share_proceeds.safe_add(governance_fee)?;
    state.share_reserves = state
        .share_reserves
        .safe_sub(outflow)
        .map_err(|_| TenorError::InsufficientLiquidity)?;
    let flat_move = outflow.to_signed()? - curve_delta.to_signed()?;
    state.share_adjustment = safe_add_i128(state.share_adjustment, flat_move)?;
    state.bond_reserves = state.bond_reserves.safe_add(curve_bonds)?;
    state.governance_fees_accrued = state.governance_fees_accrued.safe_add(governance_fee)?;

    remove_longs(&mut state, bond_amount, maturity_time)?;
    let exposure_after = maturity_exposure
        .checked_sub(bond_amount.to_signed()?)
        .ok_or(TenorError::ArithmeticOverflow)?;
    update_long_exposure(&mut state, maturity_exposure, exposure_after)?;

    SolvencyGuard::new(view.config).check_share_reserves(&state)?;

    Ok((
        CloseQuote {
            share_proceeds,
            governance_fee,
            spot_price,
        },
        state,
    ))
}

/// Close `bond_amount` shorts maturing at `maturity_time` before maturity
pub fn simulate_close_short(
    view: &PoolView,
    bond_amount: FixedPoint,
    maturity_time: u64,
    open_vault_share_price: FixedPoint,
    maturity_exposure: i128,
) -> CoreResult<(CloseQuote, PoolState)> {
    let fees = &view.config.fees;
    let c = view.vault_share_price;
    let curve = view.curve()?;
    let time_remaining = view.time_remaining(maturity_time)?;
    let spot_price = curve.spot_price()?;

    // Matured portion is bought back at par, the rest from the curve
    let flat_shares = bond_amount.mul_div_up(FixedPoint::ONE.safe_sub(time_remaining)?, c)?;
    let curve_bonds = bond_amount.mul_up(time_remaining)?.min(bond_amount);
    let curve_shares = if curve_bonds.is_zero() {
        FixedPoint::ZERO
    } else {
        curve.shares_in_given_bonds_out_up(curve_bonds)?
    };

    let curve_fee = curve_fee_shares(bond_amount, time_remaining, spot_price, c, fees.curve)?;
    let flat_fee = flat_fee_shares(bond_amount, time_remaining, c, fees.flat)?;
    let governance_curve = curve_fee.mul_down(fees.governance_lp)?;
    let governance_flat = flat_fee.mul_down(fees.governance_lp)?;
    let governance_fee = governance_curve.safe_add(governance_flat)?;

    let curve_delta = curve_shares.safe_add(curve_fee.safe_sub(governance_curve)?)?;
    let share_payment = flat_shares
        .safe_add(curve_shares)?
        .safe_add(curve_fee)?
        .safe_add(flat_fee)?;

    // Buying bonds back above par would be negative interest
    if !curve_bonds.is_zero() {
        let ending_curve = curve.with_reserves(
            curve.effective_share_reserves.safe_add(curve_delta)?,
            curve
                .bond_reserves
                .safe_sub(curve_bonds)
                .map_err(|_| TenorError::InsufficientLiquidity)?,
        );
        if ending_curve.spot_price()? > FixedPoint::ONE {
            return Err(TenorError::NegativeInterest);
        }
    }

    let share_proceeds = short_proceeds_down(
        bond_amount,
        share_payment,
        open_vault_share_price,
        c,
        c,
        fees.flat,
    )?;

    let mut state = view.state;
    let inflow = share_payment.safe_sub(governance_fee)?;
    state.share_reserves = state.share_reserves.safe_add(inflow)?;
    let flat_move = inflow.safe_sub(curve_delta)?.to_signed()?;
    state.share_adjustment = state
        .share_adjustment
        .checked_sub(flat_move)
        .ok_or(TenorError::ArithmeticOverflow)?;
    state.bond_reserves = state
        .bond_reserves
        .safe_sub(curve_bonds)
        .map_err(|_| TenorError::InsufficientLiquidity)?;
    state.governance_fees_accrued = state.governance_fees_accrued.safe_add(governance_fee)?;

    remove_shorts(&mut state, bond_amount, maturity_time)?;
    let exposure_after = safe_add_i128(maturity_exposure, bond_amount.to_signed()?)?;
    update_long_exposure(&mut state, maturity_exposure, exposure_after)?;

    Ok((
        CloseQuote {
            share_proceeds,
            governance_fee,
            spot_price,
        },
        state,
    ))
}

// ============================================================================
// Settlement at Maturity
// ============================================================================

/// Shares exchanged when positions settle at their maturity checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaturedProceeds {
    /// Longs: shares owed to the traders. Shorts: shares paid into the pool
    /// for the bonds, flat fee included.
    pub share_proceeds: FixedPoint,
    pub governance_fee: FixedPoint,
}

pub fn matured_proceeds(
    view: &PoolView,
    bond_amount: FixedPoint,
    maturity_vault_share_price: FixedPoint,
    open_vault_share_price: FixedPoint,
    is_long: bool,
) -> CoreResult<MaturedProceeds> {
    let fees = &view.config.fees;
    let gross = bond_amount.div_down(maturity_vault_share_price)?;
    let flat_fee = gross.mul_up(fees.flat)?;
    let mut governance_fee = flat_fee.mul_down(fees.governance_lp)?;

    let mut share_proceeds = if is_long {
        gross.saturating_sub(flat_fee)
    } else {
        gross.safe_add(flat_fee)?
    };

    if open_vault_share_price > maturity_vault_share_price {
        share_proceeds = share_proceeds.mul_div_down(maturity_vault_share_price, open_vault_share_price)?;
        governance_fee = governance_fee.mul_div_down(maturity_vault_share_price, open_vault_share_price)?;
    }

    Ok(MaturedProceeds {
        share_proceeds,
        governance_fee,
    })
}

/// Base owed at maturity to `bond_amount` matured longs or shorts
pub fn matured_base_owed(
    view: &PoolView,
    bond_amount: FixedPoint,
    maturity_vault_share_price: FixedPoint,
    open_vault_share_price: FixedPoint,
    is_long: bool,
) -> CoreResult<FixedPoint> {
    let settled = matured_proceeds(
        view,
        bond_amount,
        maturity_vault_share_price,
        open_vault_share_price,
        is_long,
    )?;
    let trader_shares = if is_long {
        settled.share_proceeds
    } else {
        short_proceeds_down(
            bond_amount,
            settled.share_proceeds,
            open_vault_share_price,
            maturity_vault_share_price,
            maturity_vault_share_price,
            view.config.fees.flat,
        )?
    };
    trader_shares.mul_down(maturity_vault_share_price)
}

// ============================================================================
// Max Trades
// ============================================================================

/// Largest base amount, up to `budget`, that opens a long without tripping
/// the negative interest or solvency checks
pub fn calculate_max_long(view: &PoolView, budget: FixedPoint, maturity_exposure: i128) -> CoreResult<FixedPoint> {
    let curve_cap = view
        .curve()?
        .max_buy_shares_in()
        .unwrap_or(FixedPoint::ZERO)
        .mul_down(view.vault_share_price)?;
    let admissible = |base: FixedPoint| simulate_open_long(view, base, maturity_exposure).is_ok();

    Ok(largest_admissible(
        view.config.minimum_transaction_amount,
        budget.min(curve_cap),
        admissible,
    ))
}

/// Largest bond amount whose short deposit fits in `budget` base and that
/// keeps the reserves and solvency checks passing
pub fn calculate_max_short(
    view: &PoolView,
    budget: FixedPoint,
    open_vault_share_price: FixedPoint,
    maturity_exposure: i128,
) -> CoreResult<FixedPoint> {
    let floor = view.effective_share_reserves_floor()?;
    let curve_cap = view
        .curve()?
        .max_sell_bonds_in(floor)
        .unwrap_or(FixedPoint::ZERO);
    let admissible = |bonds: FixedPoint| {
        simulate_open_short(view, bonds, open_vault_share_price, maturity_exposure)
            .map(|(quote, _)| quote.base_deposit <= budget)
            .unwrap_or(false)
    };

    Ok(largest_admissible(
        view.config.minimum_transaction_amount,
        curve_cap,
        admissible,
    ))
}

/// Base amount, up to `budget`, whose long brings the spot rate down to
/// `target_rate`
///
/// A target the pool cannot reach solvently yields the max long instead.
pub fn calculate_targeted_long(
    view: &PoolView,
    budget: FixedPoint,
    target_rate: FixedPoint,
    maturity_exposure: i128,
) -> CoreResult<FixedPoint> {
    let spot_rate = view.spot_rate()?;
    if target_rate > spot_rate {
        return Err(TenorError::InvalidTargetRate);
    }
    if target_rate == spot_rate {
        return Ok(FixedPoint::ZERO);
    }

    let max_long = calculate_max_long(view, FixedPoint::from_raw(u128::MAX), maturity_exposure)?;
    let above_target = |base: FixedPoint| {
        simulate_open_long(view, base, maturity_exposure)
            .and_then(|(_, state)| view.with_state(state).spot_rate())
            .map(|rate| rate >= target_rate)
            .unwrap_or(false)
    };

    let targeted = largest_admissible(view.config.minimum_transaction_amount, max_long, above_target);
    Ok(targeted.min(budget))
}

/// Bisection for the largest amount in `[low, high]` accepted by a monotone
/// predicate, zero if none is
fn largest_admissible(low: FixedPoint, high: FixedPoint, admissible: impl Fn(FixedPoint) -> bool) -> FixedPoint {
    if high < low || !admissible(low) {
        return FixedPoint::ZERO;
    }
    if admissible(high) {
        return high;
    }

    let (mut low, mut high) = (low.raw(), high.raw());
    for _ in 0..MAX_TRADE_ITERATIONS {
        if high - low <= 1 {
            break;
        }
        let mid = low + (high - low) / 2;
        if admissible(FixedPoint::from_raw(mid)) {
            low = mid;
        } else {
            high = mid;
        }
    }
    FixedPoint::from_raw(low)
}
