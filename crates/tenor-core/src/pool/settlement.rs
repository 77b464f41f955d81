//! Checkpoint application: minting buckets, the weighted spot price, zombie
//! interest and settlement of positions at maturity.

use tracing::{debug, warn};

use crate::checkpoint::{latest_checkpoint, Checkpoint};
use crate::curve::{matured_proceeds, short_proceeds_down};
use crate::errors::{CoreResult, TenorError};
use crate::lp::{distribute_excess_idle, update_liquidity};
use crate::math::big_int::weighted_mean;
use crate::math::{FixedPoint, Rounding};
use crate::position::{remove_longs, remove_shorts, update_long_exposure};
use crate::work_unit::WorkUnit;

/// Validate and apply a caller-requested checkpoint
pub(super) fn checkpoint(unit: &mut WorkUnit, checkpoint_time: u64) -> CoreResult<Checkpoint> {
    let duration = unit.config().checkpoint_duration;
    let latest = latest_checkpoint(unit.now(), duration);
    if checkpoint_time % duration != 0 || checkpoint_time > latest {
        return Err(TenorError::InvalidCheckpointTime);
    }
    unit.state().ensure_initialized()?;
    if unit.checkpoint_origin().is_some_and(|origin| checkpoint_time < origin) {
        return Err(TenorError::InvalidCheckpointTime);
    }

    apply_checkpoint(unit, latest)?;
    if checkpoint_time != latest {
        apply_checkpoint(unit, checkpoint_time)?;
    }
    Ok(unit.checkpoint(checkpoint_time))
}

/// Mint the checkpoint at `checkpoint_time` if it is missing and settle the
/// positions maturing there. Returns the checkpoint's vault share price.
pub(crate) fn apply_checkpoint(unit: &mut WorkUnit, checkpoint_time: u64) -> CoreResult<FixedPoint> {
    let existing = unit.checkpoint(checkpoint_time);
    if existing.is_minted() {
        return Ok(existing.vault_share_price);
    }

    let duration = unit.config().checkpoint_duration;
    let now = unit.now();
    let latest = latest_checkpoint(now, duration);
    if checkpoint_time > latest {
        return Err(TenorError::InvalidCheckpointTime);
    }

    // A backfilled bucket borrows the price of the next bucket that exists
    let current_price = unit.vault_share_price();
    let vault_share_price = if checkpoint_time == latest {
        current_price
    } else {
        unit.next_minted_after(checkpoint_time, latest)
            .map(|(_, later)| later.vault_share_price)
            .unwrap_or(current_price)
    };
    if vault_share_price.is_zero() {
        return Err(TenorError::NegativeInterest);
    }

    let spot_price = unit.view().spot_price()?;
    let mut minted = existing;
    minted.vault_share_price = vault_share_price;
    minted.weighted_spot_price = spot_price;
    if checkpoint_time == latest {
        // The previous bucket's average runs up to this bucket's start
        if let Some(previous_time) = checkpoint_time.checked_sub(duration) {
            let mut previous = unit.checkpoint(previous_time);
            if previous.is_minted() && previous.last_weighted_spot_price_update_time < checkpoint_time {
                update_weighted_spot_price(&mut previous, previous_time, checkpoint_time, spot_price)?;
                unit.set_checkpoint(previous_time, previous)?;
            }
        }
        minted.last_weighted_spot_price_update_time = now;
    } else {
        minted.last_weighted_spot_price_update_time = checkpoint_time;
    }
    unit.set_checkpoint(checkpoint_time, minted)?;

    debug!(
        checkpoint_time,
        vault_share_price = %vault_share_price,
        backfilled = checkpoint_time != latest,
        "checkpoint minted"
    );

    collect_zombie_interest(unit)?;
    settle_matured_positions(unit, checkpoint_time, vault_share_price)?;

    Ok(vault_share_price)
}

/// Fold the current spot price into the latest checkpoint's average
pub(crate) fn record_spot_price(unit: &mut WorkUnit) -> CoreResult<()> {
    let latest = latest_checkpoint(unit.now(), unit.config().checkpoint_duration);
    let mut checkpoint = unit.checkpoint(latest);
    if !checkpoint.is_minted() || checkpoint.last_weighted_spot_price_update_time >= unit.now() {
        return Ok(());
    }
    let spot_price = unit.view().spot_price()?;
    update_weighted_spot_price(&mut checkpoint, latest, unit.now(), spot_price)?;
    unit.set_checkpoint(latest, checkpoint)
}

fn update_weighted_spot_price(
    checkpoint: &mut Checkpoint,
    checkpoint_time: u64,
    update_time: u64,
    spot_price: FixedPoint,
) -> CoreResult<()> {
    let last_update = checkpoint.last_weighted_spot_price_update_time;
    if update_time <= last_update {
        return Ok(());
    }

    let elapsed = last_update.saturating_sub(checkpoint_time);
    let weighted = weighted_mean(
        checkpoint.weighted_spot_price.raw(),
        FixedPoint::from_int(elapsed).raw(),
        spot_price.raw(),
        FixedPoint::from_int(update_time - last_update).raw(),
        Rounding::Down,
    )?;
    checkpoint.weighted_spot_price = FixedPoint::from_raw(weighted);
    checkpoint.last_weighted_spot_price_update_time = update_time;
    Ok(())
}

/// Return interest earned by matured, unclaimed proceeds to the LPs
pub(crate) fn collect_zombie_interest(unit: &mut WorkUnit) -> CoreResult<()> {
    let config = unit.config();
    let c = unit.vault_share_price();
    let state = *unit.state();

    let claimed_shares = state.zombie_base_proceeds.div_up(c)?;
    let interest = state.zombie_share_reserves.saturating_sub(claimed_shares);
    if interest.is_zero() {
        return Ok(());
    }

    let governance_fee = interest.mul_down(config.fees.governance_zombie)?;
    let lp_interest = interest.safe_sub(governance_fee)?;

    let mut next = update_liquidity(&state, config.minimum_share_reserves, lp_interest.to_signed()?)?;
    next.zombie_share_reserves = next.zombie_share_reserves.safe_sub(interest)?;
    next.governance_fees_accrued = next.governance_fees_accrued.safe_add(governance_fee)?;
    unit.set_state(next);

    debug!(interest = %interest, governance_fee = %governance_fee, "zombie interest collected");
    Ok(())
}

/// Move positions maturing at `checkpoint_time` off the curve and into the
/// zombie reserves
fn settle_matured_positions(unit: &mut WorkUnit, checkpoint_time: u64, vault_share_price: FixedPoint) -> CoreResult<()> {
    let checkpoint = unit.checkpoint(checkpoint_time);
    let longs = checkpoint.longs_maturing;
    let shorts = checkpoint.shorts_maturing;
    if longs.is_zero() && shorts.is_zero() {
        return Ok(());
    }

    let config = unit.config();
    let open_vault_share_price = checkpoint_time
        .checked_sub(config.position_duration)
        .map(|open_time| unit.checkpoint(open_time).vault_share_price)
        .filter(|price| !price.is_zero())
        .unwrap_or(vault_share_price);

    let view = unit.view();
    let mut state = view.state;

    if !longs.is_zero() {
        let settled = matured_proceeds(&view, longs, vault_share_price, open_vault_share_price, true)?;
        let outflow = settled.share_proceeds.safe_add(settled.governance_fee)?;
        state.share_reserves = state
            .share_reserves
            .safe_sub(outflow)
            .map_err(|_| TenorError::InsufficientLiquidity)?;
        state.share_adjustment = state
            .share_adjustment
            .checked_add(outflow.to_signed()?)
            .ok_or(TenorError::ArithmeticOverflow)?;
        state.zombie_share_reserves = state.zombie_share_reserves.safe_add(settled.share_proceeds)?;
        state.zombie_base_proceeds = state
            .zombie_base_proceeds
            .safe_add(settled.share_proceeds.mul_down(vault_share_price)?)?;
        state.governance_fees_accrued = state.governance_fees_accrued.safe_add(settled.governance_fee)?;
        remove_longs(&mut state, longs, checkpoint_time)?;
    }

    if !shorts.is_zero() {
        let settled = matured_proceeds(&view, shorts, vault_share_price, open_vault_share_price, false)?;
        let inflow = settled.share_proceeds.safe_sub(settled.governance_fee)?;
        state.share_reserves = state.share_reserves.safe_add(inflow)?;
        state.share_adjustment = state
            .share_adjustment
            .checked_sub(inflow.to_signed()?)
            .ok_or(TenorError::ArithmeticOverflow)?;
        state.governance_fees_accrued = state.governance_fees_accrued.safe_add(settled.governance_fee)?;

        let trader_shares = short_proceeds_down(
            shorts,
            settled.share_proceeds,
            open_vault_share_price,
            vault_share_price,
            vault_share_price,
            config.fees.flat,
        )?;
        state.zombie_share_reserves = state.zombie_share_reserves.safe_add(trader_shares)?;
        state.zombie_base_proceeds = state
            .zombie_base_proceeds
            .safe_add(trader_shares.mul_down(vault_share_price)?)?;
        remove_shorts(&mut state, shorts, checkpoint_time)?;
    }

    update_long_exposure(&mut state, checkpoint.exposure()?, 0)?;
    unit.set_state(state);

    debug!(
        checkpoint_time,
        longs = %longs,
        shorts = %shorts,
        "matured positions settled"
    );

    match distribute_excess_idle(&unit.view()) {
        Ok((_, next)) => unit.set_state(next),
        Err(error) => warn!(%error, checkpoint_time, "excess idle not distributed"),
    }

    Ok(())
}

/// Pay matured proceeds out of the zombie reserves
///
/// `base_owed` is valued at the maturity price. When the zombie reserves are
/// worth less than the base they owe, every claim takes the same haircut.
pub(crate) fn withdraw_zombie_proceeds(unit: &mut WorkUnit, base_owed: FixedPoint) -> CoreResult<FixedPoint> {
    let c = unit.vault_share_price();
    let mut state = *unit.state();

    let mut share_proceeds = base_owed.div_down(c)?;
    let zombie_value = state.zombie_share_reserves.mul_down(c)?;
    if state.zombie_base_proceeds > zombie_value {
        share_proceeds = share_proceeds.mul_div_down(zombie_value, state.zombie_base_proceeds)?;
    }
    let share_proceeds = share_proceeds.min(state.zombie_share_reserves);

    state.zombie_base_proceeds = state.zombie_base_proceeds.saturating_sub(base_owed);
    state.zombie_share_reserves = state.zombie_share_reserves.saturating_sub(share_proceeds);
    unit.set_state(state);

    Ok(share_proceeds)
}
