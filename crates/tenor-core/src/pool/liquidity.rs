use tracing::info;

use super::prepare_trade;
use super::settlement::apply_checkpoint;
use crate::checkpoint::latest_checkpoint;
use crate::errors::{CoreResult, TenorError};
use crate::guard::SolvencyGuard;
use crate::lp::{distribute_excess_idle, lp_share_price, update_liquidity};
use crate::math::{calculate_apr_from_price, calculate_price_from_apr, FixedPoint};
use crate::position::present_value;
use crate::types::{
    AccountId, AddLiquidityReceipt, AssetId, Effect, InitializeReceipt, PoolConfig, PoolState, RedeemReceipt,
    RemoveLiquidityReceipt,
};
use crate::work_unit::WorkUnit;

// ============================================================================
// Initialization
// ============================================================================

pub(super) fn initialize(
    unit: &mut WorkUnit,
    lp: AccountId,
    contribution: FixedPoint,
    apr: FixedPoint,
) -> CoreResult<InitializeReceipt> {
    if unit.state().initialized {
        return Err(TenorError::AlreadyInitialized);
    }

    let config = unit.config();
    let c = unit.vault_share_price();
    let minimum = config.minimum_share_reserves;

    let share_reserves = contribution.div_down(c)?;
    if share_reserves < minimum.mul_int(2)? {
        return Err(TenorError::BelowMinimumContribution);
    }

    let (bond_reserves, share_adjustment) = initial_reserves(config, c, share_reserves, apr)?;
    let state = unit.state_mut();
    state.share_reserves = share_reserves;
    state.share_adjustment = share_adjustment;
    state.bond_reserves = bond_reserves;
    state.initialized = true;

    // zmin worth of LP shares stays with the zero account for good
    let buffer = minimum.mul_down(c)?;
    let lp_shares = share_reserves.safe_sub(minimum.mul_int(2)?)?.mul_down(c)?;
    state.lp_total_supply = lp_shares.safe_add(buffer)?;

    let latest = latest_checkpoint(unit.now(), config.checkpoint_duration);
    apply_checkpoint(unit, latest)?;

    unit.push_effect(Effect::DepositBase {
        from: lp,
        amount: contribution,
    });
    unit.push_effect(Effect::Mint {
        asset: AssetId::Lp,
        owner: lp,
        amount: lp_shares,
    });
    unit.push_effect(Effect::Mint {
        asset: AssetId::Lp,
        owner: AccountId::ZERO,
        amount: buffer,
    });

    info!(%lp, contribution = %contribution, apr = %apr, lp_shares = %lp_shares, "pool initialized");

    Ok(InitializeReceipt { lp_shares })
}

/// Bond reserves and share adjustment that price the curve at `apr`
///
/// Solves `c*z = c*z_e + p*y` together with `p = (mu*z_e/y)^ts`.
fn initial_reserves(
    config: &PoolConfig,
    vault_share_price: FixedPoint,
    share_reserves: FixedPoint,
    apr: FixedPoint,
) -> CoreResult<(FixedPoint, i128)> {
    let price = calculate_price_from_apr(apr, config.position_duration)?;
    let mu = config.initial_vault_share_price;
    let inverse_stretch = FixedPoint::ONE.div_up(config.time_stretch)?;

    let denominator = vault_share_price
        .mul_down(price.pow(inverse_stretch)?)?
        .safe_add(mu.mul_down(price)?)?;
    let bond_reserves = mu
        .mul_down(vault_share_price)?
        .mul_div_down(share_reserves, denominator)?;
    let zeta = price.mul_div_down(bond_reserves, vault_share_price)?;
    if zeta >= share_reserves {
        return Err(TenorError::InvalidApr);
    }

    Ok((bond_reserves, -zeta.to_signed()?))
}

// ============================================================================
// Adding Liquidity
// ============================================================================

pub(super) fn add_liquidity(
    unit: &mut WorkUnit,
    lp: AccountId,
    contribution: FixedPoint,
    min_lp_share_price: FixedPoint,
) -> CoreResult<AddLiquidityReceipt> {
    let config = unit.config();
    SolvencyGuard::new(config).check_minimum_transaction(contribution)?;
    unit.state().ensure_initialized()?;

    let latest = latest_checkpoint(unit.now(), config.checkpoint_duration);
    apply_checkpoint(unit, latest)?;
    let weighted_price = unit.checkpoint(latest).weighted_spot_price;
    let weighted_rate = calculate_apr_from_price(weighted_price, config.position_duration)?;
    SolvencyGuard::new(config).check_circuit_breaker(unit.view().spot_rate()?, weighted_rate)?;
    prepare_trade(unit)?;

    let view = unit.view();
    let starting_value = present_value(&view)?;
    let share_contribution = contribution.div_down(view.vault_share_price)?;
    let mut state = update_liquidity(
        &view.state,
        config.minimum_share_reserves,
        share_contribution.to_signed()?,
    )?;
    let ending_value = present_value(&view.with_state(state))?;
    if ending_value < starting_value {
        return Err(TenorError::DecreasedPresentValueWhenAddingLiquidity);
    }

    let active = view.state.active_lp_supply()?;
    let lp_shares = ending_value
        .safe_sub(starting_value)?
        .mul_div_down(active, starting_value)?;
    if lp_shares.is_zero() || contribution.div_down(lp_shares)? < min_lp_share_price {
        return Err(TenorError::OutputLimit);
    }
    state.lp_total_supply = state.lp_total_supply.safe_add(lp_shares)?;
    unit.set_state(state);

    let (_, state) = distribute_excess_idle(&unit.view())?;
    unit.set_state(state);
    let share_price = lp_share_price(&unit.view())?;

    unit.push_effect(Effect::DepositBase {
        from: lp,
        amount: contribution,
    });
    unit.push_effect(Effect::Mint {
        asset: AssetId::Lp,
        owner: lp,
        amount: lp_shares,
    });

    info!(%lp, contribution = %contribution, lp_shares = %lp_shares, lp_share_price = %share_price, "liquidity added");

    Ok(AddLiquidityReceipt {
        lp_shares,
        lp_share_price: share_price,
    })
}

// ============================================================================
// Removing Liquidity
// ============================================================================

pub(super) fn remove_liquidity(
    unit: &mut WorkUnit,
    lp: AccountId,
    lp_shares: FixedPoint,
    min_output_per_share: FixedPoint,
) -> CoreResult<RemoveLiquidityReceipt> {
    SolvencyGuard::new(unit.config()).check_minimum_transaction(lp_shares)?;
    prepare_trade(unit)?;

    let state = unit.state_mut();
    state.lp_total_supply = state
        .lp_total_supply
        .safe_sub(lp_shares)
        .map_err(|_| TenorError::InsufficientBalance)?;
    state.withdrawal_share_total_supply = state.withdrawal_share_total_supply.safe_add(lp_shares)?;

    unit.push_effect(Effect::Burn {
        asset: AssetId::Lp,
        owner: lp,
        amount: lp_shares,
    });
    unit.push_effect(Effect::Mint {
        asset: AssetId::WithdrawalShare,
        owner: lp,
        amount: lp_shares,
    });

    let (_, state) = distribute_excess_idle(&unit.view())?;
    unit.set_state(state);

    let redeemed = redeem(unit, lp, lp_shares, min_output_per_share)?;
    let withdrawal_shares = lp_shares.safe_sub(redeemed.shares_redeemed)?;

    info!(
        %lp,
        lp_shares = %lp_shares,
        base = %redeemed.base_proceeds,
        withdrawal_shares = %withdrawal_shares,
        "liquidity removed"
    );

    Ok(RemoveLiquidityReceipt {
        base_proceeds: redeemed.base_proceeds,
        withdrawal_shares,
    })
}

pub(super) fn redeem_withdrawal_shares(
    unit: &mut WorkUnit,
    lp: AccountId,
    withdrawal_shares: FixedPoint,
    min_output_per_share: FixedPoint,
) -> CoreResult<RedeemReceipt> {
    prepare_trade(unit)?;
    let (_, state) = distribute_excess_idle(&unit.view())?;
    unit.set_state(state);

    let receipt = redeem(unit, lp, withdrawal_shares, min_output_per_share)?;
    if !receipt.shares_redeemed.is_zero() {
        info!(%lp, shares = %receipt.shares_redeemed, base = %receipt.base_proceeds, "withdrawal shares redeemed");
    }
    Ok(receipt)
}

/// Pay out up to `withdrawal_shares` of the shares that are ready
fn redeem(
    unit: &mut WorkUnit,
    lp: AccountId,
    withdrawal_shares: FixedPoint,
    min_output_per_share: FixedPoint,
) -> CoreResult<RedeemReceipt> {
    let c = unit.vault_share_price();
    let state: &mut PoolState = unit.state_mut();
    let ready = state.withdrawal_shares_ready_to_withdraw;
    let shares = withdrawal_shares.min(ready);
    if shares.is_zero() {
        return Ok(RedeemReceipt {
            base_proceeds: FixedPoint::ZERO,
            shares_redeemed: FixedPoint::ZERO,
        });
    }

    let share_proceeds = state.withdrawal_share_proceeds.mul_div_down(shares, ready)?;
    state.withdrawal_shares_ready_to_withdraw = ready.safe_sub(shares)?;
    state.withdrawal_share_proceeds = state.withdrawal_share_proceeds.safe_sub(share_proceeds)?;
    state.withdrawal_share_total_supply = state.withdrawal_share_total_supply.safe_sub(shares)?;

    let base_proceeds = share_proceeds.mul_down(c)?;
    if base_proceeds < min_output_per_share.mul_up(shares)? {
        return Err(TenorError::OutputLimit);
    }

    unit.push_effect(Effect::Burn {
        asset: AssetId::WithdrawalShare,
        owner: lp,
        amount: shares,
    });
    unit.push_effect(Effect::WithdrawBase {
        to: lp,
        amount: base_proceeds,
    });

    Ok(RedeemReceipt {
        base_proceeds,
        shares_redeemed: shares,
    })
}
