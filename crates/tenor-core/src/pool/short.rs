use tracing::debug;

use super::settlement::{apply_checkpoint, withdraw_zombie_proceeds};
use super::{open_vault_share_price, prepare_trade, validate_maturity};
use crate::checkpoint::latest_checkpoint;
use crate::curve::{matured_base_owed, simulate_close_short, simulate_open_short};
use crate::errors::{CoreResult, TenorError};
use crate::guard::SolvencyGuard;
use crate::lp::distribute_excess_idle;
use crate::math::FixedPoint;
use crate::types::{AccountId, AssetId, CloseReceipt, Effect, OpenShortReceipt};
use crate::work_unit::WorkUnit;

pub(super) fn open_short(
    unit: &mut WorkUnit,
    trader: AccountId,
    bond_amount: FixedPoint,
    max_deposit: FixedPoint,
) -> CoreResult<OpenShortReceipt> {
    prepare_trade(unit)?;

    let latest = latest_checkpoint(unit.now(), unit.config().checkpoint_duration);
    let open_price = unit.checkpoint(latest).vault_share_price;
    let view = unit.view();
    let maturity_time = view.maturity_for_new_position();
    let exposure = unit.maturity_exposure(maturity_time)?;

    let (quote, state) = simulate_open_short(&view, bond_amount, open_price, exposure)?;
    if quote.base_deposit > max_deposit {
        return Err(TenorError::OutputLimit);
    }
    unit.set_state(state);

    let mut checkpoint = unit.checkpoint(maturity_time);
    checkpoint.shorts_maturing = checkpoint.shorts_maturing.safe_add(bond_amount)?;
    unit.set_checkpoint(maturity_time, checkpoint)?;

    unit.push_effect(Effect::DepositBase {
        from: trader,
        amount: quote.base_deposit,
    });
    unit.push_effect(Effect::Mint {
        asset: AssetId::Short(maturity_time),
        owner: trader,
        amount: bond_amount,
    });

    debug!(
        %trader,
        maturity_time,
        bonds = %bond_amount,
        deposit = %quote.base_deposit,
        "short opened"
    );

    Ok(OpenShortReceipt {
        maturity_time,
        bond_amount,
        base_deposit: quote.base_deposit,
        spot_price: quote.spot_price,
    })
}

pub(super) fn close_short(
    unit: &mut WorkUnit,
    trader: AccountId,
    maturity_time: u64,
    bond_amount: FixedPoint,
    min_output: FixedPoint,
) -> CoreResult<CloseReceipt> {
    SolvencyGuard::new(unit.config()).check_minimum_transaction(bond_amount)?;
    validate_maturity(unit, maturity_time)?;
    prepare_trade(unit)?;

    let c = unit.vault_share_price();
    let matured = maturity_time <= unit.now();

    let share_proceeds = if matured {
        let maturity_price = apply_checkpoint(unit, maturity_time)?;
        let open_price = open_vault_share_price(unit, maturity_time, maturity_price);
        let base_owed = matured_base_owed(&unit.view(), bond_amount, maturity_price, open_price, false)?;
        withdraw_zombie_proceeds(unit, base_owed)?
    } else {
        let view = unit.view();
        let open_price = open_vault_share_price(unit, maturity_time, c);
        let exposure = unit.maturity_exposure(maturity_time)?;
        let (quote, state) = simulate_close_short(&view, bond_amount, maturity_time, open_price, exposure)?;
        unit.set_state(state);

        let mut checkpoint = unit.checkpoint(maturity_time);
        checkpoint.shorts_maturing = checkpoint.shorts_maturing.safe_sub(bond_amount)?;
        unit.set_checkpoint(maturity_time, checkpoint)?;
        quote.share_proceeds
    };

    let base_proceeds = share_proceeds.mul_down(c)?;
    if base_proceeds < min_output {
        return Err(TenorError::OutputLimit);
    }

    if !matured {
        let (_, state) = distribute_excess_idle(&unit.view())?;
        unit.set_state(state);
    }

    unit.push_effect(Effect::Burn {
        asset: AssetId::Short(maturity_time),
        owner: trader,
        amount: bond_amount,
    });
    unit.push_effect(Effect::WithdrawBase {
        to: trader,
        amount: base_proceeds,
    });

    debug!(%trader, maturity_time, bonds = %bond_amount, base = %base_proceeds, matured, "short closed");

    Ok(CloseReceipt {
        maturity_time,
        bond_amount,
        base_proceeds,
        matured,
    })
}
