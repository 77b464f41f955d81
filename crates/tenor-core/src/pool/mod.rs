//! # Pool
//!
//! Transactional surface of the engine. Every mutating operation:
//!
//! 1. Stages a [`WorkUnit`] over the current state and checkpoints
//! 2. Applies the latest checkpoint and records the spot price
//! 3. Prices and validates against the staged state
//! 4. Commits the state, checkpoints and effects only if every step passed
//!
//! A failed operation returns its error and leaves the pool exactly as it
//! was. Queries read the committed state at a caller-supplied instant.

mod liquidity;
mod long;
mod settlement;
mod short;

use crate::checkpoint::{latest_checkpoint, Checkpoint, CheckpointLedger};
use crate::curve::{
    calculate_max_long, calculate_max_short, calculate_targeted_long, spot_price_after_long, spot_price_after_short,
};
use crate::errors::{CoreResult, TenorError};
use crate::guard::SolvencyGuard;
use crate::lp;
use crate::market::PoolView;
use crate::math::FixedPoint;
use crate::oracle::VaultSharePriceOracle;
use crate::position;
use crate::types::{
    AccountId, AddLiquidityReceipt, CloseReceipt, Effect, InitializeReceipt, OpenLongReceipt,
    OpenShortReceipt, PoolConfig, PoolState, RedeemReceipt, RemoveLiquidityReceipt,
};
use crate::work_unit::WorkUnit;

// ============================================================================
// Transaction Context
// ============================================================================

/// The instant an operation runs at and the vault share price observed then
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxContext {
    pub now: u64,
    pub vault_share_price: FixedPoint,
}

impl TxContext {
    pub fn new(now: u64, vault_share_price: FixedPoint) -> CoreResult<Self> {
        if vault_share_price.is_zero() {
            return Err(TenorError::NegativeInterest);
        }
        Ok(Self { now, vault_share_price })
    }

    /// Read the vault share price from `oracle` at `now`
    pub fn observe(oracle: &impl VaultSharePriceOracle, now: u64) -> CoreResult<Self> {
        Self::new(now, oracle.vault_share_price(now)?)
    }
}

/// Result of a committed operation and the effects it asks the caller to
/// carry out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome<R> {
    pub value: R,
    pub effects: Vec<Effect>,
}

// ============================================================================
// Pool
// ============================================================================

#[derive(Debug, Clone)]
pub struct Pool {
    config: PoolConfig,
    state: PoolState,
    checkpoints: CheckpointLedger,
}

impl Pool {
    pub fn new(config: PoolConfig) -> CoreResult<Self> {
        config.validate()?;
        let checkpoints = CheckpointLedger::new(config.checkpoint_duration);
        Ok(Self {
            config,
            state: PoolState::default(),
            checkpoints,
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn state(&self) -> &PoolState {
        &self.state
    }

    pub fn checkpoints(&self) -> &CheckpointLedger {
        &self.checkpoints
    }

    pub fn checkpoint_at(&self, time: u64) -> Option<&Checkpoint> {
        self.checkpoints.get(time).filter(|checkpoint| checkpoint.is_minted())
    }

    /// Run `operation` in a fresh work unit and commit it on success
    fn execute<R>(
        &mut self,
        ctx: TxContext,
        operation: impl FnOnce(&mut WorkUnit) -> CoreResult<R>,
    ) -> CoreResult<TxOutcome<R>> {
        let (value, changes) = {
            let mut unit = WorkUnit::new(
                &self.config,
                self.state,
                &self.checkpoints,
                ctx.now,
                ctx.vault_share_price,
            );
            let value = operation(&mut unit)?;
            (value, unit.commit())
        };

        for (time, checkpoint) in changes.checkpoints {
            self.checkpoints.insert(time, checkpoint)?;
        }
        self.state = changes.state;

        Ok(TxOutcome {
            value,
            effects: changes.effects,
        })
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Seed the reserves so the curve quotes `apr`
    pub fn initialize(
        &mut self,
        ctx: TxContext,
        lp: AccountId,
        contribution: FixedPoint,
        apr: FixedPoint,
    ) -> CoreResult<TxOutcome<InitializeReceipt>> {
        self.execute(ctx, |unit| liquidity::initialize(unit, lp, contribution, apr))
    }

    /// Mint the checkpoint at `time`, backfilling a past bucket if needed
    pub fn checkpoint(&mut self, ctx: TxContext, time: u64) -> CoreResult<TxOutcome<Checkpoint>> {
        self.execute(ctx, |unit| settlement::checkpoint(unit, time))
    }

    // ========================================================================
    // Trading
    // ========================================================================

    pub fn open_long(
        &mut self,
        ctx: TxContext,
        trader: AccountId,
        base_amount: FixedPoint,
        min_output: FixedPoint,
    ) -> CoreResult<TxOutcome<OpenLongReceipt>> {
        self.execute(ctx, |unit| long::open_long(unit, trader, base_amount, min_output))
    }

    pub fn close_long(
        &mut self,
        ctx: TxContext,
        trader: AccountId,
        maturity_time: u64,
        bond_amount: FixedPoint,
        min_output: FixedPoint,
    ) -> CoreResult<TxOutcome<CloseReceipt>> {
        self.execute(ctx, |unit| {
            long::close_long(unit, trader, maturity_time, bond_amount, min_output)
        })
    }

    pub fn open_short(
        &mut self,
        ctx: TxContext,
        trader: AccountId,
        bond_amount: FixedPoint,
        max_deposit: FixedPoint,
    ) -> CoreResult<TxOutcome<OpenShortReceipt>> {
        self.execute(ctx, |unit| short::open_short(unit, trader, bond_amount, max_deposit))
    }

    pub fn close_short(
        &mut self,
        ctx: TxContext,
        trader: AccountId,
        maturity_time: u64,
        bond_amount: FixedPoint,
        min_output: FixedPoint,
    ) -> CoreResult<TxOutcome<CloseReceipt>> {
        self.execute(ctx, |unit| {
            short::close_short(unit, trader, maturity_time, bond_amount, min_output)
        })
    }

    // ========================================================================
    // Liquidity
    // ========================================================================

    pub fn add_liquidity(
        &mut self,
        ctx: TxContext,
        lp: AccountId,
        contribution: FixedPoint,
        min_lp_share_price: FixedPoint,
    ) -> CoreResult<TxOutcome<AddLiquidityReceipt>> {
        self.execute(ctx, |unit| {
            liquidity::add_liquidity(unit, lp, contribution, min_lp_share_price)
        })
    }

    /// Swap LP shares for withdrawal shares and redeem what idle capital allows
    pub fn remove_liquidity(
        &mut self,
        ctx: TxContext,
        lp: AccountId,
        lp_shares: FixedPoint,
        min_output_per_share: FixedPoint,
    ) -> CoreResult<TxOutcome<RemoveLiquidityReceipt>> {
        self.execute(ctx, |unit| {
            liquidity::remove_liquidity(unit, lp, lp_shares, min_output_per_share)
        })
    }

    pub fn redeem_withdrawal_shares(
        &mut self,
        ctx: TxContext,
        lp: AccountId,
        withdrawal_shares: FixedPoint,
        min_output_per_share: FixedPoint,
    ) -> CoreResult<TxOutcome<RedeemReceipt>> {
        self.execute(ctx, |unit| {
            liquidity::redeem_withdrawal_shares(unit, lp, withdrawal_shares, min_output_per_share)
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Committed state seen at `ctx`
    pub fn view(&self, ctx: &TxContext) -> PoolView<'_> {
        PoolView::new(&self.config, self.state, ctx.vault_share_price, ctx.now)
    }

    /// Present value in shares
    pub fn present_value(&self, ctx: &TxContext) -> CoreResult<FixedPoint> {
        position::present_value(&self.view(ctx))
    }

    pub fn lp_share_price(&self, ctx: &TxContext) -> CoreResult<FixedPoint> {
        lp::lp_share_price(&self.view(ctx))
    }

    pub fn idle_share_reserves(&self, ctx: &TxContext) -> CoreResult<FixedPoint> {
        lp::idle_share_reserves(&self.view(ctx))
    }

    pub fn spot_price(&self, ctx: &TxContext) -> CoreResult<FixedPoint> {
        self.view(ctx).spot_price()
    }

    pub fn spot_rate(&self, ctx: &TxContext) -> CoreResult<FixedPoint> {
        self.view(ctx).spot_rate()
    }

    pub fn solvency(&self, ctx: &TxContext) -> CoreResult<bool> {
        SolvencyGuard::new(&self.config).is_solvent(&self.state, ctx.vault_share_price)
    }

    /// Largest long `budget` base can open right now
    pub fn max_long(&self, ctx: &TxContext, budget: FixedPoint) -> CoreResult<FixedPoint> {
        let view = self.view(ctx);
        calculate_max_long(&view, budget, self.new_position_exposure(&view)?)
    }

    /// Base, up to `budget`, that moves the spot rate down to `target_rate`
    pub fn targeted_long(&self, ctx: &TxContext, budget: FixedPoint, target_rate: FixedPoint) -> CoreResult<FixedPoint> {
        let view = self.view(ctx);
        calculate_targeted_long(&view, budget, target_rate, self.new_position_exposure(&view)?)
    }

    pub fn spot_price_after_long(&self, ctx: &TxContext, base_amount: FixedPoint) -> CoreResult<FixedPoint> {
        spot_price_after_long(&self.view(ctx), base_amount)
    }

    pub fn spot_price_after_short(&self, ctx: &TxContext, bond_amount: FixedPoint) -> CoreResult<FixedPoint> {
        spot_price_after_short(&self.view(ctx), bond_amount)
    }

    /// Largest short whose deposit fits in `budget` base
    pub fn max_short(&self, ctx: &TxContext, budget: FixedPoint) -> CoreResult<FixedPoint> {
        let view = self.view(ctx);
        let exposure = self.new_position_exposure(&view)?;
        let open_price = self
            .checkpoint_at(view.latest_checkpoint)
            .map(|checkpoint| checkpoint.vault_share_price)
            .unwrap_or(ctx.vault_share_price);
        calculate_max_short(&view, budget, open_price, exposure)
    }

    /// Exposure already maturing where a position opened now would land
    fn new_position_exposure(&self, view: &PoolView) -> CoreResult<i128> {
        self.checkpoints
            .get_or_default(view.maturity_for_new_position())
            .exposure()
    }
}

// ============================================================================
// Shared Steps
// ============================================================================

/// Common prologue of every trade and liquidity operation
fn prepare_trade(unit: &mut WorkUnit) -> CoreResult<()> {
    unit.state().ensure_initialized()?;
    let latest = latest_checkpoint(unit.now(), unit.config().checkpoint_duration);
    settlement::apply_checkpoint(unit, latest)?;
    settlement::record_spot_price(unit)
}

/// Maturities are bucket-aligned and no later than a position opened now
fn validate_maturity(unit: &WorkUnit, maturity_time: u64) -> CoreResult<()> {
    let config = unit.config();
    let latest = latest_checkpoint(unit.now(), config.checkpoint_duration);
    if maturity_time % config.checkpoint_duration != 0
        || maturity_time > latest.saturating_add(config.position_duration)
    {
        return Err(TenorError::InvalidMaturityTime);
    }
    Ok(())
}

/// Vault share price when positions maturing at `maturity_time` opened
fn open_vault_share_price(unit: &WorkUnit, maturity_time: u64, fallback: FixedPoint) -> FixedPoint {
    maturity_time
        .checked_sub(unit.config().position_duration)
        .map(|open_time| unit.checkpoint(open_time).vault_share_price)
        .filter(|price| !price.is_zero())
        .unwrap_or(fallback)
}
