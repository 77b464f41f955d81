//! Shared harness for pool integration tests: a pool, a ledger that
//! receives every committed effect and an accruing yield source.

#![allow(dead_code)]

use tenor_core::constants::SECONDS_PER_DAY;
use tenor_core::*;

pub const LP: AccountId = AccountId(1);
pub const ALICE: AccountId = AccountId(2);
pub const BOB: AccountId = AccountId(3);
pub const CELINE: AccountId = AccountId(4);

/// First checkpoint of every harness pool
pub const START: u64 = 100 * SECONDS_PER_DAY;

pub fn fixed(literal: &str) -> FixedPoint {
    literal.parse().expect("valid fixed-point literal")
}

pub fn rate(literal: &str) -> i128 {
    let negative = literal.starts_with('-');
    let magnitude = fixed(literal.trim_start_matches('-')).to_signed().expect("rate fits");
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

pub struct Harness {
    pub pool: Pool,
    pub ledger: AssetLedger,
    pub vault: AccruingVault,
    pub now: u64,
}

impl Harness {
    /// Pool at `apr` seeded by [`LP`] with `contribution` base, backed by a
    /// vault earning `variable_rate`
    pub fn new(contribution: &str, apr: &str, variable_rate: &str) -> Self {
        let config = PoolConfig::builder()
            .target_rate(fixed(apr))
            .build()
            .expect("valid config");
        Self::with_config(config, contribution, apr, variable_rate)
    }

    pub fn with_config(config: PoolConfig, contribution: &str, apr: &str, variable_rate: &str) -> Self {
        let mut harness = Self {
            pool: Pool::new(config).expect("valid pool"),
            ledger: AssetLedger::new(),
            vault: AccruingVault::new(FixedPoint::ONE, rate(variable_rate), START),
            now: START,
        };
        harness
            .run(|pool, ctx| pool.initialize(ctx, LP, fixed(contribution), fixed(apr)))
            .expect("initialize");
        harness
    }

    pub fn ctx(&self) -> TxContext {
        TxContext::observe(&self.vault, self.now).expect("positive share price")
    }

    pub fn advance(&mut self, seconds: u64) {
        self.now += seconds;
    }

    pub fn set_variable_rate(&mut self, literal: &str) {
        self.vault.set_rate(rate(literal), self.now).expect("rate change");
    }

    pub fn position_duration(&self) -> u64 {
        self.pool.config().position_duration
    }

    /// Run an operation and hand its effects to the ledger
    pub fn run<R>(
        &mut self,
        operation: impl FnOnce(&mut Pool, TxContext) -> CoreResult<TxOutcome<R>>,
    ) -> CoreResult<R> {
        let ctx = self.ctx();
        let outcome = operation(&mut self.pool, ctx)?;
        self.ledger
            .apply(&outcome.effects)
            .expect("ledger accepts committed effects");
        Ok(outcome.value)
    }

    pub fn open_long(&mut self, trader: AccountId, base: FixedPoint) -> CoreResult<OpenLongReceipt> {
        self.run(|pool, ctx| pool.open_long(ctx, trader, base, FixedPoint::ZERO))
    }

    pub fn close_long(&mut self, trader: AccountId, maturity: u64, bonds: FixedPoint) -> CoreResult<CloseReceipt> {
        self.run(|pool, ctx| pool.close_long(ctx, trader, maturity, bonds, FixedPoint::ZERO))
    }

    pub fn open_short(&mut self, trader: AccountId, bonds: FixedPoint) -> CoreResult<OpenShortReceipt> {
        self.run(|pool, ctx| pool.open_short(ctx, trader, bonds, FixedPoint::from_raw(u128::MAX / 2)))
    }

    pub fn close_short(&mut self, trader: AccountId, maturity: u64, bonds: FixedPoint) -> CoreResult<CloseReceipt> {
        self.run(|pool, ctx| pool.close_short(ctx, trader, maturity, bonds, FixedPoint::ZERO))
    }

    pub fn add_liquidity(&mut self, lp: AccountId, base: FixedPoint) -> CoreResult<AddLiquidityReceipt> {
        self.run(|pool, ctx| pool.add_liquidity(ctx, lp, base, FixedPoint::ZERO))
    }

    pub fn remove_liquidity(&mut self, lp: AccountId, shares: FixedPoint) -> CoreResult<RemoveLiquidityReceipt> {
        self.run(|pool, ctx| pool.remove_liquidity(ctx, lp, shares, FixedPoint::ZERO))
    }

    pub fn redeem(&mut self, lp: AccountId, shares: FixedPoint) -> CoreResult<RedeemReceipt> {
        self.run(|pool, ctx| pool.redeem_withdrawal_shares(ctx, lp, shares, FixedPoint::ZERO))
    }

    pub fn checkpoint(&mut self, time: u64) -> CoreResult<Checkpoint> {
        self.run(|pool, ctx| pool.checkpoint(ctx, time))
    }

    pub fn lp_share_price(&self) -> FixedPoint {
        self.pool.lp_share_price(&self.ctx()).expect("lp share price")
    }

    /// Net base an account has received from the pool
    pub fn net_base(&self, account: AccountId) -> f64 {
        self.ledger.net_base(account) as f64 / 1e18
    }
}
