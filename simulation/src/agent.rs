//! # Agents
//!
//! Simple trading strategies that turn the observed market into pool
//! operations. Agents only decide; the runner executes.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tenor_core::{AccountId, AssetId, AssetLedger, CoreResult, FixedPoint, Pool, TxContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Strategy {
    /// Buys fixed rate and eventually closes
    LongTrader,
    /// Sells bonds to collect the variable rate
    ShortTrader,
    /// Adds and withdraws liquidity
    LiquidityProvider,
    /// Trades the fixed rate towards the variable rate
    Arbitrageur,
}

impl Strategy {
    const ALL: [Strategy; 4] = [
        Strategy::LongTrader,
        Strategy::ShortTrader,
        Strategy::LiquidityProvider,
        Strategy::Arbitrageur,
    ];

    /// Round-robin assignment for the `index`th agent
    pub fn for_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    OpenLong { base: FixedPoint },
    CloseLong { maturity: u64, bonds: FixedPoint },
    OpenShort { bonds: FixedPoint },
    CloseShort { maturity: u64, bonds: FixedPoint },
    AddLiquidity { base: FixedPoint },
    RemoveLiquidity { lp_shares: FixedPoint },
    RedeemWithdrawalShares { shares: FixedPoint },
    Idle,
}

impl Action {
    /// Short label used in run statistics
    pub fn label(&self) -> &'static str {
        match self {
            Action::OpenLong { .. } => "open_long",
            Action::CloseLong { .. } => "close_long",
            Action::OpenShort { .. } => "open_short",
            Action::CloseShort { .. } => "close_short",
            Action::AddLiquidity { .. } => "add_liquidity",
            Action::RemoveLiquidity { .. } => "remove_liquidity",
            Action::RedeemWithdrawalShares { .. } => "redeem",
            Action::Idle => "idle",
        }
    }
}

/// What an agent sees before deciding
pub struct Market<'a> {
    pub pool: &'a Pool,
    pub ctx: &'a TxContext,
    pub ledger: &'a AssetLedger,
    /// Current annual rate of the yield source
    pub variable_rate: f64,
}

#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AccountId,
    pub strategy: Strategy,
    max_trade_base: u64,
    arbitrage_band: f64,
}

impl Agent {
    pub fn new(id: AccountId, strategy: Strategy, max_trade_base: u64, arbitrage_band: f64) -> Self {
        Self {
            id,
            strategy,
            max_trade_base,
            arbitrage_band,
        }
    }

    pub fn decide<R: Rng>(&self, market: &Market, rng: &mut R) -> CoreResult<Action> {
        match self.strategy {
            Strategy::LongTrader => Ok(self.trade_longs(market, rng)),
            Strategy::ShortTrader => Ok(self.trade_shorts(market, rng)),
            Strategy::LiquidityProvider => Ok(self.provide_liquidity(market, rng)),
            Strategy::Arbitrageur => self.arbitrage(market),
        }
    }

    fn trade_longs<R: Rng>(&self, market: &Market, rng: &mut R) -> Action {
        let held = self.positions(market.ledger, |asset| match asset {
            AssetId::Long(maturity) => Some(maturity),
            _ => None,
        });
        if !held.is_empty() && rng.gen_bool(0.4) {
            let (maturity, bonds) = held[rng.gen_range(0..held.len())];
            return Action::CloseLong {
                maturity,
                bonds: partial(bonds, rng),
            };
        }
        Action::OpenLong {
            base: self.random_amount(rng),
        }
    }

    fn trade_shorts<R: Rng>(&self, market: &Market, rng: &mut R) -> Action {
        let held = self.positions(market.ledger, |asset| match asset {
            AssetId::Short(maturity) => Some(maturity),
            _ => None,
        });
        if !held.is_empty() && rng.gen_bool(0.4) {
            let (maturity, bonds) = held[rng.gen_range(0..held.len())];
            return Action::CloseShort {
                maturity,
                bonds: partial(bonds, rng),
            };
        }
        Action::OpenShort {
            bonds: self.random_amount(rng),
        }
    }

    fn provide_liquidity<R: Rng>(&self, market: &Market, rng: &mut R) -> Action {
        let withdrawal = market.ledger.balance(self.id, AssetId::WithdrawalShare);
        if !withdrawal.is_zero() && rng.gen_bool(0.5) {
            return Action::RedeemWithdrawalShares { shares: withdrawal };
        }

        let lp_shares = market.ledger.balance(self.id, AssetId::Lp);
        if !lp_shares.is_zero() && rng.gen_bool(0.3) {
            return Action::RemoveLiquidity {
                lp_shares: partial(lp_shares, rng),
            };
        }
        Action::AddLiquidity {
            base: self.random_amount(rng),
        }
    }

    /// Push the fixed rate towards the variable rate: a targeted long when
    /// the fixed rate is rich, a short towards the target reserves otherwise
    fn arbitrage(&self, market: &Market) -> CoreResult<Action> {
        let view = market.pool.view(market.ctx);
        let spot_rate = view.spot_rate()?.to_f64();
        let target = market.variable_rate.max(0.0);
        if (spot_rate - target).abs() <= self.arbitrage_band {
            return Ok(Action::Idle);
        }

        let budget = FixedPoint::from_int(self.max_trade_base);
        let target_rate = FixedPoint::from_f64(target)?;

        if view.spot_rate()? > target_rate {
            let base = market.pool.targeted_long(market.ctx, budget, target_rate)?;
            return Ok(non_zero(base).map_or(Action::Idle, |base| Action::OpenLong { base }));
        }

        let (_, target_bonds) = view
            .curve()?
            .reserves_given_rate(target_rate, view.config.position_duration)?;
        let bonds = target_bonds.saturating_sub(view.state.bond_reserves).min(budget);
        if bonds.is_zero() {
            return Ok(Action::Idle);
        }
        let bonds = bonds.min(market.pool.max_short(market.ctx, budget)?);
        Ok(non_zero(bonds).map_or(Action::Idle, |bonds| Action::OpenShort { bonds }))
    }

    fn positions(&self, ledger: &AssetLedger, select: impl Fn(AssetId) -> Option<u64>) -> Vec<(u64, FixedPoint)> {
        ledger
            .holdings(self.id)
            .into_iter()
            .filter_map(|(asset, amount)| select(asset).map(|maturity| (maturity, amount)))
            .collect()
    }

    fn random_amount<R: Rng>(&self, rng: &mut R) -> FixedPoint {
        FixedPoint::from_int(rng.gen_range(1..=self.max_trade_base))
    }
}

/// Between a tenth and all of `amount`
fn partial<R: Rng>(amount: FixedPoint, rng: &mut R) -> FixedPoint {
    let tenths = rng.gen_range(1..=10u64);
    if tenths == 10 {
        return amount;
    }
    amount
        .mul_div_down(FixedPoint::from_int(tenths), FixedPoint::from_int(10))
        .unwrap_or(amount)
}

fn non_zero(amount: FixedPoint) -> Option<FixedPoint> {
    (!amount.is_zero()).then_some(amount)
}
