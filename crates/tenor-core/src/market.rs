//! # Pool View
//!
//! Read-only snapshot of a pool at one instant: configuration, a copy of the
//! state, the observed vault share price and the latest checkpoint. Pricing
//! and valuation functions take a view so they can be evaluated on staged or
//! hypothetical states alike.

use crate::checkpoint::latest_checkpoint;
use crate::errors::CoreResult;
use crate::math::{calculate_apr_from_price, FixedPoint, YieldSpace};
use crate::types::{PoolConfig, PoolState};

#[derive(Debug, Clone, Copy)]
pub struct PoolView<'a> {
    pub config: &'a PoolConfig,
    pub state: PoolState,
    pub vault_share_price: FixedPoint,
    pub latest_checkpoint: u64,
}

impl<'a> PoolView<'a> {
    pub fn new(config: &'a PoolConfig, state: PoolState, vault_share_price: FixedPoint, now: u64) -> Self {
        Self {
            config,
            state,
            vault_share_price,
            latest_checkpoint: latest_checkpoint(now, config.checkpoint_duration),
        }
    }

    /// Same instant, different state
    pub fn with_state(&self, state: PoolState) -> Self {
        Self { state, ..*self }
    }

    pub fn effective_share_reserves(&self) -> CoreResult<FixedPoint> {
        self.state.effective_share_reserves()
    }

    /// Curve at the current reserves
    pub fn curve(&self) -> CoreResult<YieldSpace> {
        Ok(YieldSpace::new(
            self.effective_share_reserves()?,
            self.state.bond_reserves,
            self.config.time_stretch,
            self.vault_share_price,
            self.config.initial_vault_share_price,
        ))
    }

    pub fn spot_price(&self) -> CoreResult<FixedPoint> {
        self.curve()?.spot_price()
    }

    /// Fixed rate implied by the spot price
    pub fn spot_rate(&self) -> CoreResult<FixedPoint> {
        calculate_apr_from_price(self.spot_price()?, self.config.position_duration)
    }

    /// Lowest effective share reserves that keep `share_reserves >= minimum`
    pub fn effective_share_reserves_floor(&self) -> CoreResult<FixedPoint> {
        let minimum = self.config.minimum_share_reserves;
        if self.state.share_adjustment > 0 {
            return minimum.safe_add(FixedPoint::from_raw(self.state.share_adjustment as u128));
        }
        Ok(minimum)
    }

    /// Maturity of a position opened now
    pub fn maturity_for_new_position(&self) -> u64 {
        self.latest_checkpoint + self.config.position_duration
    }

    /// Fraction of the term left at `maturity_time`, measured from the latest checkpoint
    pub fn time_remaining(&self, maturity_time: u64) -> CoreResult<FixedPoint> {
        let remaining = maturity_time.saturating_sub(self.latest_checkpoint);
        FixedPoint::from_int(remaining).div_down(FixedPoint::from_int(self.config.position_duration))
    }

    /// `time_remaining` for an 18-decimal average maturity
    pub fn time_remaining_scaled(&self, maturity_time: FixedPoint) -> CoreResult<FixedPoint> {
        let latest = FixedPoint::from_int(self.latest_checkpoint);
        if maturity_time <= latest {
            return Ok(FixedPoint::ZERO);
        }
        maturity_time
            .safe_sub(latest)?
            .div_down(FixedPoint::from_int(self.config.position_duration))
    }
}
