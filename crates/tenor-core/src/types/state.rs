//! # Pool State
//!
//! Mutable accounting state of a pool. Every operation stages a copy,
//! mutates it and commits the copy only if every check passes.

use crate::errors::{CoreResult, TenorError};
use crate::math::fixed_point::apply_signed_delta;
use crate::math::FixedPoint;

#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolState {
    // ========================================================================
    // Curve Reserves
    // ========================================================================
    /// Shares held by the pool
    pub share_reserves: FixedPoint,
    /// Signed correction added to `share_reserves` to get the curve's
    /// effective share reserves (raw 18 decimals)
    pub share_adjustment: i128,
    pub bond_reserves: FixedPoint,

    // ========================================================================
    // Open Positions
    // ========================================================================
    pub longs_outstanding: FixedPoint,
    pub shorts_outstanding: FixedPoint,
    /// Bond-weighted average maturity of open longs, in seconds
    pub long_average_maturity_time: FixedPoint,
    /// Bond-weighted average maturity of open shorts, in seconds
    pub short_average_maturity_time: FixedPoint,
    /// Sum over checkpoints of positive net long bonds
    pub long_exposure: FixedPoint,

    // ========================================================================
    // Liquidity Providers
    // ========================================================================
    pub lp_total_supply: FixedPoint,
    pub withdrawal_share_total_supply: FixedPoint,
    pub withdrawal_shares_ready_to_withdraw: FixedPoint,
    /// Shares set aside for ready withdrawal shares
    pub withdrawal_share_proceeds: FixedPoint,

    // ========================================================================
    // Matured Positions and Fees
    // ========================================================================
    /// Shares owed to matured positions that have not been closed
    pub zombie_share_reserves: FixedPoint,
    /// Base value of the zombie reserves locked in at maturity
    pub zombie_base_proceeds: FixedPoint,
    /// Governance fees in shares, held outside the reserves
    pub governance_fees_accrued: FixedPoint,

    pub initialized: bool,
}

impl PoolState {
    /// `share_reserves + share_adjustment`
    pub fn effective_share_reserves(&self) -> CoreResult<FixedPoint> {
        apply_signed_delta(self.share_reserves, self.share_adjustment)
            .map_err(|_| TenorError::InvalidEffectiveShareReserves)
    }

    /// LP shares plus withdrawal shares that are not yet ready
    pub fn active_lp_supply(&self) -> CoreResult<FixedPoint> {
        self.lp_total_supply
            .safe_add(self.withdrawal_share_total_supply)?
            .safe_sub(self.withdrawal_shares_ready_to_withdraw)
    }

    /// Withdrawal shares still waiting for proceeds
    pub fn outstanding_withdrawal_shares(&self) -> CoreResult<FixedPoint> {
        self.withdrawal_share_total_supply
            .safe_sub(self.withdrawal_shares_ready_to_withdraw)
    }

    pub fn ensure_initialized(&self) -> CoreResult<()> {
        if !self.initialized {
            return Err(TenorError::NotInitialized);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ONE;

    #[test]
    fn test_effective_share_reserves_signed() {
        let mut state = PoolState {
            share_reserves: FixedPoint::from_int(100),
            share_adjustment: -(30 * ONE as i128),
            ..Default::default()
        };
        assert_eq!(state.effective_share_reserves().unwrap(), FixedPoint::from_int(70));

        state.share_adjustment = -(101 * ONE as i128);
        assert_eq!(
            state.effective_share_reserves(),
            Err(TenorError::InvalidEffectiveShareReserves)
        );
    }

    #[test]
    fn test_active_supply_excludes_ready_shares() {
        let state = PoolState {
            lp_total_supply: FixedPoint::from_int(90),
            withdrawal_share_total_supply: FixedPoint::from_int(10),
            withdrawal_shares_ready_to_withdraw: FixedPoint::from_int(4),
            ..Default::default()
        };
        assert_eq!(state.active_lp_supply().unwrap(), FixedPoint::from_int(96));
        assert_eq!(state.outstanding_withdrawal_shares().unwrap(), FixedPoint::from_int(6));
    }
}
