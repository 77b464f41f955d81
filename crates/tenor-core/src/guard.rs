//! # Solvency Guard
//!
//! Stateless validation gate run by every mutating operation. Checks are
//! evaluated against staged state, so a rejected operation never touches the
//! pool.

use tracing::warn;

use crate::errors::{CoreResult, TenorError};
use crate::math::FixedPoint;
use crate::types::{PoolConfig, PoolState};

pub struct SolvencyGuard<'a> {
    config: &'a PoolConfig,
}

impl<'a> SolvencyGuard<'a> {
    pub fn new(config: &'a PoolConfig) -> Self {
        Self { config }
    }

    pub fn check_minimum_transaction(&self, amount: FixedPoint) -> CoreResult<()> {
        if amount < self.config.minimum_transaction_amount {
            return Err(TenorError::BelowMinimumTransactionAmount);
        }
        Ok(())
    }

    /// Both the raw and the effective share reserves stay above the minimum
    pub fn check_share_reserves(&self, state: &PoolState) -> CoreResult<()> {
        let minimum = self.config.minimum_share_reserves;
        if state.share_reserves < minimum {
            return Err(TenorError::InsufficientLiquidity);
        }
        let effective = state
            .effective_share_reserves()
            .map_err(|_| TenorError::InsufficientLiquidity)?;
        if effective < minimum {
            return Err(TenorError::InsufficientLiquidity);
        }
        Ok(())
    }

    /// `z - long_exposure / c >= z_min`
    pub fn is_solvent(&self, state: &PoolState, vault_share_price: FixedPoint) -> CoreResult<bool> {
        let exposure_shares = state.long_exposure.div_up(vault_share_price)?;
        let required = exposure_shares.safe_add(self.config.minimum_share_reserves)?;
        Ok(state.share_reserves >= required)
    }

    pub fn check_solvency(&self, state: &PoolState, vault_share_price: FixedPoint) -> CoreResult<()> {
        if !self.is_solvent(state, vault_share_price)? {
            return Err(TenorError::InsufficientLiquidity);
        }
        Ok(())
    }

    /// Reject liquidity events while the spot rate sits far from the
    /// checkpoint's time-weighted rate, in either direction
    pub fn check_circuit_breaker(&self, spot_rate: FixedPoint, weighted_rate: FixedPoint) -> CoreResult<()> {
        let delta = self.config.circuit_breaker_delta;
        let deviation = if spot_rate > weighted_rate {
            spot_rate.safe_sub(weighted_rate)?
        } else {
            weighted_rate.safe_sub(spot_rate)?
        };
        if deviation > delta {
            warn!(
                spot_rate = %spot_rate,
                weighted_rate = %weighted_rate,
                delta = %delta,
                "circuit breaker triggered"
            );
            return Err(TenorError::CircuitBreakerTriggered);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::fixed_point::fixed;

    fn config() -> PoolConfig {
        PoolConfig::builder().build().unwrap()
    }

    #[test]
    fn test_minimum_transaction() {
        let config = config();
        let guard = SolvencyGuard::new(&config);
        assert!(guard.check_minimum_transaction(fixed("0.001")).is_ok());
        assert_eq!(
            guard.check_minimum_transaction(fixed("0.0009")),
            Err(TenorError::BelowMinimumTransactionAmount)
        );
    }

    #[test]
    fn test_solvency_counts_long_exposure() {
        let config = config();
        let guard = SolvencyGuard::new(&config);
        let mut state = PoolState {
            share_reserves: fixed("110"),
            long_exposure: fixed("200"),
            ..Default::default()
        };
        // 110 - 200 / 2 = 10 = z_min
        assert!(guard.is_solvent(&state, fixed("2")).unwrap());
        state.long_exposure = fixed("200.000000000000000002");
        assert_eq!(guard.check_solvency(&state, fixed("2")), Err(TenorError::InsufficientLiquidity));
    }

    #[test]
    fn test_share_reserves_checks_effective() {
        let config = config();
        let guard = SolvencyGuard::new(&config);
        let state = PoolState {
            share_reserves: fixed("50"),
            share_adjustment: -(45 * crate::constants::ONE as i128),
            ..Default::default()
        };
        assert_eq!(guard.check_share_reserves(&state), Err(TenorError::InsufficientLiquidity));
    }

    #[test]
    fn test_circuit_breaker_both_directions() {
        let config = config();
        let guard = SolvencyGuard::new(&config);
        assert!(guard.check_circuit_breaker(fixed("0.3"), fixed("0.05")).is_ok());
        assert_eq!(
            guard.check_circuit_breaker(fixed("0.6"), fixed("0.05")),
            Err(TenorError::CircuitBreakerTriggered)
        );
        assert_eq!(
            guard.check_circuit_breaker(fixed("0.01"), fixed("0.6")),
            Err(TenorError::CircuitBreakerTriggered)
        );
    }
}
