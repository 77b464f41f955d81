//! # Pool Configuration
//!
//! Parameters fixed when a pool is deployed.

use crate::constants::{
    DEFAULT_CHECKPOINT_DURATION, DEFAULT_CIRCUIT_BREAKER_DELTA, DEFAULT_CURVE_FEE, DEFAULT_FLAT_FEE,
    DEFAULT_GOVERNANCE_LP_FEE, DEFAULT_GOVERNANCE_ZOMBIE_FEE, DEFAULT_MINIMUM_SHARE_RESERVES,
    DEFAULT_MINIMUM_TRANSACTION_AMOUNT, DEFAULT_POSITION_DURATION,
};
use crate::errors::{CoreResult, TenorError};
use crate::math::{calculate_time_stretch, FixedPoint};

/// Fee schedule
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fees {
    /// Share of the curve's implied interest charged on curve trades
    pub curve: FixedPoint,
    /// Share of the flat (matured) portion charged on every trade
    pub flat: FixedPoint,
    /// Governance cut of curve and flat fees
    pub governance_lp: FixedPoint,
    /// Governance cut of zombie interest
    pub governance_zombie: FixedPoint,
}

impl Default for Fees {
    fn default() -> Self {
        Self {
            curve: FixedPoint::from_raw(DEFAULT_CURVE_FEE),
            flat: FixedPoint::from_raw(DEFAULT_FLAT_FEE),
            governance_lp: FixedPoint::from_raw(DEFAULT_GOVERNANCE_LP_FEE),
            governance_zombie: FixedPoint::from_raw(DEFAULT_GOVERNANCE_ZOMBIE_FEE),
        }
    }
}

/// Immutable pool parameters
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Vault share price when the pool was deployed (`mu`)
    pub initial_vault_share_price: FixedPoint,
    /// Curve time stretch (`ts`), derived from a target rate
    pub time_stretch: FixedPoint,
    /// Term of every position in seconds
    pub position_duration: u64,
    /// Width of a checkpoint bucket in seconds
    pub checkpoint_duration: u64,
    /// Shares that always stay in the pool
    pub minimum_share_reserves: FixedPoint,
    /// Smallest accepted trade or liquidity amount
    pub minimum_transaction_amount: FixedPoint,
    pub fees: Fees,
    /// Largest tolerated gap between spot and weighted spot APR when adding liquidity
    pub circuit_breaker_delta: FixedPoint,
}

impl PoolConfig {
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::default()
    }

    /// Validate configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.initial_vault_share_price.is_zero() {
            return Err(TenorError::invalid_config("initial_vault_share_price", "must be greater than 0"));
        }

        if self.time_stretch.is_zero() || self.time_stretch >= FixedPoint::ONE {
            return Err(TenorError::invalid_config("time_stretch", "must be in (0, 1)"));
        }

        if self.position_duration == 0 {
            return Err(TenorError::invalid_config("position_duration", "must be greater than 0"));
        }

        if self.checkpoint_duration == 0 {
            return Err(TenorError::invalid_config("checkpoint_duration", "must be greater than 0"));
        }

        if self.position_duration % self.checkpoint_duration != 0 {
            return Err(TenorError::invalid_config(
                "checkpoint_duration",
                "must evenly divide position_duration",
            ));
        }

        if self.minimum_share_reserves.is_zero() {
            return Err(TenorError::invalid_config("minimum_share_reserves", "must be greater than 0"));
        }

        if self.minimum_transaction_amount.is_zero() {
            return Err(TenorError::invalid_config("minimum_transaction_amount", "must be greater than 0"));
        }

        for (field, fee) in [
            ("fees.curve", self.fees.curve),
            ("fees.flat", self.fees.flat),
            ("fees.governance_lp", self.fees.governance_lp),
            ("fees.governance_zombie", self.fees.governance_zombie),
        ] {
            if fee > FixedPoint::ONE {
                return Err(TenorError::invalid_config(field, "must not exceed 1"));
            }
        }

        Ok(())
    }
}

/// Builder starting from the default parameters
///
/// The time stretch is derived from `target_rate` unless set explicitly.
#[derive(Debug, Clone)]
pub struct PoolConfigBuilder {
    initial_vault_share_price: FixedPoint,
    time_stretch: Option<FixedPoint>,
    target_rate: FixedPoint,
    position_duration: u64,
    checkpoint_duration: u64,
    minimum_share_reserves: FixedPoint,
    minimum_transaction_amount: FixedPoint,
    fees: Fees,
    circuit_breaker_delta: FixedPoint,
}

impl Default for PoolConfigBuilder {
    fn default() -> Self {
        Self {
            initial_vault_share_price: FixedPoint::ONE,
            time_stretch: None,
            target_rate: FixedPoint::from_raw(crate::constants::ONE / 20),
            position_duration: DEFAULT_POSITION_DURATION,
            checkpoint_duration: DEFAULT_CHECKPOINT_DURATION,
            minimum_share_reserves: FixedPoint::from_raw(DEFAULT_MINIMUM_SHARE_RESERVES),
            minimum_transaction_amount: FixedPoint::from_raw(DEFAULT_MINIMUM_TRANSACTION_AMOUNT),
            fees: Fees::default(),
            circuit_breaker_delta: FixedPoint::from_raw(DEFAULT_CIRCUIT_BREAKER_DELTA),
        }
    }
}

impl PoolConfigBuilder {
    pub fn initial_vault_share_price(mut self, price: FixedPoint) -> Self {
        self.initial_vault_share_price = price;
        self
    }

    /// Rate the curve's time stretch is calibrated for
    pub fn target_rate(mut self, rate: FixedPoint) -> Self {
        self.target_rate = rate;
        self
    }

    pub fn time_stretch(mut self, time_stretch: FixedPoint) -> Self {
        self.time_stretch = Some(time_stretch);
        self
    }

    pub fn position_duration(mut self, seconds: u64) -> Self {
        self.position_duration = seconds;
        self
    }

    pub fn checkpoint_duration(mut self, seconds: u64) -> Self {
        self.checkpoint_duration = seconds;
        self
    }

    pub fn minimum_share_reserves(mut self, shares: FixedPoint) -> Self {
        self.minimum_share_reserves = shares;
        self
    }

    pub fn minimum_transaction_amount(mut self, amount: FixedPoint) -> Self {
        self.minimum_transaction_amount = amount;
        self
    }

    pub fn fees(mut self, fees: Fees) -> Self {
        self.fees = fees;
        self
    }

    pub fn circuit_breaker_delta(mut self, delta: FixedPoint) -> Self {
        self.circuit_breaker_delta = delta;
        self
    }

    pub fn build(self) -> CoreResult<PoolConfig> {
        let time_stretch = match self.time_stretch {
            Some(time_stretch) => time_stretch,
            None => calculate_time_stretch(self.target_rate)?,
        };

        let config = PoolConfig {
            initial_vault_share_price: self.initial_vault_share_price,
            time_stretch,
            position_duration: self.position_duration,
            checkpoint_duration: self.checkpoint_duration,
            minimum_share_reserves: self.minimum_share_reserves,
            minimum_transaction_amount: self.minimum_transaction_amount,
            fees: self.fees,
            circuit_breaker_delta: self.circuit_breaker_delta,
        };
        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::fixed_point::fixed;

    #[test]
    fn test_default_builder_is_valid() {
        let config = PoolConfig::builder().build().unwrap();
        assert_eq!(config.position_duration, DEFAULT_POSITION_DURATION);
        assert!(config.time_stretch > FixedPoint::ZERO);
        assert!(config.time_stretch < fixed("0.1"));
    }

    #[test]
    fn test_checkpoint_must_divide_position() {
        let result = PoolConfig::builder()
            .position_duration(100)
            .checkpoint_duration(30)
            .build();
        assert_eq!(
            result,
            Err(TenorError::invalid_config(
                "checkpoint_duration",
                "must evenly divide position_duration"
            ))
        );
    }

    #[test]
    fn test_rejects_bad_fees_and_time_stretch() {
        let fees = Fees {
            curve: fixed("1.5"),
            ..Fees::default()
        };
        assert!(matches!(
            PoolConfig::builder().fees(fees).build(),
            Err(TenorError::InvalidConfig { field, .. }) if field == "fees.curve"
        ));

        assert!(matches!(
            PoolConfig::builder().time_stretch(FixedPoint::ONE).build(),
            Err(TenorError::InvalidConfig { field, .. }) if field == "time_stretch"
        ));

        assert!(matches!(
            PoolConfig::builder().target_rate(FixedPoint::ZERO).build(),
            Err(TenorError::InvalidApr)
        ));
    }

    #[test]
    fn test_rejects_zero_minimums() {
        assert!(PoolConfig::builder()
            .minimum_share_reserves(FixedPoint::ZERO)
            .build()
            .is_err());
        assert!(PoolConfig::builder()
            .minimum_transaction_amount(FixedPoint::ZERO)
            .build()
            .is_err());
    }
}
