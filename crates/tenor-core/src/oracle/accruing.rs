use tracing::debug;

use super::VaultSharePriceOracle;
use crate::errors::CoreResult;
use crate::math::{calculate_compound_interest, FixedPoint};

/// Yield source compounding continuously at a signed annual rate
///
/// Changing the rate re-anchors the price at the time of the change, so
/// earlier accrual is kept.
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccruingVault {
    anchor_time: u64,
    anchor_price: FixedPoint,
    /// Annual rate, raw 18 decimals
    rate: i128,
}

impl AccruingVault {
    pub fn new(initial_price: FixedPoint, rate: i128, start_time: u64) -> Self {
        Self {
            anchor_time: start_time,
            anchor_price: initial_price,
            rate,
        }
    }

    pub fn rate(&self) -> i128 {
        self.rate
    }

    /// Share price at `timestamp`; times before the anchor see the anchor price
    pub fn price_at(&self, timestamp: u64) -> CoreResult<FixedPoint> {
        let elapsed = timestamp.saturating_sub(self.anchor_time);
        let (price, _) = calculate_compound_interest(self.anchor_price, self.rate, elapsed)?;
        Ok(price)
    }

    pub fn set_rate(&mut self, rate: i128, now: u64) -> CoreResult<()> {
        let anchor_price = self.price_at(now)?;
        debug!(
            previous_rate = self.rate,
            rate,
            anchor_price = %anchor_price,
            "vault rate changed"
        );
        self.anchor_price = anchor_price;
        self.anchor_time = now.max(self.anchor_time);
        self.rate = rate;
        Ok(())
    }
}

impl VaultSharePriceOracle for AccruingVault {
    fn vault_share_price(&self, timestamp: u64) -> CoreResult<FixedPoint> {
        self.price_at(timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{ONE, SECONDS_PER_YEAR};
    use crate::oracle::FixedSharePrice;

    #[test]
    fn test_fixed_price_never_moves() {
        let oracle = FixedSharePrice(FixedPoint::from_int(2));
        assert_eq!(oracle.vault_share_price(0).unwrap(), FixedPoint::from_int(2));
        assert_eq!(oracle.vault_share_price(u64::MAX).unwrap(), FixedPoint::from_int(2));
    }

    #[test]
    fn test_accrues_continuously() {
        let vault = AccruingVault::new(FixedPoint::ONE, (ONE / 20) as i128, 0);
        let price = vault.vault_share_price(SECONDS_PER_YEAR).unwrap();
        // e^0.05
        assert!((price.to_f64() - 1.051_271_096).abs() < 1e-9);
        assert_eq!(vault.vault_share_price(0).unwrap(), FixedPoint::ONE);
    }

    #[test]
    fn test_rate_change_keeps_accrued_price() {
        let mut vault = AccruingVault::new(FixedPoint::ONE, (ONE / 10) as i128, 0);
        let before = vault.price_at(SECONDS_PER_YEAR).unwrap();
        vault.set_rate(-((ONE / 10) as i128), SECONDS_PER_YEAR).unwrap();

        assert_eq!(vault.price_at(SECONDS_PER_YEAR).unwrap(), before);
        let after = vault.price_at(2 * SECONDS_PER_YEAR).unwrap();
        assert!((after.to_f64() - 1.0).abs() < 1e-9);
    }
}
