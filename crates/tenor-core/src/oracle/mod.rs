//! # Vault Share Price Oracle
//!
//! The pool holds its capital as shares of an external yield source. Every
//! operation reads that source's share price once, through this trait.

mod accruing;

pub use accruing::AccruingVault;

use crate::errors::CoreResult;
use crate::math::FixedPoint;

/// Source of the vault share price (base per share, 18 decimals)
pub trait VaultSharePriceOracle {
    fn vault_share_price(&self, timestamp: u64) -> CoreResult<FixedPoint>;
}

/// Constant share price, for pools whose yield source does not accrue
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSharePrice(pub FixedPoint);

impl VaultSharePriceOracle for FixedSharePrice {
    fn vault_share_price(&self, _timestamp: u64) -> CoreResult<FixedPoint> {
        Ok(self.0)
    }
}

impl<T: VaultSharePriceOracle + ?Sized> VaultSharePriceOracle for &T {
    fn vault_share_price(&self, timestamp: u64) -> CoreResult<FixedPoint> {
        (**self).vault_share_price(timestamp)
    }
}
