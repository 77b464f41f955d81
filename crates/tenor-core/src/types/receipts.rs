//! # Operation Receipts
//!
//! What each pool operation returns to its caller, in base units unless
//! noted otherwise.

use crate::math::FixedPoint;

#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitializeReceipt {
    pub lp_shares: FixedPoint,
}

#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenLongReceipt {
    pub maturity_time: u64,
    pub bond_amount: FixedPoint,
    pub base_paid: FixedPoint,
    /// Spot price before the trade
    pub spot_price: FixedPoint,
}

#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenShortReceipt {
    pub maturity_time: u64,
    pub bond_amount: FixedPoint,
    pub base_deposit: FixedPoint,
    pub spot_price: FixedPoint,
}

/// Result of closing a long or a short
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseReceipt {
    pub maturity_time: u64,
    pub bond_amount: FixedPoint,
    pub base_proceeds: FixedPoint,
    /// Whether the position was closed at or after maturity
    pub matured: bool,
}

#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddLiquidityReceipt {
    pub lp_shares: FixedPoint,
    /// Base paid per LP share
    pub lp_share_price: FixedPoint,
}

#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveLiquidityReceipt {
    pub base_proceeds: FixedPoint,
    /// Withdrawal shares left with the LP after the immediate redemption
    pub withdrawal_shares: FixedPoint,
}

#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedeemReceipt {
    pub base_proceeds: FixedPoint,
    pub shares_redeemed: FixedPoint,
}
