//! # Assets and Effects
//!
//! Identifiers for the fungible assets a pool issues, and the side effects
//! an operation asks its collaborators to perform.

use std::fmt;

use crate::math::FixedPoint;

/// Opaque account identifier
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AccountId(pub u64);

impl AccountId {
    /// Holder of the permanent LP buffer minted at initialization
    pub const ZERO: Self = Self(0);
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "account#{}", self.0)
    }
}

/// Asset class, position tokens keyed by maturity time
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssetId {
    Lp,
    WithdrawalShare,
    Long(u64),
    Short(u64),
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetId::Lp => write!(f, "lp"),
            AssetId::WithdrawalShare => write!(f, "withdrawal"),
            AssetId::Long(maturity) => write!(f, "long@{}", maturity),
            AssetId::Short(maturity) => write!(f, "short@{}", maturity),
        }
    }
}

/// Side effect of a committed operation
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Mint {
        asset: AssetId,
        owner: AccountId,
        amount: FixedPoint,
    },
    Burn {
        asset: AssetId,
        owner: AccountId,
        amount: FixedPoint,
    },
    /// Base pulled from `from` into the pool's custody
    DepositBase { from: AccountId, amount: FixedPoint },
    /// Base paid out of the pool's custody to `to`
    WithdrawBase { to: AccountId, amount: FixedPoint },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names() {
        assert_eq!(AccountId(7).to_string(), "account#7");
        assert_eq!(AssetId::Long(86_400).to_string(), "long@86400");
        assert_eq!(AssetId::WithdrawalShare.to_string(), "withdrawal");
    }

    #[cfg(feature = "client")]
    #[test]
    fn test_effect_json_keeps_full_precision() {
        let effect = Effect::Mint {
            asset: AssetId::Short(172_800),
            owner: AccountId(3),
            amount: FixedPoint::from_raw(1_234_567_890_123_456_789_012),
        };
        let json = serde_json::to_string(&effect).unwrap();
        assert!(json.contains("\"1234.567890123456789012\""));
        assert_eq!(serde_json::from_str::<Effect>(&json).unwrap(), effect);
    }
}
