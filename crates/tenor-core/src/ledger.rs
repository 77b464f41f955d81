//! # Asset Ledger
//!
//! In-memory balances for the assets a pool issues, driven by the effects
//! its operations return. The pool never reads balances back; callers apply
//! each committed outcome here.

use std::collections::HashMap;

use crate::errors::{CoreResult, TenorError};
use crate::math::FixedPoint;
use crate::types::{AccountId, AssetId, Effect};

#[derive(Debug, Clone, Default)]
pub struct AssetLedger {
    balances: HashMap<(AccountId, AssetId), FixedPoint>,
    total_supply: HashMap<AssetId, FixedPoint>,
    /// Base received from the pool minus base paid in, per account (raw)
    net_base: HashMap<AccountId, i128>,
}

impl AssetLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, owner: AccountId, asset: AssetId) -> FixedPoint {
        self.balances
            .get(&(owner, asset))
            .copied()
            .unwrap_or(FixedPoint::ZERO)
    }

    pub fn total_supply(&self, asset: AssetId) -> FixedPoint {
        self.total_supply
            .get(&asset)
            .copied()
            .unwrap_or(FixedPoint::ZERO)
    }

    pub fn net_base(&self, account: AccountId) -> i128 {
        self.net_base.get(&account).copied().unwrap_or(0)
    }

    /// Non-zero holdings of `owner`, sorted by asset
    pub fn holdings(&self, owner: AccountId) -> Vec<(AssetId, FixedPoint)> {
        let mut holdings: Vec<_> = self
            .balances
            .iter()
            .filter(|((account, _), _)| *account == owner)
            .map(|((_, asset), amount)| (*asset, *amount))
            .collect();
        holdings.sort_by_key(|(asset, _)| *asset);
        holdings
    }

    /// Apply every effect or none of them
    pub fn apply(&mut self, effects: &[Effect]) -> CoreResult<()> {
        let mut staged = self.clone();
        for effect in effects {
            staged.apply_one(effect)?;
        }
        *self = staged;
        Ok(())
    }

    fn apply_one(&mut self, effect: &Effect) -> CoreResult<()> {
        match *effect {
            Effect::Mint { asset, owner, amount } => {
                let balance = self.balances.entry((owner, asset)).or_insert(FixedPoint::ZERO);
                *balance = balance.safe_add(amount)?;
                let supply = self.total_supply.entry(asset).or_insert(FixedPoint::ZERO);
                *supply = supply.safe_add(amount)?;
            }
            Effect::Burn { asset, owner, amount } => {
                let remaining = self
                    .balance(owner, asset)
                    .safe_sub(amount)
                    .map_err(|_| TenorError::InsufficientBalance)?;
                if remaining.is_zero() {
                    self.balances.remove(&(owner, asset));
                } else {
                    self.balances.insert((owner, asset), remaining);
                }
                let supply = self.total_supply(asset).safe_sub(amount)?;
                self.total_supply.insert(asset, supply);
            }
            Effect::DepositBase { from, amount } => {
                let flow = self.net_base.entry(from).or_insert(0);
                *flow = flow
                    .checked_sub(amount.to_signed()?)
                    .ok_or(TenorError::ArithmeticOverflow)?;
            }
            Effect::WithdrawBase { to, amount } => {
                let flow = self.net_base.entry(to).or_insert(0);
                *flow = flow
                    .checked_add(amount.to_signed()?)
                    .ok_or(TenorError::ArithmeticOverflow)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ONE;

    const ALICE: AccountId = AccountId(1);

    #[test]
    fn test_mint_and_burn() {
        let mut ledger = AssetLedger::new();
        ledger
            .apply(&[Effect::Mint {
                asset: AssetId::Long(100),
                owner: ALICE,
                amount: FixedPoint::from_int(5),
            }])
            .unwrap();
        assert_eq!(ledger.balance(ALICE, AssetId::Long(100)), FixedPoint::from_int(5));
        assert_eq!(ledger.total_supply(AssetId::Long(100)), FixedPoint::from_int(5));

        ledger
            .apply(&[Effect::Burn {
                asset: AssetId::Long(100),
                owner: ALICE,
                amount: FixedPoint::from_int(5),
            }])
            .unwrap();
        assert!(ledger.holdings(ALICE).is_empty());
        assert_eq!(ledger.total_supply(AssetId::Long(100)), FixedPoint::ZERO);
    }

    #[test]
    fn test_failed_batch_is_not_applied() {
        let mut ledger = AssetLedger::new();
        let result = ledger.apply(&[
            Effect::DepositBase {
                from: ALICE,
                amount: FixedPoint::from_int(10),
            },
            Effect::Burn {
                asset: AssetId::Lp,
                owner: ALICE,
                amount: FixedPoint::ONE,
            },
        ]);
        assert_eq!(result, Err(TenorError::InsufficientBalance));
        assert_eq!(ledger.net_base(ALICE), 0);
    }

    #[test]
    fn test_net_base_tracks_flows() {
        let mut ledger = AssetLedger::new();
        ledger
            .apply(&[
                Effect::DepositBase {
                    from: ALICE,
                    amount: FixedPoint::from_int(10),
                },
                Effect::WithdrawBase {
                    to: ALICE,
                    amount: FixedPoint::from_int(12),
                },
            ])
            .unwrap();
        assert_eq!(ledger.net_base(ALICE), 2 * ONE as i128);
    }
}
