//! End-to-end pool scenarios driven through the public API

mod common;

use approx::assert_relative_eq;
use common::*;
use tenor_core::constants::SECONDS_PER_DAY;
use tenor_core::math::{annualized, calculate_apr_from_realized_price};
use tenor_core::*;

// ============================================================================
// Trading Round Trips
// ============================================================================

#[test]
fn test_long_quotes_below_spot_rate_and_round_trips_at_a_loss() {
    let mut h = Harness::new("500000000", "0.05", "0.05");
    let spot_rate = h.pool.spot_rate(&h.ctx()).unwrap();
    assert_relative_eq!(spot_rate.to_f64(), 0.05, epsilon = 1e-9);

    let base = fixed("1000000");
    let receipt = h.open_long(CELINE, base).unwrap();
    let years = annualized(h.position_duration()).unwrap();
    let realized = calculate_apr_from_realized_price(receipt.base_paid, receipt.bond_amount, years).unwrap();
    assert!(realized <= spot_rate);
    assert!(realized.to_f64() > 0.04);
    assert!(h.pool.spot_rate(&h.ctx()).unwrap() < spot_rate);

    let close = h.close_long(CELINE, receipt.maturity_time, receipt.bond_amount).unwrap();
    assert!(close.base_proceeds <= base);
    assert!(h.ledger.holdings(CELINE).is_empty());
    assert!(h.pool.solvency(&h.ctx()).unwrap());
}

#[test]
fn test_short_round_trip_returns_at_most_the_deposit() {
    let mut h = Harness::new("1000000", "0.05", "0.05");
    let spot_rate = h.pool.spot_rate(&h.ctx()).unwrap();

    let receipt = h.open_short(ALICE, fixed("10000")).unwrap();
    assert!(receipt.base_deposit < fixed("10000"));
    assert!(h.pool.spot_rate(&h.ctx()).unwrap() > spot_rate);

    let close = h.close_short(ALICE, receipt.maturity_time, receipt.bond_amount).unwrap();
    assert!(close.base_proceeds <= receipt.base_deposit);
    assert!(h.net_base(ALICE) <= 0.0);
}

#[test]
fn test_long_held_to_maturity_earns_the_fixed_rate() {
    let mut h = Harness::new("1000000", "0.05", "0.10");
    let receipt = h.open_long(ALICE, fixed("10000")).unwrap();

    h.advance(h.position_duration());
    h.checkpoint(receipt.maturity_time).unwrap();
    assert_eq!(h.pool.state().longs_outstanding, FixedPoint::ZERO);
    assert!(!h.pool.state().zombie_share_reserves.is_zero());

    // proceeds freeze at maturity even though the vault keeps accruing
    h.advance(30 * SECONDS_PER_DAY);
    let close = h.close_long(ALICE, receipt.maturity_time, receipt.bond_amount).unwrap();
    assert!(close.matured);
    let expected = receipt.bond_amount.to_f64() * (1.0 - 0.0005);
    assert_relative_eq!(close.base_proceeds.to_f64(), expected, max_relative = 1e-9);
    assert!(h.net_base(ALICE) > 0.0);
}

#[test]
fn test_short_held_to_maturity_collects_variable_interest() {
    let mut h = Harness::new("1000000", "0.05", "0.10");
    let receipt = h.open_short(BOB, fixed("10000")).unwrap();

    h.advance(h.position_duration());
    let close = h.close_short(BOB, receipt.maturity_time, receipt.bond_amount).unwrap();
    assert!(close.matured);
    // the variable rate beat the fixed rate the short paid
    assert!(close.base_proceeds > receipt.base_deposit);
    assert!(h.net_base(BOB) > 0.0);
}

#[test]
fn test_negative_interest_haircuts_matured_longs() {
    let mut h = Harness::new("1000000", "0.05", "0.05");
    h.set_variable_rate("-0.10");
    let receipt = h.open_long(ALICE, fixed("10000")).unwrap();

    h.advance(h.position_duration());
    let close = h.close_long(ALICE, receipt.maturity_time, receipt.bond_amount).unwrap();
    let face = receipt.bond_amount.to_f64();
    assert!(close.base_proceeds.to_f64() < face * 0.95);
    assert!(close.base_proceeds.to_f64() > face * 0.8);
}

// ============================================================================
// Checkpoints
// ============================================================================

#[test]
fn test_trades_in_one_checkpoint_realize_equal_profit() {
    let base = fixed("100000");
    let mut early = Harness::new("1000000", "0.05", "0.10");
    let mut late = Harness::new("1000000", "0.05", "0.10");

    let early_long = early.open_long(ALICE, base).unwrap();
    late.advance(12 * 3600);
    let late_long = late.open_long(ALICE, base).unwrap();
    assert_eq!(early_long.maturity_time, late_long.maturity_time);

    let close_at = START + early.position_duration() / 2;
    early.now = close_at;
    late.now = close_at;
    early
        .close_long(ALICE, early_long.maturity_time, early_long.bond_amount)
        .unwrap();
    late
        .close_long(ALICE, late_long.maturity_time, late_long.bond_amount)
        .unwrap();

    let early_profit = early.net_base(ALICE);
    let late_profit = late.net_base(ALICE);
    assert!(early_profit > 0.0);
    assert!((early_profit - late_profit).abs() <= base.to_f64() * 1e-3);
}

#[test]
fn test_trades_a_checkpoint_apart_realize_equal_profit() {
    let base = fixed("100000");
    let mut early = Harness::new("1000000", "0.05", "0.10");
    let mut late = Harness::new("1000000", "0.05", "0.10");
    let half_term = early.position_duration() / 2;

    let early_long = early.open_long(ALICE, base).unwrap();
    late.advance(SECONDS_PER_DAY);
    let late_long = late.open_long(ALICE, base).unwrap();
    assert_eq!(late_long.maturity_time, early_long.maturity_time + SECONDS_PER_DAY);

    // each closes with half its term remaining
    early.now = START + half_term;
    late.now = START + SECONDS_PER_DAY + half_term;
    early
        .close_long(ALICE, early_long.maturity_time, early_long.bond_amount)
        .unwrap();
    late
        .close_long(ALICE, late_long.maturity_time, late_long.bond_amount)
        .unwrap();

    let early_profit = early.net_base(ALICE);
    let late_profit = late.net_base(ALICE);
    assert!(early_profit > 0.0);
    assert_relative_eq!(early_profit, late_profit, max_relative = 1e-3);
}

#[test]
fn test_minted_checkpoint_never_changes() {
    let mut h = Harness::new("1000000", "0.05", "0.10");
    let first = *h.pool.checkpoint_at(START).unwrap();

    h.open_long(ALICE, fixed("5000")).unwrap();
    h.advance(SECONDS_PER_DAY);
    h.open_short(BOB, fixed("5000")).unwrap();
    let second_time = START + SECONDS_PER_DAY;
    let second_price = h.pool.checkpoint_at(second_time).unwrap().vault_share_price;

    h.advance(3 * SECONDS_PER_DAY);
    h.add_liquidity(CELINE, fixed("50000")).unwrap();
    h.checkpoint(second_time).unwrap();

    assert_eq!(h.pool.checkpoint_at(START).unwrap().vault_share_price, first.vault_share_price);
    assert_eq!(h.pool.checkpoint_at(second_time).unwrap().vault_share_price, second_price);
}

#[test]
fn test_backfilled_checkpoint_borrows_the_next_minted_price() {
    let mut h = Harness::new("1000000", "0.05", "0.10");
    h.advance(3 * SECONDS_PER_DAY);
    h.open_long(ALICE, fixed("1000")).unwrap();
    let minted = h.pool.checkpoint_at(START + 3 * SECONDS_PER_DAY).unwrap().vault_share_price;

    let skipped = START + SECONDS_PER_DAY;
    assert!(h.pool.checkpoint_at(skipped).is_none());
    let backfilled = h.checkpoint(skipped).unwrap();
    assert_eq!(backfilled.vault_share_price, minted);

    assert_eq!(
        h.checkpoint(START + SECONDS_PER_DAY + 1).unwrap_err(),
        TenorError::InvalidCheckpointTime
    );
    assert_eq!(
        h.checkpoint(START + 10 * SECONDS_PER_DAY).unwrap_err(),
        TenorError::InvalidCheckpointTime
    );
}

#[test]
fn test_checkpoint_before_first_is_rejected() {
    let mut h = Harness::new("1000000", "0.05", "0.10");
    h.advance(2 * SECONDS_PER_DAY);
    h.checkpoint(START + 2 * SECONDS_PER_DAY).unwrap();
    let checkpoints = h.pool.checkpoints().clone();

    assert_eq!(h.checkpoint(START - SECONDS_PER_DAY).unwrap_err(), TenorError::InvalidCheckpointTime);
    assert_eq!(h.checkpoint(0).unwrap_err(), TenorError::InvalidCheckpointTime);
    assert_eq!(h.pool.checkpoints(), &checkpoints);
    assert_eq!(h.pool.checkpoints().len(), 3);
}

#[test]
fn test_failed_close_leaves_no_trace() {
    let mut h = Harness::new("1000000", "0.05", "0.10");
    let receipt = h.open_long(ALICE, fixed("10000")).unwrap();
    h.advance(5 * SECONDS_PER_DAY);

    let state = *h.pool.state();
    let checkpoints = h.pool.checkpoints().clone();
    let result = h.run(|pool, ctx| {
        pool.close_long(ctx, ALICE, receipt.maturity_time, receipt.bond_amount, fixed("1000000"))
    });
    assert_eq!(result.unwrap_err(), TenorError::OutputLimit);
    assert_eq!(*h.pool.state(), state);
    assert_eq!(h.pool.checkpoints(), &checkpoints);
    assert_eq!(h.ledger.balance(ALICE, AssetId::Long(receipt.maturity_time)), receipt.bond_amount);
}

// ============================================================================
// Liquidity
// ============================================================================

#[test]
fn test_partial_removal_conserves_lp_value() {
    let contribution = fixed("1000000");
    let mut h = Harness::new("1000000", "0.05", "0.10");
    let added = h.add_liquidity(BOB, contribution).unwrap();

    let budget = h.pool.max_long(&h.ctx(), fixed("100000000")).unwrap();
    let long = h.open_long(ALICE, budget).unwrap();
    assert!(h.pool.solvency(&h.ctx()).unwrap());

    h.advance(30 * SECONDS_PER_DAY);
    let removed = h.remove_liquidity(BOB, added.lp_shares).unwrap();
    let share_price = h.lp_share_price();
    let value = removed.base_proceeds.to_f64() + removed.withdrawal_shares.to_f64() * share_price.to_f64();
    assert!(value >= contribution.to_f64());

    h.now = long.maturity_time;
    h.checkpoint(long.maturity_time).unwrap();
    assert!(h.net_base(BOB) >= 0.0);

    let close = h.close_long(ALICE, long.maturity_time, long.bond_amount).unwrap();
    assert!(close.matured);
    assert!(h.pool.state().zombie_share_reserves.raw() < 1_000_000);
}

#[test]
fn test_full_exit_behind_open_long_issues_withdrawal_shares() {
    let mut h = Harness::new("1000000", "0.05", "0.10");
    let budget = h.pool.max_long(&h.ctx(), fixed("100000000")).unwrap();
    let long = h.open_long(ALICE, budget).unwrap();

    let lp_shares = h.ledger.balance(LP, AssetId::Lp);
    let price_before = h.lp_share_price();
    let removed = h.remove_liquidity(LP, lp_shares).unwrap();
    let price_after = h.lp_share_price();
    assert!(removed.withdrawal_shares > FixedPoint::ZERO);
    assert_eq!(h.ledger.balance(LP, AssetId::WithdrawalShare), removed.withdrawal_shares);
    assert!(price_after.to_f64() >= price_before.to_f64() * (1.0 - 1e-9));
    assert_relative_eq!(price_after.to_f64(), price_before.to_f64(), max_relative = 1e-6);

    let value = removed.base_proceeds.to_f64() + removed.withdrawal_shares.to_f64() * price_after.to_f64();
    assert!(value >= lp_shares.to_f64() * price_before.to_f64() * (1.0 - 1e-6));

    // nothing is ready yet, so the shares come back unredeemed
    let early = h.redeem(LP, removed.withdrawal_shares).unwrap();
    assert_eq!(early.shares_redeemed, FixedPoint::ZERO);
    assert_eq!(early.base_proceeds, FixedPoint::ZERO);
    assert_eq!(h.ledger.balance(LP, AssetId::WithdrawalShare), removed.withdrawal_shares);

    // maturity releases the margin backing the long
    h.now = long.maturity_time;
    h.checkpoint(long.maturity_time).unwrap();
    let outstanding = h.ledger.balance(LP, AssetId::WithdrawalShare);
    let late = h.redeem(LP, outstanding).unwrap();
    assert_eq!(late.shares_redeemed, outstanding);
    assert!(late.base_proceeds > FixedPoint::ZERO);
    assert!(h.ledger.balance(LP, AssetId::WithdrawalShare).is_zero());
    assert!(h.net_base(LP) > 0.0);

    let close = h.close_long(ALICE, long.maturity_time, long.bond_amount).unwrap();
    assert!(close.matured);
}

#[test]
fn test_targeted_long_moves_pool_to_target_rate() {
    let mut h = Harness::new("1000000", "0.05", "0.05");
    let target = fixed("0.04");
    let base = h.pool.targeted_long(&h.ctx(), fixed("100000000"), target).unwrap();
    let preview = h.pool.spot_price_after_long(&h.ctx(), base).unwrap();

    h.open_long(ALICE, base).unwrap();
    assert_eq!(h.pool.spot_price(&h.ctx()).unwrap(), preview);
    let rate = h.pool.spot_rate(&h.ctx()).unwrap();
    assert!(rate >= target);
    assert_relative_eq!(rate.to_f64(), target.to_f64(), max_relative = 1e-6);

    assert_eq!(
        h.pool.targeted_long(&h.ctx(), fixed("1000"), fixed("0.05")).unwrap_err(),
        TenorError::InvalidTargetRate
    );
}

#[test]
fn test_add_liquidity_prices_shares_at_present_value() {
    let mut h = Harness::new("1000000", "0.05", "0.05");
    let before = h.lp_share_price();
    let receipt = h.add_liquidity(BOB, fixed("250000")).unwrap();
    assert_relative_eq!(receipt.lp_share_price.to_f64(), before.to_f64(), max_relative = 1e-9);
    assert_relative_eq!(
        receipt.lp_shares.to_f64() * before.to_f64(),
        250_000.0,
        max_relative = 1e-9
    );
}

#[test]
fn test_circuit_breaker_blocks_liquidity_after_rate_spike() {
    let config = PoolConfig::builder()
        .target_rate(fixed("0.05"))
        .circuit_breaker_delta(fixed("0.01"))
        .build()
        .unwrap();
    let mut h = Harness::with_config(config, "1000000", "0.05", "0.05");
    h.advance(SECONDS_PER_DAY);
    h.checkpoint(START + SECONDS_PER_DAY).unwrap();

    let bonds = h.pool.max_short(&h.ctx(), fixed("100000000")).unwrap();
    h.open_short(ALICE, bonds.mul_down(fixed("0.9")).unwrap()).unwrap();
    assert_eq!(
        h.add_liquidity(BOB, fixed("1000")).unwrap_err(),
        TenorError::CircuitBreakerTriggered
    );
}
