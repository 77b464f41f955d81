//! # Protocol Constants
//!
//! Fixed-point scale, time units and default pool parameters.

// ============================================================================
// Fixed-Point Scale
// ============================================================================

/// One unit in 18-decimal fixed point
pub const ONE: u128 = 1_000_000_000_000_000_000;

/// Number of decimals carried by [`crate::FixedPoint`]
pub const DECIMALS: u32 = 18;

// ============================================================================
// Time
// ============================================================================

pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;
pub const SECONDS_PER_YEAR: u64 = 365 * SECONDS_PER_DAY;

// ============================================================================
// Default Pool Parameters
// ============================================================================

/// Default term of a position
pub const DEFAULT_POSITION_DURATION: u64 = 365 * SECONDS_PER_DAY;

/// Default width of a checkpoint bucket
pub const DEFAULT_CHECKPOINT_DURATION: u64 = SECONDS_PER_DAY;

/// Shares that must always remain in the pool (10 shares)
pub const DEFAULT_MINIMUM_SHARE_RESERVES: u128 = 10 * ONE;

/// Smallest trade or liquidity amount accepted (0.001 units)
pub const DEFAULT_MINIMUM_TRANSACTION_AMOUNT: u128 = ONE / 1_000;

/// Curve fee (1%)
pub const DEFAULT_CURVE_FEE: u128 = ONE / 100;

/// Flat fee (0.05%)
pub const DEFAULT_FLAT_FEE: u128 = ONE / 2_000;

/// Governance share of curve and flat fees (15%)
pub const DEFAULT_GOVERNANCE_LP_FEE: u128 = 15 * ONE / 100;

/// Governance share of zombie interest (3%)
pub const DEFAULT_GOVERNANCE_ZOMBIE_FEE: u128 = 3 * ONE / 100;

/// Maximum APR move tolerated around a liquidity event (50%)
pub const DEFAULT_CIRCUIT_BREAKER_DELTA: u128 = ONE / 2;

// ============================================================================
// Time Stretch Calibration
// ============================================================================

/// Numerator of the time stretch heuristic (5.24592)
pub const TIME_STRETCH_NUMERATOR: u128 = 5_245_920_000_000_000_000;

/// Rate coefficient of the time stretch heuristic (0.04665)
pub const TIME_STRETCH_RATE_COEFFICIENT: u128 = 46_650_000_000_000_000;

// ============================================================================
// Exponential Bounds
// ============================================================================

/// Inputs at or below this return zero from `exp` (ln(0.5e-18) scaled)
pub const EXP_MIN_INPUT: i128 = -42_139_678_854_452_767_551;

/// Inputs at or above this overflow a signed 256-bit result
pub const EXP_MAX_INPUT: i128 = 135_305_999_368_893_231_589;

// ============================================================================
// Solver Limits
// ============================================================================

/// Iterations allowed when solving for withdrawal pool share proceeds
pub const SHARE_PROCEEDS_MAX_ITERATIONS: usize = 64;

/// Bracket width (raw units) at which the share proceeds solver stops
pub const SHARE_PROCEEDS_TOLERANCE: u128 = 1_000;

/// Iterations allowed when searching for the largest admissible trade
pub const MAX_TRADE_ITERATIONS: usize = 128;
