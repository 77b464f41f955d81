//! # Tenor Core - Fixed-Rate Pool Engine
//!
//! Pricing and accounting core of a fixed-rate/variable-rate yield-trading
//! market maker. Traders open fixed-term longs (bonds bought below par) and
//! shorts (bonds sold into the pool); LPs earn the spread between the quoted
//! fixed rate and the variable rate of the yield source backing the pool.
//!
//! The crate provides:
//!
//! - 18-decimal fixed-point math with explicit rounding direction
//! - The YieldSpace bonding curve and fee-inclusive trade pricing
//! - Checkpoint bookkeeping, maturity settlement and zombie interest
//! - LP present value, excess idle distribution and withdrawal shares
//! - A transactional [`Pool`] whose operations either fully commit or leave
//!   state untouched
//!
//! Custody, balances and the vault share price are external. Operations
//! describe them through [`Effect`]s and read the price through a
//! [`VaultSharePriceOracle`].
//!
//! ## Feature Flags
//!
//! - `client`: Enables serde serialization for off-chain use

pub mod checkpoint;
pub mod constants;
pub mod curve;
pub mod errors;
pub mod guard;
pub mod ledger;
pub mod lp;
pub mod market;
pub mod math;
pub mod oracle;
pub mod pool;
pub mod position;
pub mod types;
pub mod work_unit;

// Re-export commonly used items
pub use checkpoint::{Checkpoint, CheckpointLedger};
pub use errors::{CoreResult, TenorError};
pub use ledger::AssetLedger;
pub use market::PoolView;
pub use math::FixedPoint;
pub use oracle::{AccruingVault, FixedSharePrice, VaultSharePriceOracle};
pub use pool::{Pool, TxContext, TxOutcome};
pub use types::*;
