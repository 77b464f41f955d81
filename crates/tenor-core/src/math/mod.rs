//! # Mathematical Functions
//!
//! Pure fixed-point math for curve pricing and interest accrual.

pub mod big_int;
pub mod fixed_point;
pub mod interest;
pub mod log_exp;
pub mod yield_space;

// Re-export commonly used functions
pub use big_int::{mul_div, Rounding};
pub use fixed_point::*;
pub use interest::*;
pub use yield_space::YieldSpace;
