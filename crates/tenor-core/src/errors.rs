//! # Core Error Types
//!
//! Errors surfaced by the pool engine. Every failing operation leaves pool
//! state untouched, so callers can retry with adjusted inputs.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub enum TenorError {
    // ========================================================================
    // Math Errors
    // ========================================================================
    #[error("Arithmetic underflow")]
    ArithmeticUnderflow,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Exponent input too large")]
    ExpInputTooLarge,

    #[error("Logarithm of a non-positive number")]
    LnOfNonPositive,

    // ========================================================================
    // Curve and Trading Errors
    // ========================================================================
    #[error("Insufficient liquidity")]
    InsufficientLiquidity,

    #[error("Negative interest")]
    NegativeInterest,

    #[error("Below minimum transaction amount")]
    BelowMinimumTransactionAmount,

    #[error("Output limit violated")]
    OutputLimit,

    #[error("Invalid effective share reserves")]
    InvalidEffectiveShareReserves,

    #[error("Share reserves below minimum")]
    InvalidShareReserves,

    #[error("Target rate is above the spot rate")]
    InvalidTargetRate,

    // ========================================================================
    // Liquidity Errors
    // ========================================================================
    #[error("Circuit breaker triggered")]
    CircuitBreakerTriggered,

    #[error("Present value decreased when adding liquidity")]
    DecreasedPresentValueWhenAddingLiquidity,

    #[error("Below minimum contribution")]
    BelowMinimumContribution,

    #[error("Insufficient balance")]
    InsufficientBalance,

    // ========================================================================
    // Lifecycle and Configuration Errors
    // ========================================================================
    #[error("Pool not initialized")]
    NotInitialized,

    #[error("Pool already initialized")]
    AlreadyInitialized,

    #[error("Invalid checkpoint time")]
    InvalidCheckpointTime,

    #[error("Invalid maturity time")]
    InvalidMaturityTime,

    #[error("Invalid APR")]
    InvalidApr,

    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfig { field: String, reason: String },
}

impl TenorError {
    /// Configuration error for a named field
    pub fn invalid_config(field: &str, reason: &str) -> Self {
        TenorError::InvalidConfig {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type CoreResult<T> = Result<T, TenorError>;
