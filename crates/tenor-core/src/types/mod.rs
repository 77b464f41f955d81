//! # Core Type Definitions
//!
//! Configuration, state, assets and receipts shared across the engine.

pub mod assets;
pub mod config;
pub mod receipts;
pub mod state;

// Re-export all types
pub use assets::*;
pub use config::*;
pub use receipts::*;
pub use state::*;
