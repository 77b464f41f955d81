//! # Tenor Simulation
//!
//! Agent-based harness for the tenor pool engine. A seeded runner drives a
//! pool through time with a mock yield source, an in-memory asset ledger
//! and a population of simple traders and LPs.

pub mod agent;
pub mod config;
pub mod error;
pub mod runner;

pub use agent::{Action, Agent, Market, Strategy};
pub use config::SimulationConfig;
pub use error::{SimulationError, SimulationResult};
pub use runner::{ActionStats, RunReport, Simulation, INITIAL_LP};
