//! Error types for the simulation harness

use tenor_core::TenorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Ledger rejected committed effects: {0}")]
    Ledger(String),
}

pub type SimulationResult<T> = std::result::Result<T, SimulationError>;

impl From<TenorError> for SimulationError {
    fn from(err: TenorError) -> Self {
        SimulationError::Engine(err.to_string())
    }
}

impl From<std::io::Error> for SimulationError {
    fn from(err: std::io::Error) -> Self {
        SimulationError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for SimulationError {
    fn from(err: toml::de::Error) -> Self {
        SimulationError::Parse(err.to_string())
    }
}

impl From<toml::ser::Error> for SimulationError {
    fn from(err: toml::ser::Error) -> Self {
        SimulationError::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for SimulationError {
    fn from(err: serde_json::Error) -> Self {
        SimulationError::Parse(err.to_string())
    }
}
