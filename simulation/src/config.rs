use std::fs;

use serde::{Deserialize, Serialize};
use tenor_core::constants::SECONDS_PER_DAY;
use tenor_core::{Fees, FixedPoint, PoolConfig};

use crate::error::{SimulationError, SimulationResult};

/// Simulation configuration loaded from a TOML file
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Log filter for the `tenor-sim` binary
    pub log_level: String,

    /// Pool parameters fixed at deployment
    pub pool: PoolParams,

    /// Initial liquidity and yield source
    pub market: MarketParams,

    /// Trading population
    pub agents: AgentParams,

    /// Clock and randomness
    pub run: RunParams,
}

/// Pool parameters, in human units
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PoolParams {
    pub position_duration_days: u64,
    pub checkpoint_duration_hours: u64,
    pub minimum_share_reserves: f64,
    pub minimum_transaction_amount: f64,
    pub curve_fee: f64,
    pub flat_fee: f64,
    pub governance_lp_fee: f64,
    pub governance_zombie_fee: f64,
    pub circuit_breaker_delta: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MarketParams {
    /// Base contributed by the initializing LP
    pub initial_contribution: u64,

    /// Fixed rate the pool opens at
    pub initial_rate: f64,

    /// Starting annual rate of the mock yield source
    pub variable_rate: f64,

    /// Largest per-step move of the variable rate
    pub variable_rate_volatility: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AgentParams {
    pub count: usize,

    /// Upper bound on a single trade or contribution, in base
    pub max_trade_base: u64,

    /// Chance an agent acts on a given step
    pub activity: f64,

    /// Rate gap the arbitrageurs tolerate before trading
    pub arbitrage_band: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RunParams {
    pub steps: u64,
    pub seconds_per_step: u64,
    pub seed: u64,

    /// Unix time the pool is initialized at
    pub start_time: u64,
}

impl SimulationConfig {
    /// Load configuration from TOML file
    pub fn load(path: &str) -> SimulationResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| SimulationError::Io(format!("Failed to read config file {}: {}", path, e)))?;
        let config = Self::from_toml(&content)?;
        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> SimulationResult<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: &str) -> SimulationResult<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)
            .map_err(|e| SimulationError::Io(format!("Failed to write config file {}: {}", path, e)))?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SimulationResult<()> {
        if self.log_level.is_empty() {
            return Err(invalid("log_level", "empty", "a tracing filter such as \"info\""));
        }

        self.pool.validate()?;
        self.market.validate()?;
        self.agents.validate()?;
        self.run.validate()?;

        Ok(())
    }

    /// Engine configuration for the simulated pool
    pub fn pool_config(&self) -> SimulationResult<PoolConfig> {
        let pool = &self.pool;
        let config = PoolConfig::builder()
            .target_rate(FixedPoint::from_f64(self.market.initial_rate)?)
            .position_duration(pool.position_duration_days * SECONDS_PER_DAY)
            .checkpoint_duration(pool.checkpoint_duration_hours * 3600)
            .minimum_share_reserves(FixedPoint::from_f64(pool.minimum_share_reserves)?)
            .minimum_transaction_amount(FixedPoint::from_f64(pool.minimum_transaction_amount)?)
            .fees(Fees {
                curve: FixedPoint::from_f64(pool.curve_fee)?,
                flat: FixedPoint::from_f64(pool.flat_fee)?,
                governance_lp: FixedPoint::from_f64(pool.governance_lp_fee)?,
                governance_zombie: FixedPoint::from_f64(pool.governance_zombie_fee)?,
            })
            .circuit_breaker_delta(FixedPoint::from_f64(pool.circuit_breaker_delta)?)
            .build()?;
        Ok(config)
    }
}

impl PoolParams {
    fn validate(&self) -> SimulationResult<()> {
        if self.position_duration_days == 0 {
            return Err(invalid("position_duration_days", "0", "greater than 0"));
        }

        if self.checkpoint_duration_hours == 0 {
            return Err(invalid("checkpoint_duration_hours", "0", "greater than 0"));
        }

        if (self.position_duration_days * 24) % self.checkpoint_duration_hours != 0 {
            return Err(invalid(
                "checkpoint_duration_hours",
                &self.checkpoint_duration_hours.to_string(),
                "a divisor of the position duration",
            ));
        }

        if self.minimum_share_reserves <= 0.0 {
            return Err(invalid(
                "minimum_share_reserves",
                &self.minimum_share_reserves.to_string(),
                "greater than 0",
            ));
        }

        if self.minimum_transaction_amount <= 0.0 {
            return Err(invalid(
                "minimum_transaction_amount",
                &self.minimum_transaction_amount.to_string(),
                "greater than 0",
            ));
        }

        for (field, value) in [
            ("curve_fee", self.curve_fee),
            ("flat_fee", self.flat_fee),
            ("governance_lp_fee", self.governance_lp_fee),
            ("governance_zombie_fee", self.governance_zombie_fee),
            ("circuit_breaker_delta", self.circuit_breaker_delta),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(field, &value.to_string(), "between 0 and 1"));
            }
        }

        Ok(())
    }
}

impl MarketParams {
    fn validate(&self) -> SimulationResult<()> {
        if self.initial_contribution == 0 {
            return Err(invalid("initial_contribution", "0", "greater than 0"));
        }

        if self.initial_rate <= 0.0 || self.initial_rate >= 1.0 {
            return Err(invalid("initial_rate", &self.initial_rate.to_string(), "between 0 and 1 exclusive"));
        }

        if self.variable_rate.abs() >= 1.0 {
            return Err(invalid(
                "variable_rate",
                &self.variable_rate.to_string(),
                "between -1 and 1 exclusive",
            ));
        }

        if self.variable_rate_volatility < 0.0 {
            return Err(invalid(
                "variable_rate_volatility",
                &self.variable_rate_volatility.to_string(),
                "at least 0",
            ));
        }

        Ok(())
    }
}

impl AgentParams {
    fn validate(&self) -> SimulationResult<()> {
        if self.count == 0 {
            return Err(invalid("agents.count", "0", "greater than 0"));
        }

        if self.max_trade_base == 0 {
            return Err(invalid("max_trade_base", "0", "greater than 0"));
        }

        if !(0.0..=1.0).contains(&self.activity) {
            return Err(invalid("activity", &self.activity.to_string(), "between 0 and 1"));
        }

        if self.arbitrage_band < 0.0 {
            return Err(invalid("arbitrage_band", &self.arbitrage_band.to_string(), "at least 0"));
        }

        Ok(())
    }
}

impl RunParams {
    fn validate(&self) -> SimulationResult<()> {
        if self.steps == 0 {
            return Err(invalid("steps", "0", "greater than 0"));
        }

        if self.seconds_per_step == 0 {
            return Err(invalid("seconds_per_step", "0", "greater than 0"));
        }

        Ok(())
    }
}

fn invalid(field: &str, value: &str, expected: &str) -> SimulationError {
    SimulationError::InvalidConfig(format!("{} is {}, expected {}", field, value, expected))
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            pool: PoolParams {
                position_duration_days: 365,
                checkpoint_duration_hours: 24,
                minimum_share_reserves: 10.0,
                minimum_transaction_amount: 0.001,
                curve_fee: 0.01,
                flat_fee: 0.0005,
                governance_lp_fee: 0.15,
                governance_zombie_fee: 0.03,
                circuit_breaker_delta: 0.5,
            },
            market: MarketParams {
                initial_contribution: 10_000_000,
                initial_rate: 0.05,
                variable_rate: 0.05,
                variable_rate_volatility: 0.002,
            },
            agents: AgentParams {
                count: 8,
                max_trade_base: 100_000,
                activity: 0.5,
                arbitrage_band: 0.005,
            },
            run: RunParams {
                steps: 720,
                seconds_per_step: 12 * 3600,
                seed: 7,
                start_time: 1_700_006_400,
            },
        }
    }
}
