//! Serializable simulation configuration.

use crate::engine::execution::{CommissionModel, TieredCommission, ZeroCommission};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Commission policy selection (serializable).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommissionConfig {
    /// Per-share rate tiered by quantity with a minimum floor.
    Tiered {
        small_rate: f64,
        large_rate: f64,
        tier_quantity: u32,
        minimum: f64,
    },
    /// No commission.
    Zero,
}

impl Default for CommissionConfig {
    fn default() -> Self {
        let t = TieredCommission::default();
        CommissionConfig::Tiered {
            small_rate: t.small_rate,
            large_rate: t.large_rate,
            tier_quantity: t.tier_quantity,
            minimum: t.minimum,
        }
    }
}

impl CommissionConfig {
    pub fn build(&self) -> Box<dyn CommissionModel> {
        match self {
            CommissionConfig::Tiered {
                small_rate,
                large_rate,
                tier_quantity,
                minimum,
            } => Box::new(TieredCommission {
                small_rate: *small_rate,
                large_rate: *large_rate,
                tier_quantity: *tier_quantity,
                minimum: *minimum,
            }),
            CommissionConfig::Zero => Box::new(ZeroCommission),
        }
    }
}

/// All parameters needed to reproduce a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Persistence key for ledger snapshots.
    pub portfolio_id: String,

    /// Universe of symbols to simulate.
    pub symbols: Vec<String>,

    pub initial_capital: f64,

    /// Simulation window (inclusive).
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    /// Whole-lot size for naive entry sizing.
    #[serde(default = "default_lot_size")]
    pub lot_size: u32,

    /// Consumer-loop sleep when the queue is empty, in milliseconds.
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_ms: u64,

    /// Emit statistics every N empty heartbeats (online mode).
    #[serde(default = "default_stats_every")]
    pub stats_every_heartbeats: u32,

    /// Trading periods per year for Sharpe annualization (252 for daily
    /// equities, larger for intraday instruments).
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: f64,

    #[serde(default)]
    pub commission: CommissionConfig,
}

fn default_lot_size() -> u32 {
    100
}

fn default_heartbeat_ms() -> u64 {
    500
}

fn default_stats_every() -> u32 {
    120
}

fn default_periods_per_year() -> f64 {
    252.0
}

impl SimulationConfig {
    /// A small single-symbol demo configuration.
    pub fn demo(symbol: &str, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            portfolio_id: "demo".into(),
            symbols: vec![symbol.to_string()],
            initial_capital: 100_000.0,
            start_date,
            end_date,
            lot_size: default_lot_size(),
            heartbeat_ms: default_heartbeat_ms(),
            stats_every_heartbeats: default_stats_every(),
            periods_per_year: default_periods_per_year(),
            commission: CommissionConfig::default(),
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::Invalid("symbols must not be empty".into()));
        }
        if self.initial_capital <= 0.0 {
            return Err(ConfigError::Invalid(
                "initial_capital must be positive".into(),
            ));
        }
        if self.end_date < self.start_date {
            return Err(ConfigError::Invalid(
                "end_date must not precede start_date".into(),
            ));
        }
        if self.lot_size == 0 {
            return Err(ConfigError::Invalid("lot_size must be >= 1".into()));
        }
        Ok(())
    }

    /// Deterministic content hash: identical configs share a run id.
    pub fn run_id(&self) -> String {
        let json = serde_json::to_string(self).expect("SimulationConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
