//! Ledger history rows: per-date position and holding snapshots.
//!
//! Both are append-only. `BTreeMap` keeps symbol ordering deterministic so
//! serialized snapshots (and anything hashed from them) are stable.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Signed share counts per symbol as of one trading date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub date: NaiveDate,
    pub positions: BTreeMap<String, i64>,
}

impl PositionSnapshot {
    pub fn flat(date: NaiveDate, symbols: &[String]) -> Self {
        Self {
            date,
            positions: symbols.iter().map(|s| (s.clone(), 0)).collect(),
        }
    }
}

/// Cash, accrued commission, per-symbol market value and total equity as of
/// one trading date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingSnapshot {
    pub date: NaiveDate,
    pub cash: f64,
    pub commission: f64,
    pub total: f64,
    pub market_values: BTreeMap<String, f64>,
}

impl HoldingSnapshot {
    /// Opening holding: all cash, nothing invested.
    pub fn initial(date: NaiveDate, symbols: &[String], initial_capital: f64) -> Self {
        Self {
            date,
            cash: initial_capital,
            commission: 0.0,
            total: initial_capital,
            market_values: symbols.iter().map(|s| (s.clone(), 0.0)).collect(),
        }
    }

    /// Recompute `total` from cash plus the sum of market values.
    pub fn recompute_total(&mut self) {
        self.total = self.cash + self.market_values.values().sum::<f64>();
    }

    /// Whether the equity identity `total == cash + sum(market values)`
    /// holds within floating-point tolerance.
    pub fn identity_holds(&self, tolerance: f64) -> bool {
        let expected = self.cash + self.market_values.values().sum::<f64>();
        (self.total - expected).abs() <= tolerance
    }
}
