//! Execution simulator — converts orders into fills.
//!
//! Fill model: instantaneous full fill at the last known valuation price for
//! the symbol. When no valuation exists the order fails with `UnknownPrice`
//! and is dropped by the engine; a price is never fabricated. Commission is
//! a pluggable policy.

use crate::domain::{FillEvent, OrderEvent};
use chrono::NaiveDate;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("no valuation price known for {symbol} on {date}")]
    UnknownPrice { symbol: String, date: NaiveDate },
}

/// Commission policy for simulated fills.
pub trait CommissionModel: Send {
    fn commission(&self, quantity: u32, price: f64) -> f64;
}

/// Per-share commission tiered by quantity, with a minimum floor.
///
/// Default schedule: 0.013/share up to 500 shares, 0.008/share above,
/// 1.30 minimum per fill.
#[derive(Debug, Clone)]
pub struct TieredCommission {
    pub small_rate: f64,
    pub large_rate: f64,
    pub tier_quantity: u32,
    pub minimum: f64,
}

impl Default for TieredCommission {
    fn default() -> Self {
        Self {
            small_rate: 0.013,
            large_rate: 0.008,
            tier_quantity: 500,
            minimum: 1.3,
        }
    }
}

impl CommissionModel for TieredCommission {
    fn commission(&self, quantity: u32, _price: f64) -> f64 {
        let rate = if quantity <= self.tier_quantity {
            self.small_rate
        } else {
            self.large_rate
        };
        (rate * quantity as f64).max(self.minimum)
    }
}

/// No commission — for tests and frictionless what-if runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroCommission;

impl CommissionModel for ZeroCommission {
    fn commission(&self, _quantity: u32, _price: f64) -> f64 {
        0.0
    }
}

/// Simulated execution venue.
pub struct ExecutionSimulator {
    commission: Box<dyn CommissionModel>,
    venue: String,
}

impl ExecutionSimulator {
    pub fn new(commission: Box<dyn CommissionModel>) -> Self {
        Self {
            commission,
            venue: "simulated".into(),
        }
    }

    /// Fill the whole order at the last known valuation price.
    pub fn execute(
        &self,
        order: &OrderEvent,
        prices: &HashMap<String, f64>,
    ) -> Result<FillEvent, ExecutionError> {
        let price = prices
            .get(&order.symbol)
            .copied()
            .ok_or_else(|| ExecutionError::UnknownPrice {
                symbol: order.symbol.clone(),
                date: order.date,
            })?;
        let commission = self.commission.commission(order.quantity, price);
        Ok(FillEvent {
            symbol: order.symbol.clone(),
            date: order.date,
            quantity: order.quantity,
            direction: order.direction,
            fill_cost: price,
            commission,
            venue: self.venue.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, OrderType};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn order(quantity: i64) -> OrderEvent {
        OrderEvent::new("SPY", d(2), OrderType::Market, quantity, Direction::Buy).unwrap()
    }

    #[test]
    fn fills_at_last_known_price() {
        let sim = ExecutionSimulator::new(Box::new(ZeroCommission));
        let mut prices = HashMap::new();
        prices.insert("SPY".to_string(), 412.5);

        let fill = sim.execute(&order(100), &prices).unwrap();
        assert_eq!(fill.quantity, 100);
        assert_eq!(fill.fill_cost, 412.5);
        assert_eq!(fill.commission, 0.0);
        assert_eq!(fill.venue, "simulated");
    }

    #[test]
    fn unknown_price_is_an_error() {
        let sim = ExecutionSimulator::new(Box::new(ZeroCommission));
        let prices = HashMap::new();
        assert!(matches!(
            sim.execute(&order(100), &prices),
            Err(ExecutionError::UnknownPrice { .. })
        ));
    }

    #[test]
    fn tiered_commission_schedule() {
        let model = TieredCommission::default();
        // Small fills hit the floor.
        assert_eq!(model.commission(10, 100.0), 1.3);
        // 200 shares * 0.013 = 2.6
        assert!((model.commission(200, 100.0) - 2.6).abs() < 1e-12);
        // Above the tier: 1000 * 0.008 = 8.0
        assert!((model.commission(1000, 100.0) - 8.0).abs() < 1e-12);
    }
}
