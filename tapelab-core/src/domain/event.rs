//! Event — the tagged union that flows through the simulation queue.
//!
//! One variant per stage of the causal chain Market → Signal → Order → Fill.
//! Dispatch is an exhaustive `match` on the enum; there is no runtime kind
//! check and no default branch to silently swallow an unknown variant.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while constructing events.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("invalid order: quantity must be >= 0, got {quantity}")]
    InvalidOrder { quantity: i64 },
}

/// Discriminant for an [`Event`], useful for logging and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Market,
    Signal,
    Order,
    Fill,
}

/// Trade direction. The sum type makes an "unknown direction" unrepresentable,
/// so fill arithmetic never needs a fallback sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// +1 for Buy, -1 for Sell.
    pub fn sign(self) -> i64 {
        match self {
            Direction::Buy => 1,
            Direction::Sell => -1,
        }
    }
}

/// What the strategy wants done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    Up,
    Down,
    Hold,
    Exit,
}

/// Order pricing style. Only `Market` is exercised by the simulator's
/// full-fill model; `Limit` is carried for order-routing completeness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
}

/// A new completed trading date for one symbol.
///
/// `previous_date` is the prior trading date for that symbol (None at the
/// very start of its history). Strategies and valuation read the bar at
/// `previous_date` so they only ever see completed data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketEvent {
    pub symbol: String,
    pub date: NaiveDate,
    pub previous_date: Option<NaiveDate>,
}

/// A strategy's reaction to a market update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub symbol: String,
    pub date: NaiveDate,
    pub strategy_id: u32,
    pub signal: SignalKind,
    /// Optional scaling hint for position sizing (pairs strategies etc).
    pub strength: Option<f64>,
}

/// An instruction for the execution handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub symbol: String,
    pub date: NaiveDate,
    pub order_type: OrderType,
    pub quantity: u32,
    pub direction: Direction,
}

impl OrderEvent {
    /// Build an order, rejecting negative quantities before they can reach
    /// the queue.
    pub fn new(
        symbol: impl Into<String>,
        date: NaiveDate,
        order_type: OrderType,
        quantity: i64,
        direction: Direction,
    ) -> Result<Self, EventError> {
        if quantity < 0 {
            return Err(EventError::InvalidOrder { quantity });
        }
        Ok(Self {
            symbol: symbol.into(),
            date,
            order_type,
            quantity: quantity as u32,
            direction,
        })
    }
}

/// The execution-confirmed result of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillEvent {
    pub symbol: String,
    pub date: NaiveDate,
    pub quantity: u32,
    pub direction: Direction,
    /// Execution price per share.
    pub fill_cost: f64,
    pub commission: f64,
    pub venue: String,
}

/// The tagged union carried by the event queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Market(MarketEvent),
    Signal(SignalEvent),
    Order(OrderEvent),
    Fill(FillEvent),
}

impl Event {
    pub fn symbol(&self) -> &str {
        match self {
            Event::Market(e) => &e.symbol,
            Event::Signal(e) => &e.symbol,
            Event::Order(e) => &e.symbol,
            Event::Fill(e) => &e.symbol,
        }
    }

    pub fn occurred_at(&self) -> NaiveDate {
        match self {
            Event::Market(e) => e.date,
            Event::Signal(e) => e.date,
            Event::Order(e) => e.date,
            Event::Fill(e) => e.date,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Event::Market(_) => EventKind::Market,
            Event::Signal(_) => EventKind::Signal,
            Event::Order(_) => EventKind::Order,
            Event::Fill(_) => EventKind::Fill,
        }
    }
}
