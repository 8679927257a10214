//! Domain types: events, bars, and ledger history rows.

pub mod bar;
pub mod event;
pub mod ledger;

pub use bar::Bar;
pub use event::{
    Direction, Event, EventError, EventKind, FillEvent, MarketEvent, OrderEvent, OrderType,
    SignalEvent, SignalKind,
};
pub use ledger::{HoldingSnapshot, PositionSnapshot};
