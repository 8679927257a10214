//! Simulation engine — the global event queue and the loop that drains it.
//!
//! Data flow per symbol: clock tick → MarketEvent → strategy signal →
//! portfolio order → simulated fill → ledger update, then the next
//! MarketEvent for that symbol is seeded. The queue is FIFO; cross-symbol
//! ordering is arrival order, not global calendar order.

pub mod execution;
pub mod market;
pub mod queue;
pub mod runner;

pub use execution::{
    CommissionModel, ExecutionError, ExecutionSimulator, TieredCommission, ZeroCommission,
};
pub use market::MarketStream;
pub use queue::{EngineMessage, EventQueue, QueueHandle};
pub use runner::{union_calendar, EngineError, EngineMode, SimulationEngine, SimulationReport};
