//! Clock generators — the discrete trading-date heartbeat of a simulation.
//!
//! A clock emits [`ClockTick`]s into its own output channel, never into the
//! global event queue; the simulation engine drains ticks and turns them into
//! market events. Backtest mode replays a precomputed calendar; online mode
//! polls wall-clock time. Both are gated by the same pause/resume/stop state
//! machine ([`Gate`]).

pub mod backtest;
pub mod gate;
pub mod online;

use chrono::NaiveDate;

pub use backtest::BacktestClock;
pub use gate::{ClockState, Gate, GatePass};
pub use online::{session_close_date, OnlineClock, TimeSource};

/// A trading-date boundary announced by a clock. Backtest ticks are
/// calendar-wide (`symbol: None`); online ticks name a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockTick {
    pub date: NaiveDate,
    pub symbol: Option<String>,
}

/// Common control surface for clock generators.
pub trait ClockSource: Send {
    /// Begin producing ticks. Returns false if already started or stopped.
    fn start(&mut self) -> bool;

    /// Suspend tick production without losing state.
    fn pause(&self);

    /// Resume a paused clock.
    fn resume(&self);

    /// Terminal, idempotent stop. Blocked producers observe it within one
    /// polling interval.
    fn stop(&mut self);

    /// Non-blocking pull of the next tick, if one is waiting.
    fn try_next(&self) -> Option<ClockTick>;

    fn state(&self) -> ClockState;
}
